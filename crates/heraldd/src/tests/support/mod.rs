//! Shared test doubles and harnesses.

mod authority;
mod config_loader;
mod reporter;
mod responder;
mod router;

pub use authority::StaticAuthority;
pub use config_loader::{CorruptStoreLoader, FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use responder::RecordingResponder;
pub use router::{RecordingApplier, ScriptedProbe, TestRouter};

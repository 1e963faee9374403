use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use heraldd::{Collaborators, StructuredHealthReporter, SystemConfigLoader, bootstrap_with};

fn main() -> ExitCode {
    let reporter = Arc::new(StructuredHealthReporter::new());
    let Ok(daemon) = bootstrap_with(&SystemConfigLoader, reporter, Collaborators::default()) else {
        return ExitCode::FAILURE;
    };
    match daemon.serve(io::stdin().lock(), io::stdout()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "heraldd::transport", %error, "interaction stream failed");
            ExitCode::FAILURE
        }
    }
}

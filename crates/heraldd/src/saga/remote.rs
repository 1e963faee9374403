//! Collaborators that reach the webhook endpoint.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::warn;

use super::SAGA_TARGET;
use super::patch::{MessageId, WebhookEmbedPatch, WebhookTarget};

/// Failure of a call to the webhook endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// No answer within the allotted time.
    #[error("timed out after {timeout_ms} ms")]
    Timeout {
        /// Budget that elapsed.
        timeout_ms: u64,
    },

    /// Endpoint unreachable or refused the request.
    #[error("{message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },
}

impl RemoteError {
    /// Creates a timeout error.
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Creates a generic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Checks that a webhook endpoint can be reached before persisting.
pub trait TargetProbe: Send + Sync {
    /// Probes `target` for `message`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] when the endpoint cannot be confirmed.
    fn probe(
        &self,
        target: &WebhookTarget,
        message: &MessageId,
        timeout: Duration,
    ) -> Result<(), RemoteError>;
}

/// Pushes a stored patch to its webhook message.
pub trait PatchApplier: Send + Sync {
    /// Applies `patch`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] when the message could not be patched.
    fn apply(&self, patch: &WebhookEmbedPatch, timeout: Duration) -> Result<(), RemoteError>;
}

/// Probe that opens a TCP connection to the webhook host.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpReachabilityProbe;

impl TargetProbe for TcpReachabilityProbe {
    fn probe(
        &self,
        target: &WebhookTarget,
        _message: &MessageId,
        timeout: Duration,
    ) -> Result<(), RemoteError> {
        let url = target.url();
        let host = url
            .host_str()
            .ok_or_else(|| RemoteError::failed("webhook URL has no host"))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| RemoteError::failed("webhook URL has no port"))?;

        let started = Instant::now();
        let addresses = (host, port)
            .to_socket_addrs()
            .map_err(|error| RemoteError::failed(format!("cannot resolve {host}: {error}")))?;

        let mut last_error = RemoteError::failed(format!("{host} resolved to no addresses"));
        for address in addresses {
            let Some(remaining) = timeout
                .checked_sub(started.elapsed())
                .filter(|remaining| !remaining.is_zero())
            else {
                return Err(RemoteError::timeout(timeout));
            };
            match TcpStream::connect_timeout(&address, remaining) {
                Ok(_) => return Ok(()),
                Err(error) if error.kind() == std::io::ErrorKind::TimedOut => {
                    last_error = RemoteError::timeout(timeout);
                }
                Err(error) => {
                    last_error = RemoteError::failed(format!("cannot connect to {host}: {error}"));
                }
            }
        }
        Err(last_error)
    }
}

/// Message reported when no applier has been wired in.
pub const NO_APPLIER_MESSAGE: &str = "no webhook applier configured";

/// Applier used when no platform client is wired in.
///
/// Every application fails, so `apply_now` requests are reported as failed
/// and the saga compensates the stored change.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredApplier;

impl PatchApplier for UnconfiguredApplier {
    fn apply(&self, patch: &WebhookEmbedPatch, timeout: Duration) -> Result<(), RemoteError> {
        warn!(
            target: SAGA_TARGET,
            message_id = %patch.message_id,
            webhook = %patch.webhook_url.redacted(),
            embeds = patch.embed.embeds().len(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "cannot apply webhook embed patch without a configured applier"
        );
        Err(RemoteError::failed(NO_APPLIER_MESSAGE))
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;
    use crate::saga::EmbedPayload;

    #[test]
    fn probe_reaches_a_listening_host() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let target = WebhookTarget::parse(&format!("http://127.0.0.1:{port}/webhooks/1/tok"))
            .expect("url");

        let result = TcpReachabilityProbe.probe(
            &target,
            &MessageId::parse("1").expect("id"),
            Duration::from_secs(2),
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn unconfigured_applier_refuses_to_report_success() {
        let target = WebhookTarget::parse("https://host/api/webhooks/55/token").expect("url");
        let patch = WebhookEmbedPatch::new(
            MessageId::parse("1").expect("id"),
            target,
            EmbedPayload::from_value(serde_json::json!({ "title": "a" })).expect("payload"),
        );

        let result = UnconfiguredApplier.apply(&patch, Duration::from_secs(1));

        assert_eq!(result, Err(RemoteError::failed(NO_APPLIER_MESSAGE)));
    }

    #[test]
    fn probe_reports_refused_connections() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let target = WebhookTarget::parse(&format!("http://127.0.0.1:{port}/webhooks/1/tok"))
            .expect("url");

        let result = TcpReachabilityProbe.probe(
            &target,
            &MessageId::parse("1").expect("id"),
            Duration::from_secs(2),
        );
        assert!(result.is_err());
    }
}

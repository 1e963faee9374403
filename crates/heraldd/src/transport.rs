//! JSONL transport between the platform client and the router.
//!
//! The client writes one [`Interaction`] per line to the daemon's stdin. The
//! daemon writes one envelope per line to stdout: the interaction id followed
//! by the flattened [`Outbound`] message. Lines that cannot be parsed are
//! answered with an ephemeral error message carrying a `null` interaction id.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, warn};

use crate::dispatch::{CommandRouter, InteractionResponder, Outbound, Response, TransportError};
use crate::interaction::Interaction;

/// Tracing target for transport operations.
const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Maximum size of a single interaction line in bytes.
pub const MAX_INTERACTION_BYTES: usize = 1024 * 1024;

#[derive(Serialize)]
struct Envelope<'a> {
    interaction: Option<&'a str>,
    #[serde(flatten)]
    outbound: &'a Outbound,
}

/// Writer that frames outbound messages as JSONL.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one message as a JSONL line and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_outbound(
        &mut self,
        interaction: Option<&str>,
        outbound: &Outbound,
    ) -> Result<(), TransportError> {
        serde_json::to_writer(
            &mut self.writer,
            &Envelope {
                interaction,
                outbound,
            },
        )?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Returns the wrapped stream.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// [`InteractionResponder`] writing JSONL to a shared stream.
pub struct JsonlResponder<W> {
    writer: Mutex<ResponseWriter<W>>,
}

impl<W: Write> JsonlResponder<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(ResponseWriter::new(writer)),
        }
    }

    /// Answers an unparseable line.
    ///
    /// # Errors
    ///
    /// Returns an error when the message cannot be written.
    pub fn reject(&self, message: impl Into<String>) -> Result<(), TransportError> {
        let outbound = Outbound::Message {
            response: Response::ephemeral(message),
        };
        self.write(None, &outbound)
    }

    fn write(&self, interaction: Option<&str>, outbound: &Outbound) -> Result<(), TransportError> {
        self.writer
            .lock()
            .map_err(|_| TransportError::Poisoned)?
            .write_outbound(interaction, outbound)
    }
}

impl<W: Write + Send> InteractionResponder for JsonlResponder<W> {
    fn send(&self, interaction: &Interaction, outbound: Outbound) -> Result<(), TransportError> {
        self.write(Some(&interaction.id), &outbound)
    }
}

/// Counters for one served stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeSummary {
    /// Interactions handed to the router.
    pub dispatched: usize,
    /// Lines rejected before dispatch.
    pub rejected: usize,
}

/// Dispatches every interaction read from `input` until end of stream.
///
/// # Errors
///
/// Returns an error when reading `input` or writing `output` fails.
pub fn serve<R, W>(router: &CommandRouter, mut input: R, output: W) -> Result<ServeSummary, TransportError>
where
    R: BufRead,
    W: Write + Send,
{
    let responder = JsonlResponder::new(output);
    let mut summary = ServeSummary::default();

    loop {
        let line = match read_line(&mut input) {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(LineError::TooLarge { size }) => {
                warn!(target: TRANSPORT_TARGET, size, "interaction too large");
                responder.reject(format!(
                    "Interaction of {size} bytes exceeds the {MAX_INTERACTION_BYTES} byte limit."
                ))?;
                summary.rejected += 1;
                continue;
            }
            Err(LineError::Io(error)) => return Err(error.into()),
        };
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<Interaction>(&line) {
            Ok(interaction) => {
                router.dispatch(&interaction, &responder);
                summary.dispatched += 1;
            }
            Err(error) => {
                warn!(target: TRANSPORT_TARGET, %error, "malformed interaction");
                responder.reject(format!("Malformed interaction: {error}"))?;
                summary.rejected += 1;
            }
        }
    }

    debug!(
        target: TRANSPORT_TARGET,
        dispatched = summary.dispatched,
        rejected = summary.rejected,
        "input stream closed"
    );
    Ok(summary)
}

enum LineError {
    Io(io::Error),
    TooLarge { size: usize },
}

/// Reads one newline-terminated line, discarding the rest of any line that
/// exceeds [`MAX_INTERACTION_BYTES`].
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<Vec<u8>>, LineError> {
    let mut line = Vec::new();
    let mut size = 0_usize;
    loop {
        let (consumed, complete) = {
            let available = match input.fill_buf() {
                Ok(available) => available,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(LineError::Io(error)),
            };
            if available.is_empty() {
                break;
            }
            let chunk = available
                .split_inclusive(|byte| *byte == b'\n')
                .next()
                .unwrap_or_default();
            let complete = chunk.last() == Some(&b'\n');
            size += chunk.len();
            if size <= MAX_INTERACTION_BYTES {
                line.extend_from_slice(chunk);
            } else {
                line.clear();
            }
            (chunk.len(), complete)
        };
        input.consume(consumed);
        if complete {
            break;
        }
    }

    match size {
        0 => Ok(None),
        size if size > MAX_INTERACTION_BYTES => Err(LineError::TooLarge { size }),
        _ => Ok(Some(line)),
    }
}

//! Responder that keeps every outbound message.

use std::sync::Mutex;

use crate::dispatch::{InteractionResponder, Outbound, Response, TransportError};
use crate::interaction::Interaction;

/// Records outbound messages in send order.
#[derive(Debug, Default)]
pub struct RecordingResponder {
    sent: Mutex<Vec<(String, Outbound)>>,
}

impl RecordingResponder {
    /// Every message sent so far.
    pub fn outbound(&self) -> Vec<Outbound> {
        self.sent
            .lock()
            .expect("responder lock")
            .iter()
            .map(|(_, outbound)| outbound.clone())
            .collect()
    }

    /// Interaction ids in send order.
    pub fn interaction_ids(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("responder lock")
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Messages that close an interaction.
    pub fn terminal(&self) -> Vec<Outbound> {
        self.outbound()
            .into_iter()
            .filter(Outbound::is_terminal)
            .collect()
    }

    /// Content of the last message or edit.
    pub fn last_response(&self) -> Option<Response> {
        self.outbound()
            .iter()
            .rev()
            .find_map(Outbound::response)
            .cloned()
    }
}

impl InteractionResponder for RecordingResponder {
    fn send(&self, interaction: &Interaction, outbound: Outbound) -> Result<(), TransportError> {
        self.sent
            .lock()
            .map_err(|_| TransportError::Poisoned)?
            .push((interaction.id.clone(), outbound));
        Ok(())
    }
}

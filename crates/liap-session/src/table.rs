use liap_core::{Position, N};
use std::collections::HashSet;
use tokio::sync::mpsc::UnboundedSender;

use crate::message::ServerMessage;

/// Per-room fan-out of outbound frames to connected seats. Grounded directly
/// on the "one unbounded sender per seat, track disconnects in a set" shape
/// used for live player sessions in the corpus this was adapted from.
#[derive(Default)]
pub struct Table {
    senders: Vec<Option<UnboundedSender<ServerMessage>>>,
    disconnected: HashSet<Position>,
}

impl Table {
    pub fn new() -> Self {
        Self { senders: vec![None; N], disconnected: HashSet::new() }
    }

    pub fn sit(&mut self, position: Position, sender: UnboundedSender<ServerMessage>) {
        self.senders[position] = Some(sender);
        self.disconnected.remove(&position);
    }

    pub fn disconnect(&mut self, position: Position) {
        self.disconnected.insert(position);
        self.senders[position] = None;
    }

    pub fn is_disconnected(&self, position: Position) -> bool {
        self.disconnected.contains(&position)
    }

    pub fn connected_count(&self) -> usize {
        N - self.disconnected.len()
    }

    pub fn sender(&self, position: Position) -> Option<&UnboundedSender<ServerMessage>> {
        self.senders[position].as_ref()
    }

    /// Sends a message to exactly one seat. Logs and swallows a failed send —
    /// a dropped receiver just means that seat disconnected moments ago; the
    /// connection registry's heartbeat sweep will notice independently.
    pub fn unicast(&self, position: Position, message: ServerMessage) {
        match self.sender(position) {
            Some(tx) => {
                if tx.send(message).is_err() {
                    log::debug!("seat {position} unicast failed, receiver dropped");
                }
            }
            None => log::debug!("seat {position} has no active connection, dropping unicast"),
        }
    }

    /// Sends a message to every connected seat.
    pub fn broadcast(&self, message: ServerMessage) {
        for (position, sender) in self.senders.iter().enumerate() {
            if let Some(tx) = sender {
                if tx.send(message.clone()).is_err() {
                    log::debug!("seat {position} broadcast failed, receiver dropped");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_seats_and_counts() {
        let table = Table::new();
        assert_eq!(table.connected_count(), N);
    }

    #[test]
    fn table_sit_and_disconnect() {
        let mut table = Table::new();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        table.sit(0, tx);
        assert!(!table.is_disconnected(0));
        table.disconnect(0);
        assert!(table.is_disconnected(0));
        assert_eq!(table.connected_count(), N - 1);
    }
}

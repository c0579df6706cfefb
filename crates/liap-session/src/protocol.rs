use liap_core::Position;
use serde::Deserialize;

use crate::engine::Action;
use crate::error::GameError;

/// Inbound client frames, decoded from the `{"action": "...", ...}` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    StartGame,
    Declare { count: u8 },
    Play { piece_ids: Vec<u8> },
    Pass,
    RedealDecision { accept: bool },
    Heartbeat,
}

impl From<ClientAction> for Action {
    fn from(action: ClientAction) -> Self {
        match action {
            ClientAction::StartGame => Action::StartGame,
            ClientAction::Declare { count } => Action::Declare(count),
            ClientAction::Play { piece_ids } => Action::Play(piece_ids),
            ClientAction::Pass => Action::Pass,
            ClientAction::RedealDecision { accept: true } => Action::AcceptRedeal,
            ClientAction::RedealDecision { accept: false } => Action::DeclineRedeal,
            ClientAction::Heartbeat => Action::Heartbeat,
        }
    }
}

/// Decodes a raw client frame. Distinct from *legality* (whether the action
/// is allowed right now) which is checked by `liap-rules`/`liap-round` once
/// the action reaches the room's action bus.
pub fn decode(raw: &str) -> Result<ClientAction, GameError> {
    serde_json::from_str(raw).map_err(|e| GameError::InvalidMessageFormat(e.to_string()))
}

/// An action stamped with its origin seat, as it travels through the action bus.
#[derive(Debug, Clone)]
pub struct IncomingAction {
    pub position: Position,
    pub action: ClientAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_declare() {
        let action = decode(r#"{"action":"declare","count":2}"#).unwrap();
        assert!(matches!(action, ClientAction::Declare { count: 2 }));
    }

    #[test]
    fn decode_pass() {
        let action = decode(r#"{"action":"pass"}"#).unwrap();
        assert!(matches!(action, ClientAction::Pass));
    }

    #[test]
    fn decode_invalid_json_is_invalid_message() {
        let err = decode("not json").unwrap_err();
        assert_eq!(err.code(), "INVALID_MESSAGE_FORMAT");
    }

    #[test]
    fn redeal_decision_maps_to_accept_or_decline() {
        assert!(matches!(Action::from(ClientAction::RedealDecision { accept: true }), Action::AcceptRedeal));
        assert!(matches!(Action::from(ClientAction::RedealDecision { accept: false }), Action::DeclineRedeal));
    }
}

use liap_core::{Points, Position, SequenceNumber};
use liap_pieces::Piece;
use serde::Serialize;

/// Wire-level representation of a piece, safe to send to any client.
#[derive(Debug, Clone, Serialize)]
pub struct WirePiece {
    pub id: u8,
    pub rank: String,
    pub color: String,
    pub point: Points,
}

impl From<&Piece> for WirePiece {
    fn from(p: &Piece) -> Self {
        Self { id: p.id(), rank: p.rank().to_string(), color: p.color().to_string(), point: p.point() }
    }
}

/// The public portion of a room's game state, serialized onto every
/// `phase_change` frame alongside the phase-specific payload. Never carries
/// a hand — those go out separately as `hand_updated`, addressed only to
/// the owning seat.
#[derive(Debug, Clone, Serialize)]
pub struct WireGameState {
    pub phase: &'static str,
    pub round_number: u64,
    pub totals: [Points; liap_core::N],
    pub current_turn: Option<Position>,
    pub declarations: [Option<u8>; liap_core::N],
    pub piles_taken: [u8; liap_core::N],
}

/// Every frame the server ever sends to a client. `#[serde(tag = "event")]`
/// gives each variant a `"event": "..."` discriminant in the JSON, matching
/// the wire protocol's `{event, ...}` envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        connection_id: String,
        room_id: String,
        player_name: Option<String>,
        reconnected: bool,
        reconnect_token: Option<String>,
    },
    RoomCreated { room_id: String, room_name: String },
    RoomJoined { room_id: String, room_name: String, players: Vec<String> },
    PlayerJoined { player_name: String, position: Position, is_bot: bool },
    PlayerLeft { player_name: String, new_host: Option<Position> },
    RoomListUpdate { rooms: Vec<WireRoomSummary> },
    PhaseChange {
        phase: &'static str,
        phase_data: serde_json::Value,
        game_state: WireGameState,
        sequence_number: SequenceNumber,
        server_time: i64,
    },
    HandUpdated { pieces: Vec<WirePiece>, count: usize },
    PlayerDisconnected { player: String, ai_activated: bool, timeout_seconds: u64 },
    PlayerReconnected { player: String },
    Error { code: String, message: String, details: Option<String>, recoverable: bool },
    Pong { client_time: i64, server_time: i64 },
    SyncResponse { current_sequence: SequenceNumber, missed_events: Vec<serde_json::Value>, full_state: Option<serde_json::Value> },
}

#[derive(Debug, Clone, Serialize)]
pub struct WireRoomSummary {
    pub room_id: String,
    pub host: String,
    pub occupancy: usize,
    pub max_players: usize,
    pub created_at: String,
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ServerMessage always serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_serializes_with_tag() {
        let msg = ServerMessage::Connected {
            connection_id: "c1".into(),
            room_id: "AB12CD".into(),
            player_name: Some("Alice".into()),
            reconnected: false,
            reconnect_token: None,
        };
        let json = msg.to_json();
        assert!(json.contains("\"event\":\"connected\""));
    }

    #[test]
    fn phase_change_carries_sequence_number() {
        let msg = ServerMessage::PhaseChange {
            phase: "turn",
            phase_data: serde_json::json!({}),
            game_state: WireGameState {
                phase: "turn",
                round_number: 1,
                totals: [0, 0, 0, 0],
                current_turn: Some(0),
                declarations: [None, None, None, None],
                piles_taken: [0, 0, 0, 0],
            },
            sequence_number: 7,
            server_time: 0,
        };
        let json = msg.to_json();
        assert!(json.contains("\"sequence_number\":7"));
    }
}

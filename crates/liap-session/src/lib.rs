//! Phase state machine, action bus, and broadcast engine for a single room.

mod changelog;
mod engine;
mod error;
mod message;
mod phase;
mod protocol;
mod table;
mod timer;

pub use changelog::{ChangeLog, ChangeLogEntry};
pub use engine::{Action, ActionKind, GameEngine, PhaseState};
pub use error::GameError;
pub use message::{ServerMessage, WireGameState, WirePiece, WireRoomSummary};
pub use phase::{Declaration, GameOver, Preparation, Scoring, Session, Turn, TurnResults, Waiting};
pub use protocol::{decode, ClientAction, IncomingAction};
pub use table::Table;
pub use timer::{Timer, TimerConfig};

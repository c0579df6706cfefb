//! Fire-and-forget persistence for a room's state. Nothing in `liap-session`
//! or `liap-rooms` waits on these calls succeeding: a lost snapshot or event
//! degrades reconnection/history, it never blocks gameplay.

#[cfg(feature = "database")]
mod postgres;

#[cfg(feature = "database")]
pub use postgres::PostgresRepository;

use liap_core::{Id, Room, RoundNumber, SequenceNumber};

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("persistence backend error: {0}")]
    Backend(String),
}

/// A point-in-time snapshot of a room's game state, stored as the JSON a
/// client would already receive over the wire (`WireGameState::to_json`),
/// so the backend never needs its own copy of the game-state types.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub round_number: RoundNumber,
    pub sequence_number: SequenceNumber,
    pub state_json: String,
}

/// Persists snapshots and the broadcast event stream for a room. One method
/// per persisted concern, same shape as a hand-history repository, scoped
/// down to what a four-player card room needs: the latest snapshot to
/// recover from, and the event log leading up to it.
#[allow(async_fn_in_trait)]
pub trait GameRepository: Send + Sync {
    async fn save_snapshot(&self, room: Id<Room>, snapshot: Snapshot) -> Result<(), PersistError>;
    async fn load_snapshot(&self, room: Id<Room>) -> Result<Option<Snapshot>, PersistError>;
    async fn append_event(
        &self,
        room: Id<Room>,
        sequence_number: SequenceNumber,
        event_json: &str,
    ) -> Result<(), PersistError>;
}

/// Default repository: discards everything. A deployment with no database
/// configured still runs correctly, since reconnection already falls back to
/// a full resync when there is nothing to replay from.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRepository;

impl GameRepository for NoopRepository {
    async fn save_snapshot(&self, _room: Id<Room>, _snapshot: Snapshot) -> Result<(), PersistError> {
        Ok(())
    }

    async fn load_snapshot(&self, _room: Id<Room>) -> Result<Option<Snapshot>, PersistError> {
        Ok(None)
    }

    async fn append_event(
        &self,
        _room: Id<Room>,
        _sequence_number: SequenceNumber,
        _event_json: &str,
    ) -> Result<(), PersistError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_repository_never_returns_a_snapshot() {
        let repo = NoopRepository;
        let room: Id<Room> = Id::default();
        repo.save_snapshot(
            room,
            Snapshot { round_number: 1, sequence_number: 1, state_json: "{}".into() },
        )
        .await
        .unwrap();
        assert!(repo.load_snapshot(room).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn noop_repository_accepts_events_without_storing_them() {
        let repo = NoopRepository;
        let room: Id<Room> = Id::default();
        repo.append_event(room, 1, "{\"event\":\"pong\"}").await.unwrap();
    }
}

use std::sync::Arc;

use liap_core::{Id, Room, RoundNumber, SequenceNumber};
use tokio_postgres::Client;

use crate::{GameRepository, PersistError, Snapshot};

const SNAPSHOTS: &str = "room_snapshots";
const EVENTS: &str = "room_events";

/// Table DDL, described the way a bulk-loaded table would be, even though
/// these two tables are written one row at a time rather than `COPY`ed.
trait TableSchema {
    fn creates() -> &'static str;
    fn indices() -> &'static str;
}

struct SnapshotsTable;

impl TableSchema for SnapshotsTable {
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            SNAPSHOTS,
            " (room_id UUID PRIMARY KEY, round_number BIGINT NOT NULL, \
             sequence_number BIGINT NOT NULL, state_json TEXT NOT NULL)"
        )
    }
    fn indices() -> &'static str {
        ""
    }
}

struct EventsTable;

impl TableSchema for EventsTable {
    fn creates() -> &'static str {
        const_format::concatcp!(
            "CREATE TABLE IF NOT EXISTS ",
            EVENTS,
            " (room_id UUID NOT NULL, sequence_number BIGINT NOT NULL, \
             event_json TEXT NOT NULL, PRIMARY KEY (room_id, sequence_number))"
        )
    }
    fn indices() -> &'static str {
        const_format::concatcp!(
            "CREATE INDEX IF NOT EXISTS ",
            EVENTS,
            "_room_idx ON ",
            EVENTS,
            " (room_id)"
        )
    }
}

/// `tokio-postgres`-backed [`GameRepository`], enabled by the `database`
/// feature. Each persisted concern is one statement against one table,
/// mirroring a hand-history repository scaled down to a room's snapshot and
/// event stream.
pub struct PostgresRepository {
    client: Arc<Client>,
}

impl PostgresRepository {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Runs the `CREATE TABLE`/`CREATE INDEX` statements for both tables.
    /// Safe to call on every startup; every statement is `IF NOT EXISTS`.
    pub async fn migrate(&self) -> Result<(), PersistError> {
        self.client
            .batch_execute(SnapshotsTable::creates())
            .await
            .map_err(|e| PersistError::Backend(e.to_string()))?;
        self.client
            .batch_execute(EventsTable::creates())
            .await
            .map_err(|e| PersistError::Backend(e.to_string()))?;
        self.client
            .batch_execute(EventsTable::indices())
            .await
            .map_err(|e| PersistError::Backend(e.to_string()))?;
        Ok(())
    }
}

impl GameRepository for PostgresRepository {
    async fn save_snapshot(&self, room: Id<Room>, snapshot: Snapshot) -> Result<(), PersistError> {
        self.client
            .execute(
                const_format::concatcp!(
                    "INSERT INTO ",
                    SNAPSHOTS,
                    " (room_id, round_number, sequence_number, state_json) VALUES ($1, $2, $3, $4) \
                     ON CONFLICT (room_id) DO UPDATE SET round_number = EXCLUDED.round_number, \
                     sequence_number = EXCLUDED.sequence_number, state_json = EXCLUDED.state_json"
                ),
                &[
                    &room.raw(),
                    &(snapshot.round_number as i64),
                    &(snapshot.sequence_number as i64),
                    &snapshot.state_json,
                ],
            )
            .await
            .map(|_| ())
            .map_err(|e| PersistError::Backend(e.to_string()))
    }

    async fn load_snapshot(&self, room: Id<Room>) -> Result<Option<Snapshot>, PersistError> {
        self.client
            .query_opt(
                const_format::concatcp!(
                    "SELECT round_number, sequence_number, state_json FROM ",
                    SNAPSHOTS,
                    " WHERE room_id = $1"
                ),
                &[&room.raw()],
            )
            .await
            .map(|opt| {
                opt.map(|row| Snapshot {
                    round_number: row.get::<_, i64>(0) as RoundNumber,
                    sequence_number: row.get::<_, i64>(1) as SequenceNumber,
                    state_json: row.get(2),
                })
            })
            .map_err(|e| PersistError::Backend(e.to_string()))
    }

    async fn append_event(
        &self,
        room: Id<Room>,
        sequence_number: SequenceNumber,
        event_json: &str,
    ) -> Result<(), PersistError> {
        self.client
            .execute(
                const_format::concatcp!(
                    "INSERT INTO ",
                    EVENTS,
                    " (room_id, sequence_number, event_json) VALUES ($1, $2, $3) \
                     ON CONFLICT (room_id, sequence_number) DO NOTHING"
                ),
                &[&room.raw(), &(sequence_number as i64), &event_json.to_string()],
            )
            .await
            .map(|_| ())
            .map_err(|e| PersistError::Backend(e.to_string()))
    }
}

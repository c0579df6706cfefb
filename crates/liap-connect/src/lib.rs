//! Tracks which transport-level connection is seated where, for presence and
//! reconnection.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use liap_core::{Connection, Id, Position, Room, SequenceNumber};
use tokio::sync::RwLock;

/// What the registry knows about one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub room: Id<Room>,
    pub position: Position,
    pub last_heartbeat: Instant,
    pub last_seen_seq: SequenceNumber,
}

/// A seat that stopped heartbeating past the configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleSeat {
    pub room: Id<Room>,
    pub position: Position,
}

/// Maps connections to rooms/seats both ways, so a dropped WebSocket can be
/// resolved to a `(room, seat)` to hand to a bot, and a reconnecting client
/// can be resolved to its prior connection's `last_seen_seq` for replay.
#[derive(Default)]
pub struct Registry {
    by_connection: RwLock<HashMap<Id<Connection>, ConnectionInfo>>,
    by_seat: RwLock<HashMap<(Id<Room>, Position), Id<Connection>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `connection` as occupying `(room, position)`. If another
    /// connection already held that seat (a reconnect racing a stale
    /// socket), it is evicted from the registry and returned.
    pub async fn attach(
        &self,
        connection: Id<Connection>,
        room: Id<Room>,
        position: Position,
    ) -> Option<Id<Connection>> {
        let mut by_seat = self.by_seat.write().await;
        let mut by_connection = self.by_connection.write().await;
        let evicted = by_seat.insert((room, position), connection);
        if let Some(old) = evicted {
            by_connection.remove(&old);
        }
        by_connection.insert(
            connection,
            ConnectionInfo { room, position, last_heartbeat: Instant::now(), last_seen_seq: 0 },
        );
        evicted
    }

    /// Removes a connection from the registry. Does not touch `by_seat` if
    /// a newer connection has since taken that seat.
    pub async fn detach(&self, connection: Id<Connection>) -> Option<ConnectionInfo> {
        let info = self.by_connection.write().await.remove(&connection)?;
        let mut by_seat = self.by_seat.write().await;
        if by_seat.get(&(info.room, info.position)) == Some(&connection) {
            by_seat.remove(&(info.room, info.position));
        }
        Some(info)
    }

    pub async fn touch_heartbeat(&self, connection: Id<Connection>) -> bool {
        if let Some(info) = self.by_connection.write().await.get_mut(&connection) {
            info.last_heartbeat = Instant::now();
            true
        } else {
            false
        }
    }

    pub async fn record_seen(&self, connection: Id<Connection>, sequence_number: SequenceNumber) {
        if let Some(info) = self.by_connection.write().await.get_mut(&connection) {
            info.last_seen_seq = sequence_number;
        }
    }

    pub async fn lookup(&self, connection: Id<Connection>) -> Option<ConnectionInfo> {
        self.by_connection.read().await.get(&connection).cloned()
    }

    pub async fn lookup_seat(&self, room: Id<Room>, position: Position) -> Option<Id<Connection>> {
        self.by_seat.read().await.get(&(room, position)).copied()
    }

    /// Finds every connection whose heartbeat is older than
    /// `missed_threshold * interval`, removes it from the registry, and
    /// returns the seats it occupied. The caller enqueues a `Disconnect`
    /// action onto each affected room's bus rather than mutating room state
    /// here directly — the registry never talks to `liap-session`.
    pub async fn sweep_stale(&self, missed_threshold: u32, interval: Duration) -> Vec<StaleSeat> {
        let cutoff = interval * missed_threshold.max(1);
        let stale: Vec<(Id<Connection>, Id<Room>, Position)> = self
            .by_connection
            .read()
            .await
            .iter()
            .filter(|(_, info)| info.last_heartbeat.elapsed() >= cutoff)
            .map(|(&conn, info)| (conn, info.room, info.position))
            .collect();
        let mut seats = Vec::with_capacity(stale.len());
        for (connection, room, position) in stale {
            self.detach(connection).await;
            seats.push(StaleSeat { room, position });
        }
        seats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn attach_then_lookup_round_trips() {
        let registry = Registry::new();
        let room: Id<Room> = Id::default();
        let connection: Id<Connection> = Id::default();
        registry.attach(connection, room, 0).await;
        let info = registry.lookup(connection).await.unwrap();
        assert_eq!(info.room, room);
        assert_eq!(info.position, 0);
    }

    #[tokio::test]
    async fn reattaching_a_seat_evicts_the_old_connection() {
        let registry = Registry::new();
        let room: Id<Room> = Id::default();
        let first: Id<Connection> = Id::default();
        let second: Id<Connection> = Id::default();
        registry.attach(first, room, 0).await;
        let evicted = registry.attach(second, room, 0).await;
        assert_eq!(evicted, Some(first));
        assert!(registry.lookup(first).await.is_none());
        assert_eq!(registry.lookup_seat(room, 0).await, Some(second));
    }

    #[tokio::test]
    async fn detach_clears_both_indices() {
        let registry = Registry::new();
        let room: Id<Room> = Id::default();
        let connection: Id<Connection> = Id::default();
        registry.attach(connection, room, 2).await;
        registry.detach(connection).await;
        assert!(registry.lookup(connection).await.is_none());
        assert!(registry.lookup_seat(room, 2).await.is_none());
    }

    #[tokio::test]
    async fn sweep_stale_evicts_past_the_cutoff() {
        let registry = Registry::new();
        let room: Id<Room> = Id::default();
        let connection: Id<Connection> = Id::default();
        registry.attach(connection, room, 1).await;
        let stale = registry.sweep_stale(2, Duration::from_millis(0)).await;
        assert_eq!(stale, vec![StaleSeat { room, position: 1 }]);
        assert!(registry.lookup(connection).await.is_none());
    }
}

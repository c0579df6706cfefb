//! Shared type aliases, identifiers, and constants for the Liap Tui server.

use std::fmt;
use std::marker::PhantomData;

/// Seat index, 0..=3, fixed turn order around the table.
pub type Position = usize;
/// Number of seats at a table. Liap Tui is always played four-handed.
pub const N: usize = 4;
/// Score delta / declaration count, signed because rounds can cost a player points.
pub type Points = i32;
/// Monotonically increasing counter stamped on every broadcast change.
pub type SequenceNumber = u64;
/// Logical hand-number within a session, counting from 1.
pub type RoundNumber = u64;

/// A type-tagged UUIDv7, giving every domain entity a distinct, non-interchangeable
/// identifier type at compile time without the runtime cost of a wrapper struct per kind.
pub struct Id<T> {
    inner: uuid::Uuid,
    marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub fn new(inner: uuid::Uuid) -> Self {
        Self { inner, marker: PhantomData }
    }
    pub fn raw(&self) -> uuid::Uuid {
        self.inner
    }
    /// Reinterprets this id as belonging to a different marker type.
    /// Used where one entity's id doubles as a foreign key, e.g. a connection
    /// id being stamped onto a reconnection token.
    pub fn cast<U>(self) -> Id<U> {
        Id { inner: self.inner, marker: PhantomData }
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new(uuid::Uuid::now_v7())
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Id<T> {}
impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}
impl<T> Eq for Id<T> {}
impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<T> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.hash(state)
    }
}
impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}
impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl<T> serde::Serialize for Id<T> {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.inner.serialize(s)
    }
}
impl<'de, T> serde::Deserialize<'de> for Id<T> {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(Self::new(uuid::Uuid::deserialize(d)?))
    }
}

/// Anything addressable by an [`Id`].
pub trait Unique {
    type Marker: 'static;
    fn id(&self) -> Id<Self::Marker>;
}

/// Marker types for [`Id`], shared across crates so a room id minted by
/// `liap-rooms` is the same type as the one `liap-connect` tracks
/// connections against.
pub struct Room;
pub struct Connection;

/// Runtime-tunable constants governing timeouts, scoring, and wire behavior.
/// A deployment may override any of these via `bin/server`'s CLI/env layer.
#[derive(Debug, Clone)]
pub struct Config {
    /// Points required to win the session outright.
    pub winning_score: Points,
    /// Base points awarded per round win, before cover bonus.
    pub base_points: Points,
    /// Extra points per covered pile during scoring.
    pub cover_bonus_per_pile: Points,
    /// Decision timeout for declarations and plays.
    pub decision_timeout: std::time::Duration,
    /// How long a client has to reconnect before its seat is handed to a bot.
    pub reconnect_grace: std::time::Duration,
    /// Missed-heartbeat count before a connection is declared dead.
    pub heartbeat_missed_threshold: u32,
    /// Heartbeat interval.
    pub heartbeat_interval: std::time::Duration,
    /// Random think-delay range for bot decisions, so bot play doesn't look instant.
    pub bot_think_delay_range: (std::time::Duration, std::time::Duration),
    /// Maximum buffered change-log entries kept for replay-on-reconnect.
    pub change_log_capacity: usize,
    /// Upper bound on simultaneously open rooms, enforced by `liap-rooms`.
    pub max_rooms: usize,
    /// Round count past which the session ends regardless of score, breaking
    /// ties by highest total. `0` means unbounded.
    pub max_rounds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            winning_score: 50,
            base_points: 1,
            cover_bonus_per_pile: 1,
            decision_timeout: std::time::Duration::from_secs(30),
            reconnect_grace: std::time::Duration::from_secs(60),
            heartbeat_missed_threshold: 2,
            heartbeat_interval: std::time::Duration::from_secs(15),
            bot_think_delay_range: (
                std::time::Duration::from_millis(400),
                std::time::Duration::from_millis(1500),
            ),
            change_log_capacity: 256,
            max_rooms: 1000,
            max_rounds: 0,
        }
    }
}

/// Initializes the process-wide logger with `level` as the default filter
/// directive (overridden by `RUST_LOG` if set). No file sink: the server
/// runs under a process supervisor that already captures stdout, so a
/// second log file would just be redundant disk I/O.
#[cfg(feature = "server")]
pub fn init_logging(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).try_init();
}

/// Blocks until Ctrl+C or SIGTERM, for graceful shutdown in `bin/server`.
#[cfg(feature = "server")]
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sig = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        sig.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

use std::sync::Mutex as SyncMutex;

use liap_core::{Config, Id, Position, Room as RoomMarker, N};
use liap_bots::BotDriver;
use liap_session::{GameEngine, WireRoomSummary};
use tokio::sync::Mutex;

/// One occupied or vacated seat in a room's lobby bookkeeping. Distinct from
/// `liap_round::Seat`, which only exists once a round has dealt hands — this
/// tracks identity and bot status across the room's whole lifetime.
#[derive(Debug, Clone)]
pub struct SeatInfo {
    pub name: String,
    pub is_bot: bool,
    pub is_original_bot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
    Abandoned,
}

/// What happened to a seat when its occupant left.
#[derive(Debug, Clone)]
pub enum LeaveOutcome {
    /// No game in progress: the seat is now empty.
    SeatOpened,
    /// A game is in progress: the seat keeps playing under bot control.
    ConvertedToBot,
}

/// A single room: its lobby metadata plus the `GameEngine` and `BotDriver`
/// that drive it. The engine is the sole mutator of game state; the
/// `SyncMutex`-guarded seat list is lobby-only bookkeeping (names, host,
/// bot flags) that the engine itself doesn't need to know about.
pub struct RoomEntry {
    pub id: Id<RoomMarker>,
    pub code: String,
    pub name: String,
    pub is_public: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    host: SyncMutex<Position>,
    seats: SyncMutex<[Option<SeatInfo>; N]>,
    status: SyncMutex<RoomStatus>,
    pub engine: Mutex<GameEngine>,
    pub bots: Mutex<BotDriver>,
}

impl RoomEntry {
    pub fn new(id: Id<RoomMarker>, code: String, name: String, is_public: bool, config: Config) -> Self {
        let think_delay = config.bot_think_delay_range;
        Self {
            id,
            code,
            name,
            is_public,
            created_at: chrono::Utc::now(),
            host: SyncMutex::new(0),
            seats: SyncMutex::new([const { None }; N]),
            status: SyncMutex::new(RoomStatus::Waiting),
            engine: Mutex::new(GameEngine::new(config)),
            bots: Mutex::new(BotDriver::new(think_delay)),
        }
    }

    pub fn host(&self) -> Position {
        *self.host.lock().expect("host mutex poisoned")
    }

    pub fn status(&self) -> RoomStatus {
        *self.status.lock().expect("status mutex poisoned")
    }

    pub fn set_status(&self, status: RoomStatus) {
        *self.status.lock().expect("status mutex poisoned") = status;
    }

    pub fn occupancy(&self) -> usize {
        self.seats.lock().expect("seats mutex poisoned").iter().filter(|s| s.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.occupancy() == N
    }

    pub fn name_taken(&self, name: &str) -> bool {
        self.seats.lock().expect("seats mutex poisoned").iter().flatten().any(|s| s.name == name)
    }

    pub fn seat_name(&self, position: Position) -> Option<String> {
        self.seats.lock().expect("seats mutex poisoned")[position].as_ref().map(|s| s.name.clone())
    }

    /// Seats `name` in the lowest-index empty slot, rejecting a duplicate
    /// name within the room.
    pub fn seat_join(&self, name: &str) -> Option<Position> {
        let mut seats = self.seats.lock().expect("seats mutex poisoned");
        if seats.iter().flatten().any(|s| s.name == name) {
            return None;
        }
        let position = seats.iter().position(|s| s.is_none())?;
        seats[position] = Some(SeatInfo { name: name.to_string(), is_bot: false, is_original_bot: false });
        Some(position)
    }

    /// Explicitly places a bot in `position`, for host-issued `add_bot`.
    pub fn seat_bot(&self, position: Position, name: String) {
        let mut seats = self.seats.lock().expect("seats mutex poisoned");
        seats[position] = Some(SeatInfo { name, is_bot: true, is_original_bot: true });
    }

    /// Transport loss: the seat stays occupied but flips to bot control.
    pub fn convert_to_bot(&self, position: Position) {
        let mut seats = self.seats.lock().expect("seats mutex poisoned");
        if let Some(seat) = seats[position].as_mut() {
            seat.is_bot = true;
        }
    }

    /// A reconnecting human resumes a seat that was handed to a bot.
    pub fn reclaim_from_bot(&self, position: Position) {
        let mut seats = self.seats.lock().expect("seats mutex poisoned");
        if let Some(seat) = seats[position].as_mut() {
            seat.is_bot = false;
        }
    }

    pub fn is_bot(&self, position: Position) -> bool {
        self.seats.lock().expect("seats mutex poisoned")[position].as_ref().map(|s| s.is_bot).unwrap_or(false)
    }

    /// Explicit leave: empties the seat when no game is running, otherwise
    /// converts it to a bot so the round isn't stuck waiting on a vacated
    /// seat. Also promotes a new host if the leaver held that role.
    pub fn seat_leave(&self, position: Position) -> LeaveOutcome {
        let in_progress = !matches!(self.status(), RoomStatus::Waiting);
        let outcome = if in_progress {
            self.convert_to_bot(position);
            LeaveOutcome::ConvertedToBot
        } else {
            self.seats.lock().expect("seats mutex poisoned")[position] = None;
            LeaveOutcome::SeatOpened
        };
        if self.host() == position {
            self.promote_next_host();
        }
        outcome
    }

    /// Promotes the earliest-joined remaining human seat. Falls back to
    /// leaving the host position unchanged if no human remains — the room
    /// is about to be closed or is bot-only, in which case it no longer
    /// matters who nominally holds the seat.
    fn promote_next_host(&self) {
        let seats = self.seats.lock().expect("seats mutex poisoned");
        if let Some(position) = seats.iter().position(|s| matches!(s, Some(seat) if !seat.is_bot)) {
            drop(seats);
            *self.host.lock().expect("host mutex poisoned") = position;
        }
    }

    pub fn has_any_human(&self) -> bool {
        self.seats.lock().expect("seats mutex poisoned").iter().flatten().any(|s| !s.is_bot)
    }

    pub fn summary(&self) -> WireRoomSummary {
        let host_name = self.seat_name(self.host()).unwrap_or_default();
        WireRoomSummary {
            room_id: self.code.clone(),
            host: host_name,
            occupancy: self.occupancy(),
            max_players: N,
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

//! Lobby: owns every live room, mints room codes, and pumps each WebSocket
//! connection between the client and its room's `GameEngine`. Grounded on
//! `Casino`/`RoomHandle`, generalized from "poker table vs. one Fish" to a
//! four-seat room that can mix humans and bots in any slot.

mod code;
mod room;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::StreamExt;
use liap_auth::{Crypto, ReconnectClaims, TokenError};
use liap_bots::BotDriver;
use liap_connect::Registry;
use liap_core::{Config, Connection, Id, Position, Room as RoomMarker};
use liap_persist::{GameRepository, NoopRepository, Snapshot};
use liap_session::{decode, Action, GameEngine, ServerMessage, WireRoomSummary};
use rand::RngCore;
use tokio::sync::{mpsc, RwLock};

pub use room::{LeaveOutcome, RoomEntry, RoomStatus, SeatInfo};

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room not found")]
    NotFound,
    #[error("room is full")]
    Full,
    #[error("the server is already hosting its maximum number of rooms")]
    AtCapacity,
    #[error("a player named {0:?} is already in this room")]
    NameTaken(String),
    #[error("only the host may do this")]
    NotHost,
    #[error("seat {0} is already occupied")]
    SeatOccupied(Position),
    #[error("seat {0} is not bot-controlled")]
    NotABot(Position),
    #[error(transparent)]
    Game(#[from] liap_session::GameError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Owns every live room plus the shared connection registry. Generic over
/// the persistence backend so a deployment with no database configured just
/// instantiates `Lobby<NoopRepository>` (the default) and gets identical
/// behavior minus the fire-and-forget writes.
pub struct Lobby<R: GameRepository + 'static = NoopRepository> {
    rooms: RwLock<HashMap<Id<RoomMarker>, Arc<RoomEntry>>>,
    by_code: RwLock<HashMap<String, Id<RoomMarker>>>,
    config: Config,
    persistence: Arc<R>,
    crypto: Crypto,
    pub connections: Arc<Registry>,
}

impl Lobby<NoopRepository> {
    pub fn new(config: Config) -> Self {
        Self::with_persistence(config, Arc::new(NoopRepository))
    }
}

impl<R: GameRepository + 'static> Lobby<R> {
    /// Reconnection tokens are signed with a secret generated fresh for this
    /// process — they only ever need to outlive the 5-minute window between
    /// a disconnect and a reconnect attempt on the same running server, not
    /// a restart. A multi-instance deployment sharing tokens across
    /// processes would need [`Lobby::with_secret`] instead.
    pub fn with_persistence(config: Config, persistence: Arc<R>) -> Self {
        let mut secret = [0u8; 32];
        rand::rng().fill_bytes(&mut secret);
        Self::with_secret(config, persistence, &secret)
    }

    pub fn with_secret(config: Config, persistence: Arc<R>, secret: &[u8]) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            by_code: RwLock::new(HashMap::new()),
            config,
            persistence,
            crypto: Crypto::new(secret),
            connections: Arc::new(Registry::default()),
        }
    }

    pub async fn get(&self, id: Id<RoomMarker>) -> Option<Arc<RoomEntry>> {
        self.rooms.read().await.get(&id).cloned()
    }

    pub async fn get_by_code(&self, code: &str) -> Option<Arc<RoomEntry>> {
        let id = *self.by_code.read().await.get(code)?;
        self.get(id).await
    }

    /// Creates a room, seats the creator at position 0 as host, and adds it
    /// to the lobby index. Rejected once `Config::max_rooms` live rooms are
    /// already open.
    pub async fn create_room(
        &self,
        room_name: String,
        player_name: &str,
        is_public: bool,
    ) -> Result<(Arc<RoomEntry>, Position), RoomError> {
        let mut by_code = self.by_code.write().await;
        if by_code.len() >= self.config.max_rooms {
            return Err(RoomError::AtCapacity);
        }
        let taken: HashSet<String> = by_code.keys().cloned().collect();
        let code = code::generate(&taken);
        let id = Id::default();
        let room = Arc::new(RoomEntry::new(id, code.clone(), room_name, is_public, self.config.clone()));
        let position = room.seat_join(player_name).expect("a fresh room always has an empty seat 0");
        by_code.insert(code, id);
        drop(by_code);
        self.rooms.write().await.insert(id, room.clone());
        Ok((room, position))
    }

    /// Assigns the lowest-index empty seat to `player_name`, rejecting a
    /// duplicate name within the room.
    pub async fn join_room(&self, code: &str, player_name: &str) -> Result<(Arc<RoomEntry>, Position), RoomError> {
        let room = self.get_by_code(code).await.ok_or(RoomError::NotFound)?;
        if room.name_taken(player_name) {
            return Err(RoomError::NameTaken(player_name.to_string()));
        }
        let position = room.seat_join(player_name).ok_or(RoomError::Full)?;
        Ok((room, position))
    }

    /// Explicit leave. Opens the seat (no game running) or hands it to a bot
    /// (game in progress), then closes the room if it has emptied out.
    pub async fn leave_room(&self, id: Id<RoomMarker>, position: Position) -> Result<LeaveOutcome, RoomError> {
        let room = self.get(id).await.ok_or(RoomError::NotFound)?;
        let outcome = room.seat_leave(position);
        if let LeaveOutcome::ConvertedToBot = outcome {
            room.bots.lock().await.add_bot(position);
            drive_bots(&room).await;
        }
        if !room.has_any_human() && matches!(room.status(), RoomStatus::Waiting) {
            self.close(id).await.ok();
        }
        Ok(outcome)
    }

    /// Host-only. Requires every seat filled (human or bot) before dealing.
    pub async fn start_game(&self, id: Id<RoomMarker>, requester: Position) -> Result<(), RoomError> {
        let room = self.get(id).await.ok_or(RoomError::NotFound)?;
        if room.host() != requester {
            return Err(RoomError::NotHost);
        }
        if !room.is_full() {
            return Err(RoomError::Full);
        }
        room.engine.lock().await.handle_action(requester, Action::StartGame)?;
        room.set_status(RoomStatus::Playing);
        self.persist_latest(&room);
        drive_bots(&room).await;
        Ok(())
    }

    /// Host-only. Fills an empty seat with a bot under a placeholder name.
    pub async fn add_bot(&self, id: Id<RoomMarker>, requester: Position, target: Position) -> Result<(), RoomError> {
        let room = self.get(id).await.ok_or(RoomError::NotFound)?;
        if room.host() != requester {
            return Err(RoomError::NotHost);
        }
        if room.seat_name(target).is_some() {
            return Err(RoomError::SeatOccupied(target));
        }
        room.seat_bot(target, format!("Bot {}", target + 1));
        room.bots.lock().await.add_bot(target);
        Ok(())
    }

    /// Host-only. Only meaningful for a seat that is still bot-controlled
    /// and not mid-game — removing a bot mid-round would strand its hand.
    pub async fn remove_bot(&self, id: Id<RoomMarker>, requester: Position, target: Position) -> Result<(), RoomError> {
        let room = self.get(id).await.ok_or(RoomError::NotFound)?;
        if room.host() != requester {
            return Err(RoomError::NotHost);
        }
        if !room.is_bot(target) {
            return Err(RoomError::NotABot(target));
        }
        room.seat_leave(target);
        room.bots.lock().await.remove_bot(target);
        Ok(())
    }

    /// Converts a heartbeat-timed-out seat to bot control, broadcasts
    /// `player_disconnected`, and drains any resulting bot cascade. Called by
    /// `bin/server`'s periodic sweep task once it resolves a [`liap_connect::StaleSeat`]
    /// back to this room's entry; the connection registry has already forgotten the
    /// dead connection by the time this runs.
    pub async fn handle_stale_seat(&self, id: Id<RoomMarker>, position: Position) {
        let Some(room) = self.get(id).await else { return };
        room.engine.lock().await.table_mut().disconnect(position);
        room.convert_to_bot(position);
        room.bots.lock().await.add_bot(position);
        let player = room.seat_name(position).unwrap_or_default();
        let frame = ServerMessage::PlayerDisconnected { player, ai_activated: true, timeout_seconds: 0 };
        room.engine.lock().await.table().broadcast(frame);
        drive_bots(&room).await;
        log::debug!("[room {}] seat {position} timed out, handed to bot", room.code);
    }

    /// Sweeps every in-progress room for a lapsed phase-decision deadline,
    /// applying the phase's default action on behalf of whichever seat
    /// hasn't acted. Mirrors `handle_stale_seat`'s discipline of routing a
    /// scheduled synthetic action through the same path a client action
    /// takes, rather than mutating room state from the sweep task directly.
    pub async fn sweep_phase_timeouts(&self) {
        let rooms: Vec<Arc<RoomEntry>> = self.rooms.read().await.values().cloned().collect();
        for room in rooms {
            if !matches!(room.status(), RoomStatus::Playing) {
                continue;
            }
            let outcome = room.engine.lock().await.expire_timeout();
            if let Some(Ok(())) = outcome {
                self.persist_latest(&room);
                drive_bots(&room).await;
            }
        }
    }

    pub async fn close(&self, id: Id<RoomMarker>) -> Result<(), RoomError> {
        let room = self.rooms.write().await.remove(&id).ok_or(RoomError::NotFound)?;
        self.by_code.write().await.remove(&room.code);
        room.set_status(RoomStatus::Abandoned);
        Ok(())
    }

    /// Public, joinable rooms still in the lobby — `room_list_update`'s payload.
    pub async fn room_list(&self) -> Vec<WireRoomSummary> {
        self.rooms
            .read()
            .await
            .values()
            .filter(|r| r.is_public && matches!(r.status(), RoomStatus::Waiting))
            .map(|r| r.summary())
            .collect()
    }

    /// Best-effort append of the room's latest change-log entry. Never
    /// awaited by a caller that needs the result — persistence is
    /// fire-and-forget except at process restart.
    fn persist_latest(&self, room: &Arc<RoomEntry>) {
        let persistence = self.persistence.clone();
        let room = room.clone();
        tokio::spawn(async move {
            let entry = {
                let engine = room.engine.lock().await;
                engine.change_log().latest().cloned()
            };
            let Some(entry) = entry else { return };
            if let Err(e) = persistence.append_event(room.id, entry.sequence_number, &entry.frame).await {
                log::debug!("[room {}] failed to persist event: {e}", room.code);
            }
        });
    }

    /// Snapshots the room's current public game state, used on `game_over`
    /// and periodically so a restart can resume from something.
    pub async fn snapshot_now(&self, room: &Arc<RoomEntry>) {
        let (round_number, sequence_number, state_json) = {
            let engine = room.engine.lock().await;
            let state = engine.phase().game_state();
            (state.round_number, engine.sequence_number(), serde_json::to_string(&state).unwrap_or_default())
        };
        let snapshot = Snapshot { round_number, sequence_number, state_json };
        if let Err(e) = self.persistence.save_snapshot(room.id, snapshot).await {
            log::debug!("[room {}] failed to persist snapshot: {e}", room.code);
        }
    }

    /// Mints a short-lived reconnection token for `position`'s current
    /// occupant, stamped with the sequence number the client has seen so
    /// far. Sent to the client once it settles into a seat (`client_ready`),
    /// never on every frame.
    pub async fn mint_reconnect_token(&self, room: &Arc<RoomEntry>, position: Position) -> Result<String, RoomError> {
        let name = room.seat_name(position).unwrap_or_default();
        let last_seen_seq = room.engine.lock().await.sequence_number();
        let claims = ReconnectClaims::new(room.id, position, name, last_seen_seq);
        Ok(self.crypto.encode(&claims)?)
    }

    /// Bridges one WebSocket connection to `room`'s seat `position`: pumps
    /// outbound frames from the seat's channel to the socket, and decodes
    /// inbound frames into actions submitted through `GameEngine::handle_action`.
    /// Grounded verbatim on `Casino::bridge`'s `tokio::select!` biased loop.
    pub async fn bridge(
        &self,
        room: Arc<RoomEntry>,
        position: Position,
        session: actix_ws::Session,
        stream: actix_ws::MessageStream,
    ) {
        self.bridge_inner(room, position, None, session, stream).await
    }

    /// Redeems a reconnection token and resumes the seat it names: replays
    /// any change-log entries newer than the token's `last_seen_seq`, or
    /// falls back to a full `sync_response` if they have already scrolled
    /// out of the bounded log.
    pub async fn reconnect(
        &self,
        token: &str,
        session: actix_ws::Session,
        stream: actix_ws::MessageStream,
    ) -> Result<(), RoomError> {
        let claims = self.crypto.decode(token)?;
        let room = self.get(claims.room).await.ok_or(RoomError::NotFound)?;
        self.bridge_inner(room, claims.position, Some(claims.last_seen_seq), session, stream).await;
        Ok(())
    }

    async fn bridge_inner(
        &self,
        room: Arc<RoomEntry>,
        position: Position,
        resume_from: Option<liap_core::SequenceNumber>,
        mut session: actix_ws::Session,
        mut stream: actix_ws::MessageStream,
    ) {
        let connection_id: Id<Connection> = Id::default();
        self.connections.attach(connection_id, room.id, position).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        room.engine.lock().await.table_mut().sit(position, tx);
        room.reclaim_from_bot(position);
        room.bots.lock().await.remove_bot(position);

        let reconnected = resume_from.is_some();
        let reconnect_token = self.mint_reconnect_token(&room, position).await.ok();
        let greeting = ServerMessage::Connected {
            connection_id: connection_id.to_string(),
            room_id: room.code.clone(),
            player_name: room.seat_name(position),
            reconnected,
            reconnect_token,
        };
        if session.text(greeting.to_json()).await.is_err() {
            self.connections.detach(connection_id).await;
            return;
        }
        if let Some(since) = resume_from {
            self.replay_or_sync(&room, since, &mut session).await;
            let reconnected_frame =
                ServerMessage::PlayerReconnected { player: room.seat_name(position).unwrap_or_default() };
            let _ = session.text(reconnected_frame.to_json()).await;
        }
        drive_bots(&room).await;
        log::debug!("[room {}] seat {position} connected", room.code);

        'pump: loop {
            tokio::select! {
                biased;
                outgoing = rx.recv() => match outgoing {
                    Some(frame) => {
                        if session.text(frame.to_json()).await.is_err() {
                            break 'pump;
                        }
                    }
                    None => break 'pump,
                },
                incoming = stream.next() => match incoming {
                    Some(Ok(actix_ws::Message::Text(text))) => {
                        let seen_seq = room.engine.lock().await.sequence_number();
                        self.connections.record_seen(connection_id, seen_seq).await;
                        match decode(&text).map(Action::from) {
                            Ok(action) => {
                                let outcome = room.engine.lock().await.handle_action(position, action);
                                match outcome {
                                    Ok(()) => {
                                        self.persist_latest(&room);
                                        drive_bots(&room).await;
                                    }
                                    Err(e) => send_error(&mut session, &e).await,
                                }
                            }
                            Err(e) => send_error(&mut session, &e).await,
                        }
                    }
                    Some(Ok(actix_ws::Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break 'pump;
                        }
                    }
                    Some(Ok(actix_ws::Message::Close(_))) => break 'pump,
                    Some(Err(_)) => break 'pump,
                    None => break 'pump,
                    _ => continue 'pump,
                },
            }
        }

        self.connections.detach(connection_id).await;
        room.engine.lock().await.table_mut().disconnect(position);
        room.convert_to_bot(position);
        room.bots.lock().await.add_bot(position);
        drive_bots(&room).await;
        log::debug!("[room {}] seat {position} disconnected", room.code);
    }

    /// Replays everything newer than `since` if the bounded change log still
    /// holds it, otherwise sends a full state snapshot instead.
    async fn replay_or_sync(&self, room: &Arc<RoomEntry>, since: liap_core::SequenceNumber, session: &mut actix_ws::Session) {
        let engine = room.engine.lock().await;
        let current_sequence = engine.sequence_number();
        match engine.change_log().since(since) {
            Some(entries) => {
                let missed_events =
                    entries.iter().filter_map(|e| serde_json::from_str(&e.frame).ok()).collect();
                let frame = ServerMessage::SyncResponse { current_sequence, missed_events, full_state: None };
                drop(engine);
                let _ = session.text(frame.to_json()).await;
            }
            None => {
                let full_state = serde_json::to_value(engine.phase().game_state()).ok();
                drop(engine);
                let frame = ServerMessage::SyncResponse { current_sequence, missed_events: vec![], full_state };
                let _ = session.text(frame.to_json()).await;
            }
        }
    }
}

async fn send_error(session: &mut actix_ws::Session, error: &liap_session::GameError) {
    let frame = ServerMessage::Error {
        code: error.code().to_string(),
        message: error.to_string(),
        details: None,
        recoverable: error.recoverable(),
    };
    let _ = session.text(frame.to_json()).await;
}

/// Runs every bot seat's decision to completion: after one bot acts the
/// phase may hand the turn straight to another bot (e.g. three bots in a
/// row with nothing for a human to do), so this loops until no bot has an
/// action pending, sleeping a randomized think-delay before each one.
async fn drive_bots(room: &Arc<RoomEntry>) {
    loop {
        let pending = {
            let engine = room.engine.lock().await;
            let bots = room.bots.lock().await;
            bots.bots().find_map(|seat| bots.decide(engine.phase(), seat).map(|action| (seat, action)))
        };
        let Some((seat, action)) = pending else { break };
        let delay = room.bots.lock().await.think_delay();
        tokio::time::sleep(delay).await;
        let mut engine = room.engine.lock().await;
        if let Err(e) = engine.handle_action(seat, action) {
            log::debug!("[room {}] bot seat {seat} action rejected: {e}", room.code);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_join_fills_seats_in_order() {
        let lobby = Lobby::new(Config::default());
        let (room, host_seat) = lobby.create_room("Alice's room".into(), "Alice", true).await.unwrap();
        assert_eq!(host_seat, 0);
        let (joined, seat) = lobby.join_room(&room.code, "Bob").await.unwrap();
        assert_eq!(joined.id, room.id);
        assert_eq!(seat, 1);
    }

    #[tokio::test]
    async fn join_rejects_duplicate_name() {
        let lobby = Lobby::new(Config::default());
        let (room, _) = lobby.create_room("r".into(), "Alice", true).await.unwrap();
        let err = lobby.join_room(&room.code, "Alice").await.unwrap_err();
        assert!(matches!(err, RoomError::NameTaken(_)));
    }

    #[tokio::test]
    async fn join_rejects_full_room() {
        let lobby = Lobby::new(Config::default());
        let (room, _) = lobby.create_room("r".into(), "Alice", true).await.unwrap();
        for name in ["Bob", "Carol", "David"] {
            lobby.join_room(&room.code, name).await.unwrap();
        }
        let err = lobby.join_room(&room.code, "Eve").await.unwrap_err();
        assert!(matches!(err, RoomError::Full));
    }

    #[tokio::test]
    async fn only_host_may_start_game() {
        let lobby = Lobby::new(Config::default());
        let (room, _) = lobby.create_room("r".into(), "Alice", true).await.unwrap();
        for name in ["Bob", "Carol", "David"] {
            lobby.join_room(&room.code, name).await.unwrap();
        }
        let err = lobby.start_game(room.id, 1).await.unwrap_err();
        assert!(matches!(err, RoomError::NotHost));
        lobby.start_game(room.id, 0).await.unwrap();
    }

    #[tokio::test]
    async fn leaving_host_before_game_start_promotes_next_seat() {
        let lobby = Lobby::new(Config::default());
        let (room, _) = lobby.create_room("r".into(), "Alice", true).await.unwrap();
        lobby.join_room(&room.code, "Bob").await.unwrap();
        lobby.leave_room(room.id, 0).await.unwrap();
        assert_eq!(room.host(), 1);
    }

    #[tokio::test]
    async fn room_list_only_surfaces_public_waiting_rooms() {
        let lobby = Lobby::new(Config::default());
        let (public_room, _) = lobby.create_room("public".into(), "Alice", true).await.unwrap();
        let (_, _) = lobby.create_room("private".into(), "Bob", false).await.unwrap();
        let listed = lobby.room_list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].room_id, public_room.code);
    }

    #[tokio::test]
    async fn minted_reconnect_token_decodes_to_the_same_seat() {
        let lobby = Lobby::new(Config::default());
        let (room, seat) = lobby.create_room("r".into(), "Alice", true).await.unwrap();
        let token = lobby.mint_reconnect_token(&room, seat).await.unwrap();
        let claims = lobby.crypto.decode(&token).unwrap();
        assert_eq!(claims.room, room.id);
        assert_eq!(claims.position, seat);
        assert_eq!(claims.name, "Alice");
    }
}

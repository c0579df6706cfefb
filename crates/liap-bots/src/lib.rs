//! CPU seat driver. A `BotDriver` reacts to a room's current phase the same
//! way a broadcast listener would, computing its decision synchronously off
//! the phase data rather than running its own async decision loop, then
//! lets the caller schedule the resulting action onto the room's bus after
//! a randomized think-delay.

use std::collections::HashSet;
use std::time::Duration;

use liap_core::Position;
use liap_pieces::{Color, Piece, Play, Rank};
use liap_session::{Action, PhaseState};
use rand::seq::IndexedRandom;
use rand::Rng;

/// A pluggable decision policy for a bot seat. Kept separate from
/// `BotDriver` so a stronger strategy can be swapped in without touching the
/// scheduling/bookkeeping code.
pub trait Strategy: Send + Sync {
    fn decide_redeal(&self) -> bool;
    /// `declared_so_far` excludes this seat's own declaration;
    /// `is_last_declarer` is true when this seat's choice is the one that
    /// must not bring the round total to exactly 8.
    fn decide_declaration(&self, declared_so_far: u8, is_last_declarer: bool) -> u8;
    fn decide_play(&self, hand: &[Piece], required_count: Option<usize>) -> Play;
}

/// Baseline bot: chooses uniformly among the options that are actually
/// legal, never among all conceivable ones. Mirrors the "choose randomly
/// from legal actions" shape of a simple CPU baseline player.
pub struct RandomStrategy;

impl Strategy for RandomStrategy {
    fn decide_redeal(&self) -> bool {
        rand::rng().random_bool(0.5)
    }

    fn decide_declaration(&self, declared_so_far: u8, is_last_declarer: bool) -> u8 {
        let mut rng = rand::rng();
        loop {
            let choice = rng.random_range(0..=8);
            if !(is_last_declarer && declared_so_far + choice == 8) {
                return choice;
            }
        }
    }

    fn decide_play(&self, hand: &[Piece], required_count: Option<usize>) -> Play {
        let mut rng = rand::rng();
        match required_count {
            None => {
                let piece = *hand.choose(&mut rng).expect("bot only leads with a nonempty hand");
                Play::new(vec![piece])
            }
            Some(0) => Play::pass(),
            Some(n) => matching_group(hand, n).map(Play::new).unwrap_or_else(Play::pass),
        }
    }
}

/// Finds a random group of `n` pieces sharing rank and color, the only
/// shape that is always legal to offer at a count greater than one.
fn matching_group(hand: &[Piece], n: usize) -> Option<Vec<Piece>> {
    let mut groups: std::collections::HashMap<(Rank, Color), Vec<Piece>> = std::collections::HashMap::new();
    for &piece in hand {
        groups.entry((piece.rank(), piece.color())).or_default().push(piece);
    }
    let mut candidates: Vec<Vec<Piece>> =
        groups.into_values().filter(|group| group.len() >= n).map(|mut g| {
            g.truncate(n);
            g
        }).collect();
    if candidates.is_empty() {
        return None;
    }
    let mut rng = rand::rng();
    candidates.remove(rng.random_range(0..candidates.len())).into()
}

/// Tracks which seats in a room are CPU-controlled and picks their next
/// action off the room's current phase.
pub struct BotDriver {
    bots: HashSet<Position>,
    strategy: Box<dyn Strategy>,
    think_delay_range: (Duration, Duration),
}

impl BotDriver {
    pub fn new(think_delay_range: (Duration, Duration)) -> Self {
        Self { bots: HashSet::new(), strategy: Box::new(RandomStrategy), think_delay_range }
    }

    pub fn add_bot(&mut self, position: Position) {
        self.bots.insert(position);
    }

    pub fn remove_bot(&mut self, position: Position) {
        self.bots.remove(&position);
    }

    pub fn is_bot(&self, position: Position) -> bool {
        self.bots.contains(&position)
    }

    pub fn bots(&self) -> impl Iterator<Item = Position> + '_ {
        self.bots.iter().copied()
    }

    /// Samples a think-delay in the configured range, so a bot's reply does
    /// not look instantaneous to the other seats.
    pub fn think_delay(&self) -> Duration {
        let (low, high) = self.think_delay_range;
        if low >= high {
            return low;
        }
        rand::rng().random_range(low..high)
    }

    /// Decides the bot's next action for `position`, given the room's
    /// current phase, or `None` if it is not this seat's turn to act.
    pub fn decide(&self, phase: &PhaseState, position: Position) -> Option<Action> {
        if !self.is_bot(position) {
            return None;
        }
        match phase {
            PhaseState::Preparation(session) => {
                if !session.weak_seats().contains(&position) {
                    return None;
                }
                Some(if self.strategy.decide_redeal() { Action::AcceptRedeal } else { Action::DeclineRedeal })
            }
            PhaseState::Declaration(session) => {
                if session.next_declarer() != Some(position) {
                    return None;
                }
                let round = session.round();
                let declared_so_far: u8 = (0..liap_core::N).filter_map(|i| round.seat(i).declared()).sum();
                let undeclared = (0..liap_core::N).filter(|&i| round.seat(i).declared().is_none()).count();
                Some(Action::Declare(self.strategy.decide_declaration(declared_so_far, undeclared == 1)))
            }
            PhaseState::Turn(session) => {
                if session.turn() != position {
                    return None;
                }
                let round = session.round();
                let hand = round.seat(position).hand();
                let play = self.strategy.decide_play(hand, round.required_count());
                if play.is_pass() {
                    Some(Action::Pass)
                } else {
                    Some(Action::Play(play.pieces().iter().map(|p| p.id()).collect()))
                }
            }
            _ => None,
        }
    }
}

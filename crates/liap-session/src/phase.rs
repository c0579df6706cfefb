use std::collections::HashMap;
use std::marker::PhantomData;

use liap_core::{Config, Points, Position, RoundNumber, N};
use liap_pieces::deal;
use liap_round::{Round, RoundError, RoundResult, TrickOutcome};
use liap_rules::is_session_over;

/// Zero-sized phase markers parameterizing [`Session`]. Mirrors the
/// typestate pattern this crate's turn/trick logic was adapted from: each
/// phase only exposes the operations legal in that phase, and transitions
/// consume `self`, making a method call against the wrong phase a compile
/// error instead of a runtime "wrong state" check.
pub struct Waiting;
pub struct Preparation;
pub struct Declaration;
pub struct Turn;
pub struct TurnResults;
pub struct Scoring;
pub struct GameOver;

/// A room's game state, parameterized by its current phase.
pub struct Session<Phase> {
    pub(crate) config: Config,
    pub(crate) totals: [Points; N],
    pub(crate) round: Option<Round>,
    pub(crate) round_number: RoundNumber,
    pub(crate) last_trick: Option<TrickOutcome>,
    pub(crate) last_score: Option<RoundResult>,
    /// Accept/decline answers collected during `Preparation`, keyed by seat.
    /// Only weak-hand seats are expected to answer; reset on every entry
    /// into `Preparation` (first deal of a round, and every redeal).
    pub(crate) redeal_decisions: HashMap<Position, bool>,
    phase: PhantomData<Phase>,
}

impl<Phase> Session<Phase> {
    fn retype<Next>(self) -> Session<Next> {
        Session {
            config: self.config,
            totals: self.totals,
            round: self.round,
            round_number: self.round_number,
            last_trick: self.last_trick,
            last_score: self.last_score,
            redeal_decisions: self.redeal_decisions,
            phase: PhantomData,
        }
    }
    pub fn totals(&self) -> [Points; N] {
        self.totals
    }
    pub fn round_number(&self) -> RoundNumber {
        self.round_number
    }
}

impl Session<Waiting> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            totals: [0; N],
            round: None,
            round_number: 0,
            last_trick: None,
            last_score: None,
            redeal_decisions: HashMap::new(),
            phase: PhantomData,
        }
    }
    /// Deals the first round and moves to `Preparation`, where weak hands are
    /// checked before declarations begin.
    pub fn begin(mut self, seed: u64) -> Session<Preparation> {
        self.round_number += 1;
        self.round = Some(Round::new(deal(seed), (self.round_number as usize - 1) % N));
        self.redeal_decisions.clear();
        self.retype()
    }
}

impl Session<Preparation> {
    fn round(&self) -> &Round {
        self.round.as_ref().expect("round dealt in begin()")
    }
    /// Seats whose hand contains no piece worth more than 9 points — eligible
    /// to request a redeal rather than play a hand they're likely to lose.
    pub fn weak_seats(&self) -> Vec<Position> {
        (0..N).filter(|&i| self.round().seat(i).is_weak_hand()).collect()
    }
    /// Records a weak-hand seat's accept/decline answer. Idempotent: a
    /// repeated answer from the same seat simply overwrites its prior one.
    pub fn record_redeal_decision(&mut self, position: Position, accept: bool) {
        self.redeal_decisions.insert(position, accept);
    }
    /// Whether every weak-hand seat has answered.
    pub fn decisions_collected(&self) -> bool {
        self.weak_seats().iter().all(|p| self.redeal_decisions.contains_key(p))
    }
    /// Whether at least one weak-hand seat accepted the redeal.
    pub fn any_accepted(&self) -> bool {
        self.redeal_decisions.values().any(|&accepted| accepted)
    }
    /// Re-deals with a new seed, keeping the same starter and doubling the
    /// round's scoring multiplier: any accepted redeal reshuffles and
    /// doubles the multiplier.
    pub fn redeal(mut self, seed: u64) -> Session<Preparation> {
        let starter = self.round().starter();
        let multiplier = self.round().multiplier() * 2;
        self.round = Some(Round::with_multiplier(deal(seed), starter, multiplier));
        self.redeal_decisions.clear();
        self.retype()
    }
    pub fn start_declarations(self) -> Session<Declaration> {
        self.retype()
    }
}

impl Session<Declaration> {
    pub fn round(&self) -> &Round {
        self.round.as_ref().expect("round dealt in begin()")
    }
    pub fn next_declarer(&self) -> Option<Position> {
        self.round().next_declarer()
    }
    pub fn declare(&mut self, position: Position, count: u8) -> Result<(), RoundError> {
        if let Some(expected) = self.round().next_declarer() {
            if expected != position {
                return Err(RoundError::OutOfTurn { expected, actual: position });
            }
        }
        self.round.as_mut().expect("round dealt").declare(position, count)
    }
    pub fn declarations_complete(&self) -> bool {
        self.round().declarations_complete()
    }
    pub fn start_turn(self) -> Session<Turn> {
        self.retype()
    }
}

impl Session<Turn> {
    pub fn round(&self) -> &Round {
        self.round.as_ref().expect("round dealt")
    }
    pub fn turn(&self) -> Position {
        self.round().turn()
    }
    pub fn play(&mut self, position: Position, play: liap_pieces::Play) -> Result<TrickOutcome, RoundError> {
        let outcome = self.round.as_mut().expect("round dealt").play(position, play)?;
        self.last_trick = Some(outcome.clone());
        Ok(outcome)
    }
    pub fn into_turn_results(self) -> Session<TurnResults> {
        self.retype()
    }
    /// The outcome of the most recent `play()` call, if any.
    pub fn last_trick(&self) -> Option<&TrickOutcome> {
        self.last_trick.as_ref()
    }
}

impl Session<TurnResults> {
    pub fn last_trick(&self) -> Option<&TrickOutcome> {
        self.last_trick.as_ref()
    }
    /// Either the round continues with another trick, or every hand is empty
    /// and the round moves to scoring.
    pub fn conclude(self) -> Result<Session<Turn>, Session<Scoring>> {
        let round_over = self.round.as_ref().expect("round dealt").is_over();
        if round_over {
            Err(self.retype())
        } else {
            Ok(self.retype())
        }
    }
}

impl Session<Scoring> {
    pub fn score(&mut self) -> RoundResult {
        let result = self.round.as_ref().expect("round dealt").finish(&self.config);
        for i in 0..N {
            self.totals[i] += result.deltas[i];
        }
        self.last_score = Some(result);
        result
    }
    /// Either the session is decided, or another round begins — dealt
    /// immediately so the returned `Preparation` session is ready to check
    /// for weak hands. The new round starts with whoever won the final pile
    /// of the round just scored.
    pub fn conclude(mut self, seed: u64) -> Result<Session<Preparation>, Session<GameOver>> {
        if is_session_over(&self.config, &self.totals, self.round_number) {
            return Err(self.retype());
        }
        let starter = match self.last_trick {
            Some(TrickOutcome::TrickComplete { winner, .. }) => winner,
            _ => self.round.as_ref().expect("round dealt").starter(),
        };
        self.round_number += 1;
        self.round = Some(Round::new(deal(seed), starter));
        self.redeal_decisions.clear();
        Ok(self.retype())
    }
}

impl Session<GameOver> {
    pub fn winner(&self) -> Position {
        (0..N).max_by_key(|&i| self.totals[i]).expect("N > 0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_begins_in_preparation_after_begin() {
        let session = Session::<Waiting>::new(Config::default()).begin(1);
        assert_eq!(session.round_number(), 1);
    }

    #[test]
    fn declarations_then_turn_phase_transitions_compile_and_run() {
        let session = Session::<Waiting>::new(Config::default()).begin(1);
        let session = session.start_declarations();
        let mut session = session;
        for seat in 0..N {
            let count = if seat == N - 1 { 1 } else { 2 };
            session.declare(seat, count).unwrap();
        }
        assert!(session.declarations_complete());
        let _turn_phase = session.start_turn();
    }

    #[test]
    fn redeal_decisions_reset_on_redeal() {
        let mut session = Session::<Waiting>::new(Config::default()).begin(1);
        for &seat in &session.weak_seats().clone() {
            session.record_redeal_decision(seat, true);
        }
        if !session.weak_seats().is_empty() {
            assert!(session.decisions_collected());
            session = session.redeal(2);
            assert!(!session.decisions_collected() || session.weak_seats().is_empty());
        }
    }

    #[test]
    fn game_over_winner_is_highest_total() {
        let session: Session<GameOver> = Session {
            config: Config::default(),
            totals: [51, 3, 2, 1],
            round: None,
            round_number: 0,
            last_trick: None,
            last_score: None,
            redeal_decisions: HashMap::new(),
            phase: PhantomData,
        };
        assert_eq!(session.winner(), 0);
    }
}

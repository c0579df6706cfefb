use crate::seat::Seat;
use liap_core::{Points, Position, N};
use liap_pieces::Piece;
use liap_pieces::Play;
use liap_rules::{compare, score_round, validate_shape, Comparison, IllegalPlay};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    #[error("it is not seat {expected}'s turn, seat {actual} tried to act")]
    OutOfTurn { expected: Position, actual: Position },
    #[error("declarations are already complete for this round")]
    DeclarationsComplete,
    #[error("seat {0} has already declared this round")]
    AlreadyDeclared(Position),
    #[error("the last declarer may not choose a value that makes the total equal 8")]
    SumEqualsEight,
    #[error(transparent)]
    Illegal(#[from] IllegalPlay),
}

/// Outcome of a single play within a trick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrickOutcome {
    /// The trick is still awaiting more seats to play.
    AwaitingNext { next_turn: Position },
    /// Every seat has acted; `winner` leads the next trick with an empty-handed
    /// pile awarded if `pile_size > 0` non-pass plays contended, including ties
    /// resolved by earliest play (the player who is already `current_winner`
    /// keeps the trick on a tie, per `liap-rules::compare`'s documented contract).
    TrickComplete { winner: Position, pile_size: usize },
}

/// Owns the private hands, declarations, and trick-by-trick state for one
/// round of play. Does not know about phases, timers, or the network — those
/// live in `liap-session`, which drives a `Round` purely through this API.
#[derive(Debug, Clone)]
pub struct Round {
    seats: [Seat; N],
    starter: Position,
    current_winner: Position,
    current_best: Option<Play>,
    required_count: Option<usize>,
    plays_this_trick: Vec<(Position, Play)>,
    trick_number: u32,
    multiplier: u32,
}

impl Round {
    pub fn new(hands: [Vec<Piece>; N], starter: Position) -> Self {
        Self::with_multiplier(hands, starter, 1)
    }

    /// Builds a round that carries a scoring multiplier forward from a prior
    /// redeal — each accepted redeal doubles it.
    pub fn with_multiplier(hands: [Vec<Piece>; N], starter: Position, multiplier: u32) -> Self {
        Self {
            seats: hands.map(Seat::new),
            starter,
            current_winner: starter,
            current_best: None,
            required_count: None,
            plays_this_trick: Vec::with_capacity(N),
            trick_number: 0,
            multiplier,
        }
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    pub fn seat(&self, position: Position) -> &Seat {
        &self.seats[position]
    }

    pub fn starter(&self) -> Position {
        self.starter
    }

    /// How many tricks have completed so far this round. Combined with
    /// `round_number` at the session layer, this gives the action bus a
    /// stable `turnNumber` to key its dedupe table on.
    pub fn trick_number(&self) -> u32 {
        self.trick_number
    }

    pub fn declarations_complete(&self) -> bool {
        self.seats.iter().all(|s| s.declared().is_some())
    }

    /// Records `position`'s declared pile count. Declaration order is seat
    /// order beginning at `starter` — the caller (`liap-session`'s phase
    /// machine) is responsible for enforcing that order; this method rejects
    /// a redundant declaration and, for the fourth and final declarer, any
    /// value that would make the round's total declared piles equal 8.
    pub fn declare(&mut self, position: Position, count: u8) -> Result<(), RoundError> {
        if self.declarations_complete() {
            return Err(RoundError::DeclarationsComplete);
        }
        if self.seats[position].declared().is_some() {
            return Err(RoundError::AlreadyDeclared(position));
        }
        let declared_so_far: u8 = self.seats.iter().filter_map(|s| s.declared()).sum();
        let is_last_declarer = self.seats.iter().filter(|s| s.declared().is_none()).count() == 1;
        if is_last_declarer && declared_so_far + count == 8 {
            return Err(RoundError::SumEqualsEight);
        }
        self.seats[position].declare(count);
        Ok(())
    }

    /// Whose turn it is within the current trick.
    pub fn turn(&self) -> Position {
        (self.starter + self.plays_this_trick.len()) % N
    }

    /// The piece count a follower must match this trick, or `None` if this
    /// seat is leading and free to set the shape.
    pub fn required_count(&self) -> Option<usize> {
        self.required_count
    }

    /// Plays submitted so far in the current trick, in the order they were made.
    pub fn plays_this_trick(&self) -> &[(Position, Play)] {
        &self.plays_this_trick
    }

    /// Seat expected to declare next. Declaration order is seat order
    /// beginning at the round's starter.
    pub fn next_declarer(&self) -> Option<Position> {
        let declared = self.seats.iter().filter(|s| s.declared().is_some()).count();
        (declared < N).then(|| (self.starter + declared) % N)
    }

    /// Plays `play` on behalf of `position`, validating turn order, shape,
    /// and hand membership. On `TrickComplete`, the winning seat's pile count
    /// is already incremented and the trick state is reset for the next lead.
    pub fn play(&mut self, position: Position, play: Play) -> Result<TrickOutcome, RoundError> {
        let expected = self.turn();
        if position != expected {
            return Err(RoundError::OutOfTurn { expected, actual: position });
        }
        validate_shape(&play, self.seats[position].hand(), self.required_count)?;

        if self.plays_this_trick.is_empty() {
            self.required_count = Some(play.required_count());
            self.current_winner = position;
            self.current_best = Some(play.clone());
        } else if !play.is_pass() {
            let best = self.current_best.as_ref().expect("leader always plays first");
            if matches!(compare(&play, best), Comparison::ChallengerWins) {
                self.current_winner = position;
                self.current_best = Some(play.clone());
            }
        }

        self.seats[position].remove(play.pieces());
        self.plays_this_trick.push((position, play));

        if self.plays_this_trick.len() == N {
            let winner = self.current_winner;
            let pile_size = self.plays_this_trick.iter().filter(|(_, p)| !p.is_pass()).count();
            self.seats[winner].win_pile();
            self.starter = winner;
            self.plays_this_trick.clear();
            self.required_count = None;
            self.current_best = None;
            self.current_winner = winner;
            self.trick_number += 1;
            Ok(TrickOutcome::TrickComplete { winner, pile_size })
        } else {
            Ok(TrickOutcome::AwaitingNext { next_turn: self.turn() })
        }
    }

    /// A round is over once every seat has emptied its hand.
    pub fn is_over(&self) -> bool {
        self.seats.iter().all(|s| s.is_hand_empty())
    }

    /// Scores the round, multiplying every delta by the round's accumulated
    /// redeal multiplier. Panics if declarations are incomplete — the phase
    /// machine never calls this before `declarations_complete()`.
    pub fn finish(&self, config: &liap_core::Config) -> RoundResult {
        debug_assert!(self.declarations_complete());
        let declared: [u8; N] = std::array::from_fn(|i| self.seats[i].declared().unwrap_or(0));
        let piles: [u8; N] = std::array::from_fn(|i| self.seats[i].piles_taken());
        let scores = score_round(config, &declared, &piles);
        RoundResult {
            deltas: std::array::from_fn(|i| scores[i].delta * self.multiplier as Points),
            final_piles: piles,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundResult {
    pub deltas: [Points; N],
    pub final_piles: [u8; N],
}

#[cfg(test)]
mod tests {
    use super::*;
    use liap_pieces::{canonical_deck, deal};

    #[test]
    fn declaration_order_rejects_double_declare() {
        let mut round = Round::new(deal(1), 0);
        round.declare(0, 2).unwrap();
        assert_eq!(round.declare(0, 3), Err(RoundError::AlreadyDeclared(0)));
    }

    #[test]
    fn last_declarer_cannot_make_sum_equal_eight() {
        let mut round = Round::new(deal(1), 0);
        round.declare(0, 3).unwrap();
        round.declare(1, 2).unwrap();
        round.declare(2, 2).unwrap();
        assert_eq!(round.declare(3, 1), Err(RoundError::SumEqualsEight));
        round.declare(3, 0).unwrap();
        assert!(round.declarations_complete());
    }

    #[test]
    fn single_piece_turn_is_rejected_out_of_order() {
        let mut round = Round::new(deal(1), 0);
        let hand = round.seat(1).hand().to_vec();
        let play = Play::new(vec![hand[0]]);
        assert_eq!(round.play(1, play), Err(RoundError::OutOfTurn { expected: 0, actual: 1 }));
    }

    #[test]
    fn trick_completes_after_all_four_seats_play() {
        let mut round = Round::new(deal(3), 0);
        for seat in 0..4 {
            let piece = round.seat(seat).hand()[0];
            let outcome = round.play(seat, Play::new(vec![piece])).unwrap();
            if seat < 3 {
                assert_eq!(outcome, TrickOutcome::AwaitingNext { next_turn: seat + 1 });
            } else {
                match outcome {
                    TrickOutcome::TrickComplete { pile_size, .. } => assert_eq!(pile_size, 4),
                    other => panic!("expected trick complete, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn trick_winner_leads_next_trick() {
        let mut round = Round::new(deal(3), 0);
        let general = canonical_deck()
            .into_iter()
            .find(|p| p.rank() == liap_pieces::Rank::General && p.color() == liap_pieces::Color::Red)
            .unwrap();
        let general_holder = (0..4).find(|&s| round.seat(s).hand().contains(&general)).unwrap();

        for seat in 0..4 {
            let piece = if seat == general_holder {
                general
            } else {
                round
                    .seat(seat)
                    .hand()
                    .iter()
                    .copied()
                    .find(|p| p.point() < general.point())
                    .unwrap()
            };
            let outcome = round.play(seat, Play::new(vec![piece])).unwrap();
            if seat == 3 {
                match outcome {
                    TrickOutcome::TrickComplete { winner, .. } => assert_eq!(winner, general_holder),
                    other => panic!("expected trick complete, got {other:?}"),
                }
            }
        }
        assert_eq!(round.turn(), general_holder);
    }

    #[test]
    fn multiplier_doubles_every_delta() {
        let config = liap_core::Config::default();
        let mut round = Round::with_multiplier(deal(1), 0, 2);
        for seat in 0..4 {
            round.declare(seat, 0).unwrap();
        }
        let result = round.finish(&config);
        assert_eq!(result.deltas[0], config.base_points * 2);
    }

    #[test]
    fn next_declarer_follows_seat_order_from_starter() {
        let mut round = Round::new(deal(1), 2);
        assert_eq!(round.next_declarer(), Some(2));
        round.declare(2, 1).unwrap();
        assert_eq!(round.next_declarer(), Some(3));
    }

    #[test]
    fn round_is_over_once_all_hands_empty() {
        let mut round = Round::new(deal(9), 0);
        assert!(!round.is_over());
        for _ in 0..8 {
            for seat in 0..4 {
                let piece = round.seat(seat).hand()[0];
                round.play(seat, Play::new(vec![piece])).unwrap();
            }
        }
        assert!(round.is_over());
    }
}

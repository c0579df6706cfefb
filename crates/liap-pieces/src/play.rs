use crate::piece::{Color, Piece, Rank};

/// The shape a play takes, independent of which specific pieces compose it.
/// `liap-rules::compare` only ever compares plays of the same variant and count;
/// cross-variant legality is decided by the turn leader's opening play, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum PlayType {
    /// A single piece.
    Single,
    /// Two pieces of identical rank and color.
    Pair,
    /// Three pieces of identical rank and color.
    Triple,
    /// Four pieces of identical rank and color.
    Quad,
    /// Five pieces of identical rank and color ("five of a kind").
    FiveOfAKind,
    /// Five pieces that don't share rank/color but still total a valid
    /// straight-like combination in this game's ruleset.
    Mixed,
    /// An explicit decline to play on this turn.
    Pass,
}

/// A candidate play: zero or more pieces a seat puts forward on their turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Play {
    pieces: Vec<Piece>,
}

impl Play {
    pub fn new(pieces: Vec<Piece>) -> Self {
        Self { pieces }
    }
    pub fn pass() -> Self {
        Self { pieces: Vec::new() }
    }
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }
    pub fn required_count(&self) -> usize {
        self.pieces.len()
    }
    pub fn is_pass(&self) -> bool {
        self.pieces.is_empty()
    }
    pub fn total_points(&self) -> i32 {
        self.pieces.iter().map(|p| p.point()).sum()
    }

    /// Classifies the shape of this play. Returns `None` for a combination
    /// that matches no recognized `PlayType` (e.g. three unrelated singles) —
    /// the caller treats `None` as an illegal play.
    pub fn classify(&self) -> Option<PlayType> {
        if self.is_pass() {
            return Some(PlayType::Pass);
        }
        let same_rank_color = self
            .pieces
            .windows(2)
            .all(|w| w[0].rank() == w[1].rank() && w[0].color() == w[1].color());
        if same_rank_color {
            return match self.pieces.len() {
                1 => Some(PlayType::Single),
                2 => Some(PlayType::Pair),
                3 => Some(PlayType::Triple),
                4 => Some(PlayType::Quad),
                5 => Some(PlayType::FiveOfAKind),
                _ => None,
            };
        }
        if self.pieces.len() == 5 && is_mixed_straight(&self.pieces) {
            return Some(PlayType::Mixed);
        }
        None
    }

    /// The strength tuple used to order two plays of the same `(PlayType, count)`:
    /// highest single point value first, then total points as the tiebreaker.
    pub fn strength(&self) -> (i32, i32) {
        let top = self.pieces.iter().map(|p| p.point()).max().unwrap_or(0);
        (top, self.total_points())
    }
}

/// A MIXED play is five pieces spanning distinct ranks in strictly descending
/// rank order, all of the same color — the closest analogue to a "straight"
/// this piece set supports. This is a design decision documented in DESIGN.md.
fn is_mixed_straight(pieces: &[Piece]) -> bool {
    if pieces.len() != 5 {
        return false;
    }
    let color: Color = pieces[0].color();
    if !pieces.iter().all(|p| p.color() == color) {
        return false;
    }
    let mut ranks: Vec<Rank> = pieces.iter().map(|p| p.rank()).collect();
    ranks.sort();
    ranks.dedup();
    ranks.len() == 5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::canonical_deck;

    fn pieces_of(rank: Rank, color: Color, n: usize) -> Vec<Piece> {
        canonical_deck()
            .into_iter()
            .filter(|p| p.rank() == rank && p.color() == color)
            .take(n)
            .collect()
    }

    #[test]
    fn single_classifies() {
        let play = Play::new(pieces_of(Rank::Soldier, Color::Red, 1));
        assert_eq!(play.classify(), Some(PlayType::Single));
    }

    #[test]
    fn pair_classifies() {
        let play = Play::new(pieces_of(Rank::Advisor, Color::Red, 2));
        assert_eq!(play.classify(), Some(PlayType::Pair));
    }

    #[test]
    fn unrelated_triple_does_not_classify() {
        let mut pieces = pieces_of(Rank::Soldier, Color::Red, 1);
        pieces.extend(pieces_of(Rank::Cannon, Color::Black, 1));
        pieces.extend(pieces_of(Rank::Horse, Color::Red, 1));
        let play = Play::new(pieces);
        assert_eq!(play.classify(), None);
    }

    #[test]
    fn pass_classifies_and_has_no_pieces() {
        let play = Play::pass();
        assert_eq!(play.classify(), Some(PlayType::Pass));
        assert!(play.is_pass());
    }

    #[test]
    fn mixed_straight_classifies() {
        let deck = canonical_deck();
        let color = Color::Red;
        let mut pieces: Vec<Piece> = [
            Rank::Soldier,
            Rank::Cannon,
            Rank::Horse,
            Rank::Chariot,
            Rank::Elephant,
        ]
        .into_iter()
        .map(|rank| deck.iter().find(|p| p.rank() == rank && p.color() == color).copied().unwrap())
        .collect();
        pieces.sort();
        let play = Play::new(pieces);
        assert_eq!(play.classify(), Some(PlayType::Mixed));
    }
}

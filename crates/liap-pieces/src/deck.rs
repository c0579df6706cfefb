use crate::piece::{Color, Piece, Rank};
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Every deployment deals from exactly this 32-piece set. Point values are the single
/// source of truth for weak-hand detection and scoring; nothing else in this crate or
/// `liap-rules` hardcodes a piece's worth.
///
/// Counts mirror the Chinese-chess piece set this game borrows from: one General per
/// color, two each of Advisor/Elephant/Chariot/Horse/Cannon per color, five Soldiers
/// per color. Point values rank strictly by `(rank, color)` with red outranking black
/// at every shared rank except Soldier, which is worth the same one point regardless
/// of color since it is the weakest piece either way.
pub fn canonical_deck() -> Vec<Piece> {
    let mut id = 0u8;
    let mut next = |rank: Rank, color: Color, point: i32| {
        let piece = Piece::new(id, rank, color, point);
        id += 1;
        piece
    };
    let mut pieces = Vec::with_capacity(32);
    pieces.push(next(Rank::General, Color::Red, 14));
    pieces.push(next(Rank::General, Color::Black, 13));
    for _ in 0..2 {
        pieces.push(next(Rank::Advisor, Color::Red, 11));
    }
    for _ in 0..2 {
        pieces.push(next(Rank::Advisor, Color::Black, 10));
    }
    for _ in 0..2 {
        pieces.push(next(Rank::Elephant, Color::Red, 9));
    }
    for _ in 0..2 {
        pieces.push(next(Rank::Elephant, Color::Black, 8));
    }
    for _ in 0..2 {
        pieces.push(next(Rank::Chariot, Color::Red, 7));
    }
    for _ in 0..2 {
        pieces.push(next(Rank::Chariot, Color::Black, 6));
    }
    for _ in 0..2 {
        pieces.push(next(Rank::Horse, Color::Red, 5));
    }
    for _ in 0..2 {
        pieces.push(next(Rank::Horse, Color::Black, 4));
    }
    for _ in 0..2 {
        pieces.push(next(Rank::Cannon, Color::Red, 3));
    }
    for _ in 0..2 {
        pieces.push(next(Rank::Cannon, Color::Black, 2));
    }
    for _ in 0..5 {
        pieces.push(next(Rank::Soldier, Color::Red, 1));
    }
    for _ in 0..5 {
        pieces.push(next(Rank::Soldier, Color::Black, 1));
    }
    debug_assert_eq!(pieces.len(), 32);
    pieces
}

/// A hand is weak if every piece in it is worth 9 points or less —
/// i.e. no General or Advisor of either color. Pure function over a hand snapshot.
pub fn is_weak_hand(hand: &[Piece]) -> bool {
    hand.iter().all(|p| p.point() <= 9)
}

/// Shuffles the canonical deck deterministically from `seed` and deals `N` equal
/// hands of 8 pieces each in seat order, using a seeded small RNG rather than
/// OS entropy so a replay can reproduce a deal.
pub fn deal(seed: u64) -> [Vec<Piece>; liap_core::N] {
    let mut deck = canonical_deck();
    let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
    deck.shuffle(&mut rng);
    let mut hands: [Vec<Piece>; liap_core::N] = Default::default();
    for (i, piece) in deck.into_iter().enumerate() {
        hands[i % liap_core::N].push(piece);
    }
    hands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_deck_has_32_pieces() {
        assert_eq!(canonical_deck().len(), 32);
    }

    #[test]
    fn canonical_deck_ids_are_unique() {
        let ids: std::collections::HashSet<_> = canonical_deck().iter().map(|p| p.id()).collect();
        assert_eq!(ids.len(), 32);
    }

    #[test]
    fn general_is_the_strongest_piece() {
        let deck = canonical_deck();
        let max = deck.iter().max().unwrap();
        assert_eq!(max.rank(), Rank::General);
        assert_eq!(max.color(), Color::Red);
        assert_eq!(max.point(), 14);
    }

    #[test]
    fn deal_is_deterministic_for_a_given_seed() {
        let a = deal(42);
        let b = deal(42);
        assert_eq!(a, b);
    }

    #[test]
    fn deal_splits_evenly_across_four_seats() {
        let hands = deal(7);
        for hand in &hands {
            assert_eq!(hand.len(), 8);
        }
    }

    #[test]
    fn weak_hand_detection() {
        let weak: Vec<Piece> = canonical_deck().into_iter().filter(|p| p.point() <= 9).take(8).collect();
        assert!(is_weak_hand(&weak));
        let mut strong = weak.clone();
        strong[0] = canonical_deck().into_iter().find(|p| p.rank() == Rank::General).unwrap();
        assert!(!is_weak_hand(&strong));
    }
}

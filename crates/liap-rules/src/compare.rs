use liap_pieces::{Play, PlayType};

/// Result of comparing a challenger play to the currently-winning play on the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    ChallengerWins,
    LeaderHolds,
    Tie,
}

/// Compares `challenger` against `current` (the play currently winning the turn).
///
/// Within one `(PlayType, count)` the higher strength tuple wins; ties are left
/// as [`Comparison::Tie`] for the caller to resolve using turn-order context
/// (earliest play in turn order keeps the lead — see `liap-round::turn`).
///
/// `Mixed` plays only ever contend against other `Mixed` plays of the same
/// count: a `Mixed` hand is a legal opening play but can never beat, and is
/// never beaten by, a pure pair/triple/quad/five of the same count — those
/// two shapes simply never contend (see `is_comparable`). `Pass` never wins.
pub fn compare(challenger: &Play, current: &Play) -> Comparison {
    let (Some(a), Some(b)) = (challenger.classify(), current.classify()) else {
        return Comparison::LeaderHolds;
    };
    if a == PlayType::Pass {
        return Comparison::LeaderHolds;
    }
    if b == PlayType::Pass {
        return Comparison::ChallengerWins;
    }
    if !is_comparable(a, b) || challenger.required_count() != current.required_count() {
        return Comparison::LeaderHolds;
    }
    match challenger.strength().cmp(&current.strength()) {
        std::cmp::Ordering::Greater => Comparison::ChallengerWins,
        std::cmp::Ordering::Less => Comparison::LeaderHolds,
        std::cmp::Ordering::Equal => Comparison::Tie,
    }
}

/// Two play shapes only ever contend if they are identical, or both `Mixed`.
/// A `Mixed` play can never contend against a pure same-rank combination of
/// equal count and vice versa.
fn is_comparable(a: PlayType, b: PlayType) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use liap_pieces::{canonical_deck, Color, Rank};

    fn take(rank: Rank, color: Color, n: usize) -> Vec<liap_pieces::Piece> {
        canonical_deck().into_iter().filter(|p| p.rank() == rank && p.color() == color).take(n).collect()
    }

    #[test]
    fn higher_single_beats_lower_single() {
        let weak = Play::new(take(Rank::Soldier, Color::Red, 1));
        let strong = Play::new(take(Rank::General, Color::Red, 1));
        assert_eq!(compare(&strong, &weak), Comparison::ChallengerWins);
        assert_eq!(compare(&weak, &strong), Comparison::LeaderHolds);
    }

    #[test]
    fn pass_never_beats_anything_and_anything_beats_pass() {
        let pass = Play::pass();
        let single = Play::new(take(Rank::Soldier, Color::Red, 1));
        assert_eq!(compare(&pass, &single), Comparison::LeaderHolds);
        assert_eq!(compare(&single, &pass), Comparison::ChallengerWins);
    }

    #[test]
    fn pair_cannot_contend_against_mixed_of_same_count_when_counts_differ() {
        let pair = Play::new(take(Rank::Advisor, Color::Red, 2));
        let single = Play::new(take(Rank::Soldier, Color::Red, 1));
        assert_eq!(compare(&pair, &single), Comparison::LeaderHolds);
    }

    #[test]
    fn identical_plays_tie() {
        let a = Play::new(take(Rank::Advisor, Color::Red, 2));
        let b = Play::new(take(Rank::Advisor, Color::Red, 2));
        assert_eq!(compare(&a, &b), Comparison::Tie);
    }
}

use liap_pieces::{Play, PlayType};

/// Why a proposed play was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalPlay {
    #[error("play does not match a recognized shape")]
    UnrecognizedShape,
    #[error("play must contain {expected} pieces to follow the turn, got {actual}")]
    WrongCount { expected: usize, actual: usize },
    #[error("a player's hand does not contain one or more of the pieces played")]
    PieceNotInHand,
    #[error("only the turn leader may pass")]
    LeaderCannotPass,
}

/// Validates a play against the pieces a seat actually holds, and against the
/// turn's required shape (`None` when this seat is the leader, free to set the
/// shape for the turn).
pub fn validate_shape(play: &Play, hand: &[liap_pieces::Piece], required_count: Option<usize>) -> Result<PlayType, IllegalPlay> {
    if !play.is_pass() {
        for piece in play.pieces() {
            if !hand.contains(piece) {
                return Err(IllegalPlay::PieceNotInHand);
            }
        }
    }
    let kind = play.classify().ok_or(IllegalPlay::UnrecognizedShape)?;
    if let Some(expected) = required_count {
        if kind == PlayType::Pass {
            if expected == 0 {
                return Err(IllegalPlay::LeaderCannotPass);
            }
            return Ok(kind);
        }
        if play.required_count() != expected {
            return Err(IllegalPlay::WrongCount { expected, actual: play.required_count() });
        }
    } else if kind == PlayType::Pass {
        return Err(IllegalPlay::LeaderCannotPass);
    }
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use liap_pieces::{canonical_deck, Color, Rank};

    fn hand_with(rank: Rank, color: Color, n: usize) -> Vec<liap_pieces::Piece> {
        canonical_deck().into_iter().filter(|p| p.rank() == rank && p.color() == color).take(n).collect()
    }

    #[test]
    fn leader_cannot_pass() {
        let hand = hand_with(Rank::Soldier, Color::Red, 1);
        let play = Play::pass();
        assert_eq!(validate_shape(&play, &hand, None), Err(IllegalPlay::LeaderCannotPass));
    }

    #[test]
    fn follower_may_pass() {
        let hand = hand_with(Rank::Soldier, Color::Red, 1);
        let play = Play::pass();
        assert_eq!(validate_shape(&play, &hand, Some(1)), Ok(PlayType::Pass));
    }

    #[test]
    fn follower_must_match_count() {
        let hand = hand_with(Rank::Advisor, Color::Red, 2);
        let play = Play::new(hand.clone());
        assert_eq!(
            validate_shape(&play, &hand, Some(1)),
            Err(IllegalPlay::WrongCount { expected: 1, actual: 2 })
        );
    }

    #[test]
    fn piece_must_be_in_hand() {
        let hand = hand_with(Rank::Soldier, Color::Red, 1);
        let foreign = hand_with(Rank::General, Color::Red, 1);
        let play = Play::new(foreign);
        assert_eq!(validate_shape(&play, &hand, None), Err(IllegalPlay::PieceNotInHand));
    }
}

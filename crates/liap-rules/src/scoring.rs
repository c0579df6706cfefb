use liap_core::{Config, Points};

/// Final standing for one seat at the end of a round, before it's applied to
/// the session total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundScore {
    pub declared: u8,
    pub actual: u8,
    pub delta: Points,
}

/// Scores every seat's declared-vs-actual pile count for a finished round.
///
/// A seat that hits its declaration exactly earns `base_points +
/// cover_bonus_per_pile` per pile it took; a seat that misses loses one point
/// per pile of difference between declared and actual. Declaring and taking
/// exactly zero piles earns a flat `base_points` (a deliberately-conservative
/// declaration that pays off).
pub fn score_round(config: &Config, declarations: &[u8; liap_core::N], piles_taken: &[u8; liap_core::N]) -> [RoundScore; liap_core::N] {
    std::array::from_fn(|i| {
        let declared = declarations[i];
        let actual = piles_taken[i];
        let delta = if declared == actual {
            if declared == 0 {
                config.base_points
            } else {
                (config.base_points + config.cover_bonus_per_pile) * declared as Points
            }
        } else {
            -(declared as Points - actual as Points).abs()
        };
        RoundScore { declared, actual, delta }
    })
}

/// Whether a session has reached its winning score or its round limit. Ties
/// above the winning score are broken by highest total; a genuine tie
/// between leaders means the session is not yet decided on score alone, but
/// `max_rounds` (if set) still ends it outright once reached.
pub fn is_session_over(config: &Config, totals: &[Points; liap_core::N], round_number: u64) -> bool {
    if config.max_rounds != 0 && round_number >= config.max_rounds {
        return true;
    }
    let max = totals.iter().copied().max().unwrap_or(0);
    if max < config.winning_score {
        return false;
    }
    totals.iter().filter(|&&t| t == max).count() == 1
}

use liap_core::Points;

/// The seven ranks carried over from the Chinese-chess piece set this game is played with.
/// Ordered weakest to strongest for the `Ord` derive below, which is used only to break
/// ties between pieces of the same rank/color pairing — cross-rank strength for play
/// comparison is decided by [`crate::play::Play`], not by this ordering directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter, serde::Serialize, serde::Deserialize)]
pub enum Rank {
    Soldier,
    Cannon,
    Horse,
    Chariot,
    Elephant,
    Advisor,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter, serde::Serialize, serde::Deserialize)]
pub enum Color {
    Red,
    Black,
}

/// A single physical piece. Copy because a piece is just two small enums plus an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Piece {
    id: u8,
    rank: Rank,
    color: Color,
    point: Points,
}

impl Piece {
    pub(crate) fn new(id: u8, rank: Rank, color: Color, point: Points) -> Self {
        Self { id, rank, color, point }
    }
    pub fn id(&self) -> u8 {
        self.id
    }
    pub fn rank(&self) -> Rank {
        self.rank
    }
    pub fn color(&self) -> Color {
        self.color
    }
    /// Point value used for scoring and for weak-hand detection. The canonical
    /// source of truth for every piece's point value is [`crate::deck::CANONICAL_DECK`];
    /// this accessor never recomputes it.
    pub fn point(&self) -> Points {
        self.point
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.color, self.rank, self.point)
    }
}

impl PartialOrd for Piece {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Piece {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.point.cmp(&other.point).then(self.rank.cmp(&other.rank))
    }
}

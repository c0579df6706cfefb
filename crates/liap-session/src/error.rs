use liap_core::Position;

/// Every error the wire protocol can report back to a client. Each variant
/// carries whatever fields the wire `error{code, message, details,
/// recoverable}` frame needs to build a useful message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("malformed client message: {0}")]
    InvalidMessageFormat(String),
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
    #[error("field {field} must be a {expected}")]
    InvalidFieldType { field: &'static str, expected: &'static str },
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("room {0} not found")]
    RoomNotFound(String),
    #[error("room is full")]
    RoomFull,
    #[error("a player with that name is already seated in this room")]
    AlreadyInRoom,

    #[error("game has not started yet")]
    GameNotStarted,
    #[error("action received for phase {expected}, but room is in phase {actual}")]
    OutOfPhase { expected: &'static str, actual: &'static str },
    #[error("it is not seat {0}'s turn")]
    NotYourTurn(Position),
    #[error(transparent)]
    InvalidPlay(#[from] liap_rules::IllegalPlay),
    #[error("declaration would make the total equal 8, which the last declarer may not choose")]
    InvalidDeclaration,
    #[error("seat {0} has already declared this round")]
    AlreadyDeclared(Position),
    #[error("one or more played pieces are not in seat {0}'s hand")]
    PiecesNotInHand(Position),
    #[error("play has {actual} pieces, expected {expected}")]
    PieceCountMismatch { expected: usize, actual: usize },

    #[error("too many actions from seat {0}, slow down")]
    RateLimited(Position),
    #[error("internal server error: {0}")]
    ServerError(String),
    #[error("client protocol version {client} does not match server {server}")]
    VersionMismatch { client: String, server: String },
}

impl GameError {
    /// Whether a client can retry after seeing this error, or whether the
    /// connection/room state itself needs to change first.
    pub fn recoverable(&self) -> bool {
        !matches!(
            self,
            GameError::RoomFull
                | GameError::RoomNotFound(_)
                | GameError::ServerError(_)
                | GameError::VersionMismatch { .. }
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidMessageFormat(_) => "INVALID_MESSAGE_FORMAT",
            GameError::MissingRequiredField(_) => "MISSING_REQUIRED_FIELD",
            GameError::InvalidFieldType { .. } => "INVALID_FIELD_TYPE",
            GameError::OutOfRange { .. } => "OUT_OF_RANGE",
            GameError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            GameError::RoomFull => "ROOM_FULL",
            GameError::AlreadyInRoom => "ALREADY_IN_ROOM",
            GameError::GameNotStarted => "GAME_NOT_STARTED",
            GameError::OutOfPhase { .. } => "OUT_OF_PHASE",
            GameError::NotYourTurn(_) => "NOT_YOUR_TURN",
            GameError::InvalidPlay(_) => "INVALID_PLAY",
            GameError::InvalidDeclaration => "INVALID_DECLARATION",
            GameError::AlreadyDeclared(_) => "ALREADY_DECLARED",
            GameError::PiecesNotInHand(_) => "PIECES_NOT_IN_HAND",
            GameError::PieceCountMismatch { .. } => "PIECE_COUNT_MISMATCH",
            GameError::RateLimited(_) => "RATE_LIMITED",
            GameError::ServerError(_) => "SERVER_ERROR",
            GameError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

impl From<liap_round::RoundError> for GameError {
    fn from(e: liap_round::RoundError) -> Self {
        match e {
            liap_round::RoundError::OutOfTurn { expected, .. } => GameError::NotYourTurn(expected),
            liap_round::RoundError::DeclarationsComplete => GameError::GameNotStarted,
            liap_round::RoundError::AlreadyDeclared(position) => GameError::AlreadyDeclared(position),
            liap_round::RoundError::SumEqualsEight => GameError::InvalidDeclaration,
            liap_round::RoundError::Illegal(illegal) => GameError::InvalidPlay(illegal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_full_is_not_recoverable() {
        assert!(!GameError::RoomFull.recoverable());
    }

    #[test]
    fn invalid_play_is_recoverable() {
        let err = GameError::InvalidPlay(liap_rules::IllegalPlay::LeaderCannotPass);
        assert!(err.recoverable());
        assert_eq!(err.code(), "INVALID_PLAY");
    }
}

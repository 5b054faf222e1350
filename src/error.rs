// Error taxonomy for game operations.

use thiserror::Error;
use uuid::Uuid;

use crate::engine::score::ScoreError;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("not this player's turn: expected {expected}, got {actual}")]
    NotPlayersTurn { expected: Uuid, actual: Uuid },

    #[error(transparent)]
    InvalidScore(#[from] ScoreError),

    #[error("storage error: {0}")]
    Storage(String),
}

impl GameError {
    pub fn game_not_found(game_id: Uuid) -> Self {
        GameError::NotFound(format!("game {game_id}"))
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        GameError::InvalidState(reason.into())
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::NotFound(_) => "not_found",
            GameError::InvalidState(_) => "invalid_state",
            GameError::NotPlayersTurn { .. } => "not_players_turn",
            GameError::InvalidScore(_) => "invalid_score",
            GameError::Storage(_) => "storage",
        }
    }
}

impl From<sqlx::Error> for GameError {
    fn from(e: sqlx::Error) -> Self {
        GameError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for GameError {
    fn from(e: serde_json::Error) -> Self {
        GameError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_errors_convert() {
        let err: GameError = ScoreError::BullTriple.into();
        assert_eq!(err.kind(), "invalid_score");
    }

    #[test]
    fn test_messages_name_the_players() {
        let expected = Uuid::new_v4();
        let actual = Uuid::new_v4();
        let msg = GameError::NotPlayersTurn { expected, actual }.to_string();
        assert!(msg.contains(&expected.to_string()));
        assert!(msg.contains(&actual.to_string()));
    }
}

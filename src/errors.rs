//! Error types for the round engine.
//!
//! Every failure the engine can report to a caller is synchronous and local:
//! nothing here is retried internally, and none of these leave a round
//! partially settled.

use crate::games::types::GameType;
use uuid::Uuid;

/// Errors returned by the engine's boundary operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Wager exceeds the player's balance. Rejected before any state mutation.
    #[error("insufficient funds for wager")]
    InsufficientFunds,

    /// Malformed or out-of-range bet parameters.
    #[error("invalid bet parameters: {0}")]
    InvalidParams(String),

    /// The action is not legal in the round's current phase.
    #[error("action '{action}' is not valid in phase '{phase}'")]
    InvalidTransition { phase: String, action: String },

    /// The entropy source failed. The bet is rejected, no draw occurs and the
    /// wager is never debited; a weaker source is never substituted.
    #[error("entropy source unavailable")]
    EntropyUnavailable,

    /// No round exists under this id.
    #[error("round {0} not found")]
    NotFound(Uuid),

    /// The player already has an in-progress round of this game type.
    #[error("a {game_type} round is already in progress for this player")]
    SlotOccupied { game_type: GameType },
}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::InvalidTransition {
            phase: "finished".to_string(),
            action: "hit".to_string(),
        };
        assert!(err.to_string().contains("finished"));
        assert!(err.to_string().contains("hit"));

        let err = EngineError::SlotOccupied {
            game_type: GameType::Blackjack,
        };
        assert!(err.to_string().contains("blackjack"));
    }
}

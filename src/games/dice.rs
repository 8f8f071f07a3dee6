//! Dice: a single threshold draw, settled immediately at placement.
//!
//! The player predicts a threshold in the open interval (2, 98) and wins iff
//! the roll in `[0, 100)` lands strictly above it. The payout numerator of 98
//! against the 100-wide roll range is the embedded 2% house edge.

use crate::config::DiceConfig;
use crate::errors::{EngineError, EngineResult};
use crate::games::types::{GameView, Outcome};
use crate::rng::RoundRng;

const ROLL_RANGE: f64 = 100.0;
const PAYOUT_NUMERATOR: f64 = 98.0;

/// Reject predictions outside the allowed open interval.
pub fn validate(prediction: f64, config: &DiceConfig) -> EngineResult<()> {
    if !prediction.is_finite()
        || prediction <= config.min_prediction
        || prediction >= config.max_prediction
    {
        return Err(EngineError::InvalidParams(format!(
            "dice prediction must lie strictly between {} and {}",
            config.min_prediction, config.max_prediction
        )));
    }
    Ok(())
}

/// Win multiplier for a given prediction: `98 / (100 - prediction)`.
pub fn win_multiplier(prediction: f64) -> f64 {
    PAYOUT_NUMERATOR / (ROLL_RANGE - prediction)
}

/// One roll, one settlement.
pub(crate) fn resolve(prediction: f64, rng: &RoundRng) -> (Outcome, f64, GameView) {
    let roll = rng.uniform() * ROLL_RANGE;
    let win = roll > prediction;
    let (outcome, multiplier) = if win {
        (Outcome::Win, win_multiplier(prediction))
    } else {
        (Outcome::Lose, 0.0)
    };
    let view = GameView::Dice {
        prediction,
        roll,
        win_multiplier: win_multiplier(prediction),
    };
    (outcome, multiplier, view)
}

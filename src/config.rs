//! Engine configuration with validation and defaults.
//!
//! Payout formulas themselves are fixed game rules and live with the games;
//! everything an operator might tune (limits, timers, allowed parameter
//! ranges) is collected here.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level engine configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub table_limits: TableLimits,
    pub blackjack: BlackjackConfig,
    pub dice: DiceConfig,
    pub crash: CrashConfig,
    pub mines: MinesConfig,
}

/// Wager bounds applied to every game.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableLimits {
    pub min_wager: u64,
    pub max_wager: u64,
}

impl Default for TableLimits {
    fn default() -> Self {
        Self {
            min_wager: 1,
            max_wager: 1_000_000,
        }
    }
}

/// Blackjack table rules and timers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlackjackConfig {
    /// Dealer draws until reaching this score.
    pub dealer_stand_score: u8,
    /// Interval between dealer auto-draw ticks.
    pub dealer_tick_ms: u64,
    /// Idle time in `PlayerTurn` before the hand is force-stood, so an
    /// abandoned hand still resolves deterministically.
    pub player_turn_timeout_ms: u64,
}

impl Default for BlackjackConfig {
    fn default() -> Self {
        Self {
            dealer_stand_score: 17,
            dealer_tick_ms: 1_000,
            player_turn_timeout_ms: 60_000,
        }
    }
}

/// Dice threshold bounds. The payout numerator 98 (vs. the roll range of 100)
/// embeds the 2% house edge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiceConfig {
    pub min_prediction: f64,
    pub max_prediction: f64,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            min_prediction: 2.0,
            max_prediction: 98.0,
        }
    }
}

/// Crash curve tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrashConfig {
    /// Betting window before the curve starts.
    pub betting_countdown_ms: u64,
    /// Exponential growth rate of the multiplier, per second of running time.
    pub growth_rate_per_sec: f64,
    /// Numerator of the crash-point formula `max(1.0, factor / (1 - u))`;
    /// 0.99 yields the 1% instant-crash mass.
    pub house_factor: f64,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            betting_countdown_ms: 5_000,
            growth_rate_per_sec: 0.06,
            house_factor: 0.99,
        }
    }
}

/// Mines grid rules.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MinesConfig {
    pub min_mines: u8,
    pub max_mines: u8,
}

impl Default for MinesConfig {
    fn default() -> Self {
        Self {
            min_mines: 1,
            // 24 leaves exactly one safe cell on the 25-cell grid.
            max_mines: 24,
        }
    }
}

impl EngineConfig {
    /// Preset with every timer shortened for tests and simulation.
    pub fn fast_resolution() -> Self {
        Self {
            blackjack: BlackjackConfig {
                dealer_tick_ms: 1,
                player_turn_timeout_ms: 50,
                ..Default::default()
            },
            crash: CrashConfig {
                betting_countdown_ms: 10,
                growth_rate_per_sec: 5.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate logical consistency before the engine starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.table_limits.min_wager == 0 {
            return Err(ConfigError::InvalidValue(
                "min_wager must be > 0".to_string(),
            ));
        }
        if self.table_limits.max_wager < self.table_limits.min_wager {
            return Err(ConfigError::InvalidValue(
                "max_wager must be >= min_wager".to_string(),
            ));
        }
        if self.blackjack.dealer_stand_score < 12 || self.blackjack.dealer_stand_score > 21 {
            return Err(ConfigError::InvalidValue(
                "dealer_stand_score must be within 12..=21".to_string(),
            ));
        }
        if self.dice.min_prediction < 0.0 || self.dice.max_prediction > 100.0 {
            return Err(ConfigError::InvalidValue(
                "dice prediction bounds must lie within the 0..100 roll range".to_string(),
            ));
        }
        if self.dice.min_prediction >= self.dice.max_prediction {
            return Err(ConfigError::InvalidValue(
                "dice min_prediction must be below max_prediction".to_string(),
            ));
        }
        if self.crash.growth_rate_per_sec <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "crash growth_rate_per_sec must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.crash.house_factor) {
            return Err(ConfigError::InvalidValue(
                "crash house_factor must lie within 0..=1".to_string(),
            ));
        }
        if self.mines.min_mines == 0 {
            return Err(ConfigError::InvalidValue(
                "min_mines must be > 0".to_string(),
            ));
        }
        if self.mines.max_mines >= crate::games::mines::GRID_CELLS as u8 {
            return Err(ConfigError::InvalidValue(
                "max_mines must leave at least one safe cell".to_string(),
            ));
        }
        if self.mines.min_mines > self.mines.max_mines {
            return Err(ConfigError::InvalidValue(
                "min_mines must be <= max_mines".to_string(),
            ));
        }
        Ok(())
    }

    pub fn dealer_tick(&self) -> Duration {
        Duration::from_millis(self.blackjack.dealer_tick_ms)
    }

    pub fn player_turn_timeout(&self) -> Duration {
        Duration::from_millis(self.blackjack.player_turn_timeout_ms)
    }

    pub fn betting_countdown(&self) -> Duration {
        Duration::from_millis(self.crash.betting_countdown_ms)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

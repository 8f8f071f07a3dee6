use crate::games::blackjack::Card;
use crate::games::roulette::WheelColor;
use crate::games::slots::ReelSymbol;
use crate::ledger::PlayerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Supported game types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Blackjack,
    Dice,
    Slots,
    Roulette,
    Crash,
    Mines,
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Blackjack => write!(f, "blackjack"),
            GameType::Dice => write!(f, "dice"),
            GameType::Slots => write!(f, "slots"),
            GameType::Roulette => write!(f, "roulette"),
            GameType::Crash => write!(f, "crash"),
            GameType::Mines => write!(f, "mines"),
        }
    }
}

/// Game-specific bet parameters supplied at placement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum BetParams {
    Blackjack,
    Dice { prediction: f64 },
    Slots,
    Roulette { color: WheelColor },
    Crash,
    Mines { mine_count: u8 },
}

impl BetParams {
    /// The game these parameters belong to.
    pub fn game_type(&self) -> GameType {
        match self {
            BetParams::Blackjack => GameType::Blackjack,
            BetParams::Dice { .. } => GameType::Dice,
            BetParams::Slots => GameType::Slots,
            BetParams::Roulette { .. } => GameType::Roulette,
            BetParams::Crash => GameType::Crash,
            BetParams::Mines { .. } => GameType::Mines,
        }
    }
}

/// Player actions against an in-progress round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Hit,
    Stand,
    CashOut,
    RevealCell { cell: u8 },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Hit => write!(f, "hit"),
            Action::Stand => write!(f, "stand"),
            Action::CashOut => write!(f, "cash_out"),
            Action::RevealCell { cell } => write!(f, "reveal_cell({})", cell),
        }
    }
}

/// Terminal result of a round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    /// Wager returned, no profit (Blackjack tie).
    Push,
    Lose,
}

/// Public projection of a round's game state.
///
/// Only information the player is allowed to see at the current phase appears
/// here; `GetRoundState` never leaks the dealer's hole card, unrevealed mine
/// positions or an undrawn crash point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum GameView {
    Blackjack {
        player_cards: Vec<Card>,
        player_score: u8,
        /// Upcard only while the hole card is hidden.
        dealer_cards: Vec<Card>,
        dealer_score: Option<u8>,
        hole_card_hidden: bool,
        /// Two-card 21 on the deal. Recorded for display; pays even 2x like
        /// any other win here, not the traditional 3:2.
        natural: bool,
    },
    Dice {
        prediction: f64,
        roll: f64,
        win_multiplier: f64,
    },
    Slots {
        reels: [ReelSymbol; 3],
        multiplier: f64,
    },
    Roulette {
        bet_color: WheelColor,
        winning_color: WheelColor,
        winning_slot: u8,
    },
    Crash {
        current_multiplier: Option<f64>,
        /// Revealed only after the curve has crashed.
        crash_point: Option<f64>,
        cashed_out_at: Option<f64>,
    },
    Mines {
        mine_count: u8,
        revealed: Vec<u8>,
        /// Mine positions, shown only once the round is terminal.
        mines: Option<Vec<u8>>,
        multiplier: f64,
    },
}

/// Snapshot of a round as returned by `act` and `round_state`.
#[derive(Debug, Clone, Serialize)]
pub struct RoundSnapshot {
    pub round_id: Uuid,
    pub player_id: PlayerId,
    pub game_type: GameType,
    pub phase: String,
    pub wager: u64,
    pub outcome: Option<Outcome>,
    pub payout: u64,
    pub multiplier: Option<f64>,
    /// sha256 commitment to the round seed, fixed before the wager.
    pub commitment: String,
    /// Hex seed, present only once the round (for Crash: the whole cycle) is
    /// terminal so the draw stream can be replayed.
    pub revealed_seed: Option<String>,
    pub view: GameView,
}

impl RoundSnapshot {
    /// True once no further action is accepted and the payout is fixed.
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_type_display_matches_serde() {
        for (game, name) in [
            (GameType::Blackjack, "blackjack"),
            (GameType::Dice, "dice"),
            (GameType::Slots, "slots"),
            (GameType::Roulette, "roulette"),
            (GameType::Crash, "crash"),
            (GameType::Mines, "mines"),
        ] {
            assert_eq!(game.to_string(), name);
            assert_eq!(serde_json::to_string(&game).unwrap(), format!("\"{}\"", name));
        }
    }

    #[test]
    fn test_bet_params_game_type() {
        assert_eq!(
            BetParams::Dice { prediction: 50.0 }.game_type(),
            GameType::Dice
        );
        assert_eq!(
            BetParams::Mines { mine_count: 3 }.game_type(),
            GameType::Mines
        );
    }

    #[test]
    fn test_action_round_trips_through_json() {
        let action = Action::RevealCell { cell: 12 };
        let json = serde_json::to_string(&action).unwrap();
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }
}

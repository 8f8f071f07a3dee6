//! Slots: three independent reel draws, settled immediately at placement.
//!
//! Reels share no deck; each draw is an independent uniform pick over the
//! four symbols. Only a triple match pays, at the symbol's multiplier.

use crate::games::types::{GameView, Outcome};
use crate::rng::RoundRng;
use serde::{Deserialize, Serialize};

/// Reel symbols with their triple-match multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReelSymbol {
    Seven,
    Diamond,
    Cherry,
    Lemon,
}

const SYMBOLS: [ReelSymbol; 4] = [
    ReelSymbol::Seven,
    ReelSymbol::Diamond,
    ReelSymbol::Cherry,
    ReelSymbol::Lemon,
];

impl ReelSymbol {
    pub fn multiplier(&self) -> f64 {
        match self {
            ReelSymbol::Seven => 50.0,
            ReelSymbol::Diamond => 25.0,
            ReelSymbol::Cherry => 10.0,
            ReelSymbol::Lemon => 5.0,
        }
    }
}

/// One spin, one settlement.
pub(crate) fn spin(rng: &RoundRng) -> (Outcome, f64, GameView) {
    let mut reels = [ReelSymbol::Seven; 3];
    for reel in reels.iter_mut() {
        *reel = SYMBOLS[rng.int_range(0, SYMBOLS.len() as u64 - 1) as usize];
    }

    let (outcome, multiplier) = if reels[0] == reels[1] && reels[1] == reels[2] {
        (Outcome::Win, reels[0].multiplier())
    } else {
        (Outcome::Lose, 0.0)
    };
    let view = GameView::Slots {
        reels,
        multiplier,
    };
    (outcome, multiplier, view)
}

//! Roulette: a color bet against the European wheel, settled immediately.
//!
//! The winning color is drawn first with the wheel's true slot weights
//! (1/37 green, 18/37 red, 18/37 black); a numeric slot of that color is then
//! picked uniformly as the cosmetic result. The slot number never affects the
//! payout.

use crate::games::types::{GameView, Outcome};
use crate::rng::RoundRng;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Wheel colors. Green is slot 0 only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WheelColor {
    Red,
    Black,
    Green,
}

const WHEEL_SLOTS: u8 = 37;
const GREEN_MULTIPLIER: f64 = 14.0;
const RED_BLACK_MULTIPLIER: f64 = 2.0;

/// Red numbers of the standard European layout.
const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

static BLACK_NUMBERS: Lazy<Vec<u8>> = Lazy::new(|| {
    (1..WHEEL_SLOTS)
        .filter(|n| !RED_NUMBERS.contains(n))
        .collect()
});

/// Color of a wheel slot per the standard European color table.
pub fn color_of(slot: u8) -> WheelColor {
    if slot == 0 {
        WheelColor::Green
    } else if RED_NUMBERS.contains(&slot) {
        WheelColor::Red
    } else {
        WheelColor::Black
    }
}

/// One spin, one settlement.
pub(crate) fn spin(bet_color: WheelColor, rng: &RoundRng) -> (Outcome, f64, GameView) {
    // Draw the color with true wheel weights, then a cosmetic slot of it.
    let u = rng.uniform();
    let winning_color = if u < 1.0 / WHEEL_SLOTS as f64 {
        WheelColor::Green
    } else if u < 19.0 / WHEEL_SLOTS as f64 {
        WheelColor::Red
    } else {
        WheelColor::Black
    };

    let winning_slot = match winning_color {
        WheelColor::Green => 0,
        WheelColor::Red => {
            RED_NUMBERS[rng.int_range(0, RED_NUMBERS.len() as u64 - 1) as usize]
        }
        WheelColor::Black => {
            BLACK_NUMBERS[rng.int_range(0, BLACK_NUMBERS.len() as u64 - 1) as usize]
        }
    };

    let (outcome, multiplier) = if bet_color == winning_color {
        let multiplier = match winning_color {
            WheelColor::Green => GREEN_MULTIPLIER,
            WheelColor::Red | WheelColor::Black => RED_BLACK_MULTIPLIER,
        };
        (Outcome::Win, multiplier)
    } else {
        (Outcome::Lose, 0.0)
    };

    let view = GameView::Roulette {
        bet_color,
        winning_color,
        winning_slot,
    };
    (outcome, multiplier, view)
}

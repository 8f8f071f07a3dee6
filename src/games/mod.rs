//! The six game variants and the vocabulary shared between them.

pub mod blackjack;
pub mod crash;
pub mod dice;
pub mod mines;
pub mod roulette;
pub mod slots;
pub mod types;

use crate::errors::EngineResult;
use crate::games::types::{Action, GameView, Outcome};
use crate::rng::RoundRng;
use crate::scheduler::TimerEvent;
use std::time::Duration;

/// What a transition produced.
pub(crate) enum Advance {
    /// The round stays in progress; optionally arm a timer.
    Continue {
        arm: Option<(TimerEvent, Duration)>,
    },
    /// The round reached a terminal state; the engine settles
    /// `wager x multiplier` exactly once.
    Settle { outcome: Outcome, multiplier: f64 },
}

/// A game with intermediate phases (Blackjack, Mines). Single-draw games
/// settle inline at placement and never implement this.
///
/// Implementations only mutate their own state; debits, credits, events and
/// timer arming all stay with the engine, which drives this trait under the
/// round's lock.
pub(crate) trait GameState: Send {
    /// Phase label for snapshots and `InvalidTransition` messages.
    fn phase_name(&self) -> &'static str;

    /// Apply a player action in the current phase.
    fn apply(&mut self, action: &Action, rng: &RoundRng) -> EngineResult<Advance>;

    /// Apply a scheduled transition. `None` means the fire is stale for the
    /// current phase and must be ignored.
    fn on_timer(&mut self, event: TimerEvent, rng: &RoundRng) -> Option<Advance>;

    /// Public projection of the round; hidden information (dealer hole card,
    /// unrevealed mines) stays hidden until the phase that exposes it.
    fn view(&self) -> GameView;
}

//! Crash: one shared curve, many independent wagers against it.
//!
//! The cycle runs `Betting(countdown) -> Running -> Crashed`. The crash point
//! is drawn from the cycle's committed seed at the moment betting closes and
//! stays hidden until the curve crashes. While running, the multiplier grows
//! as a deterministic exponential of elapsed time; a cash-out locks in the
//! multiplier at the moment of the call.
//!
//! Linearizability lives in the engine: every cash-out and the crash
//! transition itself contend on the cycle's mutex, so there is no window in
//! which a cash-out succeeds against an already-crashed curve.

use crate::fairness::RoundSeed;
use crate::ledger::PlayerId;
use crate::rng::RoundRng;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Crash point for a uniform draw `u` in `[0, 1)`:
/// `max(1.00, factor / (1 - u))`.
///
/// With factor 0.99 the clamp captures every `u` below ~1%, which is exactly
/// the instant-crash mass; the tail is unbounded as `u -> 1`.
pub fn crash_point(house_factor: f64, u: f64) -> f64 {
    (house_factor / (1.0 - u)).max(1.0)
}

/// Multiplier after `elapsed` running time: `e^(rate * t)`.
pub fn multiplier_at(growth_rate: f64, elapsed: Duration) -> f64 {
    (growth_rate * elapsed.as_secs_f64()).exp()
}

/// Running time needed to reach a multiplier, the inverse of
/// [`multiplier_at`]. An instant crash (point 1.0) maps to zero.
pub fn time_to_reach(growth_rate: f64, multiplier: f64) -> Duration {
    Duration::from_secs_f64(multiplier.max(1.0).ln() / growth_rate)
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum CrashPhase {
    Betting,
    Running { since: Instant, crash_point: f64 },
    Crashed { crash_point: f64 },
}

/// One player's wager against a cycle.
pub(crate) struct CrashTicket {
    pub player_id: PlayerId,
    pub wager: u64,
    pub cashed_out_at: Option<f64>,
}

/// One betting-running-crashed cycle of the shared table.
///
/// All mutation happens under the engine's cycle mutex; tickets keyed by the
/// owning round id.
pub(crate) struct CrashCycle {
    pub id: Uuid,
    pub phase: CrashPhase,
    pub seed: RoundSeed,
    pub rng: RoundRng,
    pub commitment: String,
    pub tickets: HashMap<Uuid, CrashTicket>,
}

impl CrashCycle {
    pub(crate) fn new(seed: RoundSeed) -> Self {
        let rng = seed.stream();
        let commitment = seed.commitment();
        Self {
            id: Uuid::new_v4(),
            phase: CrashPhase::Betting,
            seed,
            rng,
            commitment,
            tickets: HashMap::new(),
        }
    }

    pub(crate) fn phase_name(&self) -> &'static str {
        match self.phase {
            CrashPhase::Betting => "betting",
            CrashPhase::Running { .. } => "running",
            CrashPhase::Crashed { .. } => "crashed",
        }
    }

    /// Close betting and start the curve; the crash point comes from the
    /// committed seed's stream.
    pub(crate) fn start_running(&mut self, house_factor: f64) -> f64 {
        let point = crash_point(house_factor, self.rng.uniform());
        self.phase = CrashPhase::Running {
            since: Instant::now(),
            crash_point: point,
        };
        point
    }
}

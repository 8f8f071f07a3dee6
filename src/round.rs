//! Round bookkeeping shared by every game variant.
//!
//! The generic shape is `Created -> {in-progress phases} -> Terminal`. The
//! concrete phases and transition tables live with each game; what lives here
//! is the part that must be identical everywhere: wager/payout accounting and
//! the settle-exactly-once guarantee.

use crate::games::types::{GameType, Outcome};
use crate::ledger::PlayerId;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Per-round bookkeeping. Owned by the engine, mutated only under the round's
/// lock.
///
/// Invariants:
/// - the wager is debited exactly once, before any outcome draw;
/// - `settle` fixes outcome and payout exactly once; repeats are no-ops;
/// - a terminal round accepts no further transitions.
pub struct RoundCore {
    pub id: Uuid,
    pub player_id: PlayerId,
    pub game_type: GameType,
    pub wager: u64,
    pub created_at: u64,
    /// sha256 commitment to the round's seed, fixed before the debit.
    pub commitment: String,
    pub outcome: Option<Outcome>,
    pub payout: u64,
    pub multiplier: Option<f64>,
    settled: bool,
}

impl RoundCore {
    pub fn new(player_id: &str, game_type: GameType, wager: u64, commitment: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id: player_id.to_string(),
            game_type,
            wager,
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            commitment,
            outcome: None,
            payout: 0,
            multiplier: None,
            settled: false,
        }
    }

    /// A terminal round is immutable; no further debit or credit may
    /// reference it.
    pub fn is_terminal(&self) -> bool {
        self.settled
    }

    /// Fix outcome and payout. Returns true on the first call only; the
    /// engine credits and emits iff this returns true.
    pub fn settle(&mut self, outcome: Outcome, payout: u64, multiplier: Option<f64>) -> bool {
        if self.settled {
            return false;
        }
        self.settled = true;
        self.outcome = Some(outcome);
        self.payout = payout;
        self.multiplier = multiplier;
        true
    }
}

//! Terminal round outcome events.
//!
//! Every settlement emits exactly one [`RoundOutcome`] to the configured
//! sink. Sinks are fire-and-forget: a slow or absent consumer must never
//! block or fail a settlement.

use crate::games::types::{GameType, Outcome};
use crate::ledger::PlayerId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// The exact shape forwarded to leaderboard/feed collaborators on every
/// terminal transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round_id: Uuid,
    pub player_id: PlayerId,
    pub game_type: GameType,
    pub wager: u64,
    pub payout: u64,
    pub is_win: bool,
    /// Payout-to-wager ratio; absent on losses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
}

impl RoundOutcome {
    pub(crate) fn new(
        round_id: Uuid,
        player_id: &str,
        game_type: GameType,
        wager: u64,
        payout: u64,
        outcome: Outcome,
        multiplier: Option<f64>,
    ) -> Self {
        Self {
            round_id,
            player_id: player_id.to_string(),
            game_type,
            wager,
            payout,
            is_win: outcome == Outcome::Win,
            multiplier,
        }
    }
}

/// Receiver of terminal round outcomes.
pub trait EventSink: Send + Sync {
    fn round_settled(&self, outcome: &RoundOutcome);
}

/// Broadcast-backed sink: any number of subscribers, none of them load-bearing.
pub struct BroadcastSink {
    sender: broadcast::Sender<RoundOutcome>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundOutcome> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn round_settled(&self, outcome: &RoundOutcome) {
        // Err means no live subscribers, which is fine.
        let _ = self.sender.send(outcome.clone());
    }
}

/// Sink that drops everything. Used in tests and the simulator.
pub struct NullSink;

impl EventSink for NullSink {
    fn round_settled(&self, _outcome: &RoundOutcome) {}
}

//! Timer abstraction driving every engine-initiated transition.
//!
//! The games never sleep or spawn on their own: a state machine that needs
//! time arms a [`TimerFire`] through the [`Scheduler`] and the engine applies
//! the transition when it lands. Tests swap in [`ManualScheduler`] and fire
//! deterministically; production uses [`TokioScheduler`].
//!
//! A fire that arrives after the round moved on (player stood before the
//! turn timeout, cash-out before the crash instant) is ignored by the
//! engine, never an error.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// The engine-initiated transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    /// Crash: betting window closes, the curve starts running.
    BettingCountdown,
    /// Crash: the curve reaches the drawn crash point.
    CrashInstant,
    /// Blackjack: dealer draws one card.
    DealerTick,
    /// Blackjack: idle hand is force-stood.
    PlayerTurnTimeout,
}

/// A scheduled transition, routed by round (or crash-cycle) id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerFire {
    pub round_id: Uuid,
    pub event: TimerEvent,
}

/// Arms timers on behalf of the engine.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, fire: TimerFire, delay: Duration);
}

/// Production scheduler: each armed timer is a spawned sleep that forwards
/// the fire into a channel drained by the engine's timer driver.
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<TimerFire>,
}

impl TokioScheduler {
    /// Returns the scheduler and the receiver the engine driver drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerFire>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, fire: TimerFire, delay: Duration) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Err means the engine driver shut down; nothing left to drive.
            let _ = tx.send(fire);
        });
    }
}

/// Test scheduler: records what was armed, fires nothing on its own.
pub struct ManualScheduler {
    pending: Mutex<VecDeque<(TimerFire, Duration)>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Pop the oldest armed timer, if any.
    pub fn pop(&self) -> Option<(TimerFire, Duration)> {
        self.pending.lock().expect("scheduler lock poisoned").pop_front()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("scheduler lock poisoned").len()
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, fire: TimerFire, delay: Duration) {
        self.pending
            .lock()
            .expect("scheduler lock poisoned")
            .push_back((fire, delay));
    }
}

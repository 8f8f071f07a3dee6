//! Croupier - Casino Game Round Engine
//!
//! Per-game state machines that accept a wager, advance through well-defined
//! phases, draw committed randomness, and settle atomically against a player
//! balance. Six variants ship: Blackjack, Dice, Slots, Roulette, Crash and
//! Mines.
//!
//! The engine is transport-agnostic: rendering, wallets and persistence are
//! external collaborators. Callers provide a [`BalanceStore`], an
//! [`EventSink`] and a [`Scheduler`]; everything else is owned here.
//!
//! ```no_run
//! use croupier::{
//!     BalanceStore, BetParams, BroadcastSink, CasinoEngine, EngineConfig, EventSink,
//!     InMemoryLedger, OsEntropy,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let ledger = Arc::new(InMemoryLedger::new());
//! ledger.deposit("alice", 1_000);
//!
//! let engine = CasinoEngine::with_tokio_scheduler(
//!     EngineConfig::default(),
//!     Arc::new(OsEntropy),
//!     Arc::clone(&ledger) as Arc<dyn BalanceStore>,
//!     Arc::new(BroadcastSink::new(256)) as Arc<dyn EventSink>,
//! )
//! .expect("valid config");
//!
//! let round_id = engine
//!     .place_bet("alice", BetParams::Dice { prediction: 50.0 }, 100)
//!     .expect("bet accepted");
//! let snapshot = engine.round_state(round_id).expect("round exists");
//! println!("payout: {}", snapshot.payout);
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod fairness;
pub mod games;
pub mod ledger;
pub mod rng;
pub mod round;
pub mod scheduler;

pub use config::{ConfigError, EngineConfig};
pub use engine::CasinoEngine;
pub use errors::{EngineError, EngineResult};
pub use events::{BroadcastSink, EventSink, NullSink, RoundOutcome};
pub use fairness::{verify_reveal, RoundSeed};
pub use games::blackjack::{hand_score, Card, Rank, Suit};
pub use games::roulette::WheelColor;
pub use games::slots::ReelSymbol;
pub use games::types::{Action, BetParams, GameType, GameView, Outcome, RoundSnapshot};
pub use ledger::{BalanceStore, InMemoryLedger, PlayerId};
pub use rng::{EntropySource, OsEntropy, RoundRng, SeededEntropy};
pub use scheduler::{ManualScheduler, Scheduler, TimerEvent, TimerFire, TokioScheduler};

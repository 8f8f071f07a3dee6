//! The engine boundary: place bets, act on rounds, snapshot state.
//!
//! Goals:
//! - A wager is debited exactly once, before any outcome draw; the payout is
//!   credited exactly once, at the terminal transition.
//! - Per-round transitions are serialized by the round's own mutex; rounds of
//!   different players never contend.
//! - Crash cash-outs and the crash transition contend on one cycle mutex, so
//!   a cash-out at or after the crash instant can never be accepted.
//! - Timer fires that arrive after a round moved on are ignored, not errors.

use crate::config::{ConfigError, EngineConfig};
use crate::errors::{EngineError, EngineResult};
use crate::events::{EventSink, RoundOutcome};
use crate::fairness::RoundSeed;
use crate::games::blackjack::BlackjackRound;
use crate::games::crash::{multiplier_at, time_to_reach, CrashCycle, CrashPhase, CrashTicket};
use crate::games::mines::MinesRound;
use crate::games::types::{Action, BetParams, GameType, GameView, Outcome, RoundSnapshot};
use crate::games::{dice, roulette, slots, Advance, GameState};
use crate::ledger::{BalanceStore, PlayerId};
use crate::rng::{EntropySource, RoundRng};
use crate::round::RoundCore;
use crate::scheduler::{Scheduler, TimerEvent, TimerFire, TokioScheduler};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

enum RoundKind {
    /// Settled at placement; the view is final.
    Immediate(GameView),
    /// Multi-phase game driven by actions and timers.
    Stateful(Box<dyn GameState>),
    /// Wager against the shared crash cycle; authoritative state lives there.
    CrashTicket { cycle: Arc<Mutex<CrashCycle>> },
}

struct ActiveRound {
    core: RoundCore,
    seed: RoundSeed,
    rng: RoundRng,
    kind: RoundKind,
}

/// The round engine. All methods are synchronous; timed transitions arrive
/// through [`CasinoEngine::fire_timer`], driven by the configured scheduler.
pub struct CasinoEngine {
    config: EngineConfig,
    entropy: Arc<dyn EntropySource>,
    ledger: Arc<dyn BalanceStore>,
    events: Arc<dyn EventSink>,
    scheduler: Arc<dyn Scheduler>,
    rounds: DashMap<Uuid, Arc<Mutex<ActiveRound>>>,
    /// One in-progress round per (player, game) slot.
    slots_in_use: DashMap<(PlayerId, GameType), Uuid>,
    /// The crash cycle currently accepting bets or running, if any.
    crash_cycle: Mutex<Option<Arc<Mutex<CrashCycle>>>>,
    /// Live crash cycles by id, for timer routing.
    cycles: DashMap<Uuid, Arc<Mutex<CrashCycle>>>,
}

impl CasinoEngine {
    pub fn new(
        config: EngineConfig,
        entropy: Arc<dyn EntropySource>,
        ledger: Arc<dyn BalanceStore>,
        events: Arc<dyn EventSink>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        Ok(Arc::new(Self {
            config,
            entropy,
            ledger,
            events,
            scheduler,
            rounds: DashMap::new(),
            slots_in_use: DashMap::new(),
            crash_cycle: Mutex::new(None),
            cycles: DashMap::new(),
        }))
    }

    /// Engine wired to the production scheduler, with the timer driver
    /// already running. Must be called within a tokio runtime.
    pub fn with_tokio_scheduler(
        config: EngineConfig,
        entropy: Arc<dyn EntropySource>,
        ledger: Arc<dyn BalanceStore>,
        events: Arc<dyn EventSink>,
    ) -> Result<Arc<Self>, ConfigError> {
        let (scheduler, rx) = TokioScheduler::new();
        let engine = Self::new(config, entropy, ledger, events, Arc::new(scheduler))?;
        engine.spawn_timer_driver(rx);
        Ok(engine)
    }

    /// Drain scheduler fires into the engine.
    pub fn spawn_timer_driver(
        self: &Arc<Self>,
        mut rx: mpsc::UnboundedReceiver<TimerFire>,
    ) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(fire) = rx.recv().await {
                engine.fire_timer(fire);
            }
        })
    }

    /// Accept a wager and create a round.
    ///
    /// Single-draw games (Dice, Slots, Roulette) settle before this returns;
    /// the round stays queryable through [`CasinoEngine::round_state`].
    pub fn place_bet(
        &self,
        player_id: &str,
        params: BetParams,
        wager: u64,
    ) -> EngineResult<Uuid> {
        let limits = &self.config.table_limits;
        if wager < limits.min_wager || wager > limits.max_wager {
            return Err(EngineError::InvalidParams(format!(
                "wager must lie within {}..={} chips",
                limits.min_wager, limits.max_wager
            )));
        }

        match params {
            BetParams::Dice { prediction } => {
                dice::validate(prediction, &self.config.dice)?;
                self.place_immediate(player_id, GameType::Dice, wager, |rng| {
                    dice::resolve(prediction, rng)
                })
            }
            BetParams::Slots => {
                self.place_immediate(player_id, GameType::Slots, wager, slots::spin)
            }
            BetParams::Roulette { color } => {
                self.place_immediate(player_id, GameType::Roulette, wager, move |rng| {
                    roulette::spin(color, rng)
                })
            }
            BetParams::Blackjack => {
                let config = self.config.blackjack.clone();
                let timeout = self.config.player_turn_timeout();
                self.place_stateful(
                    player_id,
                    GameType::Blackjack,
                    wager,
                    move |rng| Box::new(BlackjackRound::new(rng, &config)) as Box<dyn GameState>,
                    Some((TimerEvent::PlayerTurnTimeout, timeout)),
                )
            }
            BetParams::Mines { mine_count } => {
                crate::games::mines::validate(mine_count, &self.config.mines)?;
                self.place_stateful(
                    player_id,
                    GameType::Mines,
                    wager,
                    move |rng| Box::new(MinesRound::new(rng, mine_count)) as Box<dyn GameState>,
                    None,
                )
            }
            BetParams::Crash => self.place_crash_bet(player_id, wager),
        }
    }

    /// Apply a player action to an in-progress round.
    pub fn act(&self, round_id: Uuid, action: Action) -> EngineResult<RoundSnapshot> {
        let entry = self
            .rounds
            .get(&round_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or(EngineError::NotFound(round_id))?;

        // Crash tickets route through the shared cycle; the round lock is
        // released before the cycle lock is taken.
        let cycle = {
            let guard = entry.lock().expect("round lock poisoned");
            match &guard.kind {
                RoundKind::CrashTicket { cycle } => Some(Arc::clone(cycle)),
                _ => None,
            }
        };
        if let Some(cycle) = cycle {
            return self.crash_act(&entry, &cycle, round_id, action);
        }

        let mut guard = entry.lock().expect("round lock poisoned");
        if guard.core.is_terminal() {
            return Err(EngineError::InvalidTransition {
                phase: phase_of(&guard),
                action: action.to_string(),
            });
        }
        let advance = {
            let ActiveRound { kind, rng, .. } = &mut *guard;
            match kind {
                RoundKind::Stateful(state) => state.apply(&action, rng)?,
                // Immediate rounds are terminal from creation; crash tickets
                // were routed above.
                _ => {
                    return Err(EngineError::InvalidTransition {
                        phase: "settled".to_string(),
                        action: action.to_string(),
                    })
                }
            }
        };
        self.apply_advance(&mut guard, round_id, advance);
        Ok(self.snapshot_plain(&guard))
    }

    /// Phase and visible public state of a round. Hidden information (dealer
    /// hole card, mine positions, an undrawn crash point) stays hidden.
    pub fn round_state(&self, round_id: Uuid) -> EngineResult<RoundSnapshot> {
        let entry = self
            .rounds
            .get(&round_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or(EngineError::NotFound(round_id))?;

        let cycle = {
            let guard = entry.lock().expect("round lock poisoned");
            match &guard.kind {
                RoundKind::CrashTicket { cycle } => Some(Arc::clone(cycle)),
                _ => None,
            }
        };
        match cycle {
            Some(cycle_arc) => {
                let cycle = cycle_arc.lock().expect("crash cycle lock poisoned");
                let guard = entry.lock().expect("round lock poisoned");
                Ok(self.snapshot_crash(&guard, &cycle))
            }
            None => {
                let guard = entry.lock().expect("round lock poisoned");
                Ok(self.snapshot_plain(&guard))
            }
        }
    }

    /// Apply a scheduled transition. Late and duplicate fires are ignored.
    pub fn fire_timer(&self, fire: TimerFire) {
        // Bind before branching so the map guard is dropped before any lock
        // is taken.
        let cycle = self.cycles.get(&fire.round_id).map(|e| Arc::clone(e.value()));
        if let Some(cycle) = cycle {
            self.crash_timer(&cycle, fire.event);
            return;
        }
        let Some(entry) = self.rounds.get(&fire.round_id).map(|e| Arc::clone(e.value())) else {
            tracing::warn!(round = %fire.round_id, event = ?fire.event, "timer for unknown round ignored");
            return;
        };
        let mut guard = entry.lock().expect("round lock poisoned");
        if guard.core.is_terminal() {
            return;
        }
        let advance = {
            let ActiveRound { kind, rng, .. } = &mut *guard;
            match kind {
                RoundKind::Stateful(state) => state.on_timer(fire.event, rng),
                _ => None,
            }
        };
        match advance {
            Some(advance) => self.apply_advance(&mut guard, fire.round_id, advance),
            None => {
                tracing::debug!(round = %fire.round_id, event = ?fire.event, "stale timer ignored")
            }
        }
    }

    /// Drop settled rounds, returning how many were removed. Outcome history
    /// belongs to the event sink's consumers, not the engine.
    pub fn prune_settled(&self) -> usize {
        let before = self.rounds.len();
        self.rounds.retain(|_, round| {
            round
                .lock()
                .map(|guard| !guard.core.is_terminal())
                .unwrap_or(false)
        });
        before - self.rounds.len()
    }

    pub fn active_round_count(&self) -> usize {
        self.rounds
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .lock()
                    .map(|guard| !guard.core.is_terminal())
                    .unwrap_or(false)
            })
            .count()
    }

    // ---- internals ----

    fn place_immediate(
        &self,
        player_id: &str,
        game_type: GameType,
        wager: u64,
        resolve: impl FnOnce(&RoundRng) -> (Outcome, f64, GameView),
    ) -> EngineResult<Uuid> {
        let seed = RoundSeed::generate(self.entropy.as_ref())?;
        let core = RoundCore::new(player_id, game_type, wager, seed.commitment());
        let round_id = core.id;

        self.reserve_slot(player_id, game_type, round_id)?;
        if let Err(e) = self.ledger.debit(player_id, wager) {
            self.release_slot(player_id, game_type);
            return Err(e);
        }
        tracing::debug!(round = %round_id, game = %game_type, wager, "wager debited");

        let rng = seed.stream();
        let (outcome, multiplier, view) = resolve(&rng);
        let mut round = ActiveRound {
            core,
            seed,
            rng,
            kind: RoundKind::Immediate(view),
        };
        self.settle_round(&mut round, outcome, multiplier);
        self.rounds.insert(round_id, Arc::new(Mutex::new(round)));
        Ok(round_id)
    }

    fn place_stateful(
        &self,
        player_id: &str,
        game_type: GameType,
        wager: u64,
        build: impl FnOnce(&RoundRng) -> Box<dyn GameState>,
        arm: Option<(TimerEvent, Duration)>,
    ) -> EngineResult<Uuid> {
        let seed = RoundSeed::generate(self.entropy.as_ref())?;
        let core = RoundCore::new(player_id, game_type, wager, seed.commitment());
        let round_id = core.id;

        self.reserve_slot(player_id, game_type, round_id)?;
        if let Err(e) = self.ledger.debit(player_id, wager) {
            self.release_slot(player_id, game_type);
            return Err(e);
        }
        tracing::debug!(round = %round_id, game = %game_type, wager, "wager debited");

        let rng = seed.stream();
        let state = build(&rng);
        let round = ActiveRound {
            core,
            seed,
            rng,
            kind: RoundKind::Stateful(state),
        };
        self.rounds.insert(round_id, Arc::new(Mutex::new(round)));
        if let Some((event, delay)) = arm {
            self.scheduler.schedule(TimerFire { round_id, event }, delay);
        }
        Ok(round_id)
    }

    fn place_crash_bet(&self, player_id: &str, wager: u64) -> EngineResult<Uuid> {
        let mut current = self.crash_cycle.lock().expect("crash table lock poisoned");

        let reusable = match current.as_ref() {
            Some(existing) => {
                let guard = existing.lock().expect("crash cycle lock poisoned");
                match guard.phase {
                    CrashPhase::Betting => Some(Arc::clone(existing)),
                    CrashPhase::Running { .. } => {
                        // Betting for this cycle is closed; the next window
                        // opens with the first wager after the crash.
                        return Err(EngineError::InvalidTransition {
                            phase: "running".to_string(),
                            action: "place_bet".to_string(),
                        });
                    }
                    CrashPhase::Crashed { .. } => None,
                }
            }
            None => None,
        };

        let cycle_arc = match reusable {
            Some(arc) => arc,
            None => {
                // Fresh cycle: the seed is committed before any wager joins.
                let seed = RoundSeed::generate(self.entropy.as_ref())?;
                let cycle = CrashCycle::new(seed);
                let cycle_id = cycle.id;
                let arc = Arc::new(Mutex::new(cycle));
                self.cycles.insert(cycle_id, Arc::clone(&arc));
                self.scheduler.schedule(
                    TimerFire {
                        round_id: cycle_id,
                        event: TimerEvent::BettingCountdown,
                    },
                    self.config.betting_countdown(),
                );
                *current = Some(Arc::clone(&arc));
                tracing::debug!(cycle = %cycle_id, "crash betting window opened");
                arc
            }
        };

        let mut cycle = cycle_arc.lock().expect("crash cycle lock poisoned");
        let core = RoundCore::new(player_id, GameType::Crash, wager, cycle.commitment.clone());
        let round_id = core.id;

        self.reserve_slot(player_id, GameType::Crash, round_id)?;
        if let Err(e) = self.ledger.debit(player_id, wager) {
            self.release_slot(player_id, GameType::Crash);
            return Err(e);
        }
        tracing::debug!(round = %round_id, cycle = %cycle.id, wager, "crash wager joined");

        cycle.tickets.insert(
            round_id,
            CrashTicket {
                player_id: player_id.to_string(),
                wager,
                cashed_out_at: None,
            },
        );
        let round = ActiveRound {
            core,
            seed: cycle.seed.clone(),
            rng: cycle.seed.stream(),
            kind: RoundKind::CrashTicket {
                cycle: Arc::clone(&cycle_arc),
            },
        };
        self.rounds.insert(round_id, Arc::new(Mutex::new(round)));
        Ok(round_id)
    }

    fn crash_act(
        &self,
        entry: &Arc<Mutex<ActiveRound>>,
        cycle_arc: &Arc<Mutex<CrashCycle>>,
        round_id: Uuid,
        action: Action,
    ) -> EngineResult<RoundSnapshot> {
        let mut cycle = cycle_arc.lock().expect("crash cycle lock poisoned");
        if action != Action::CashOut {
            return Err(EngineError::InvalidTransition {
                phase: cycle.phase_name().to_string(),
                action: action.to_string(),
            });
        }
        match cycle.phase {
            CrashPhase::Betting => Err(EngineError::InvalidTransition {
                phase: "betting".to_string(),
                action: action.to_string(),
            }),
            CrashPhase::Crashed { .. } => Err(EngineError::InvalidTransition {
                phase: "crashed".to_string(),
                action: action.to_string(),
            }),
            CrashPhase::Running { since, crash_point } => {
                let now = multiplier_at(self.config.crash.growth_rate_per_sec, since.elapsed());
                if now >= crash_point {
                    // The curve crossed its crash point before the timer
                    // landed; this cash-out is at-or-after the crash instant.
                    self.crash_now(&mut cycle);
                    return Err(EngineError::InvalidTransition {
                        phase: "crashed".to_string(),
                        action: action.to_string(),
                    });
                }
                let ticket = cycle
                    .tickets
                    .get_mut(&round_id)
                    .ok_or(EngineError::NotFound(round_id))?;
                if ticket.cashed_out_at.is_some() {
                    return Err(EngineError::InvalidTransition {
                        phase: "cashed".to_string(),
                        action: action.to_string(),
                    });
                }
                ticket.cashed_out_at = Some(now);
                let mut guard = entry.lock().expect("round lock poisoned");
                self.settle_round(&mut guard, Outcome::Win, now);
                Ok(self.snapshot_crash(&guard, &cycle))
            }
        }
    }

    fn crash_timer(&self, cycle_arc: &Arc<Mutex<CrashCycle>>, event: TimerEvent) {
        let mut cycle = cycle_arc.lock().expect("crash cycle lock poisoned");
        match (event, &cycle.phase) {
            (TimerEvent::BettingCountdown, CrashPhase::Betting) => {
                let point = cycle.start_running(self.config.crash.house_factor);
                let eta = time_to_reach(self.config.crash.growth_rate_per_sec, point);
                self.scheduler.schedule(
                    TimerFire {
                        round_id: cycle.id,
                        event: TimerEvent::CrashInstant,
                    },
                    eta,
                );
                tracing::debug!(cycle = %cycle.id, "crash curve running");
            }
            (TimerEvent::CrashInstant, CrashPhase::Running { .. }) => self.crash_now(&mut cycle),
            _ => tracing::debug!(cycle = %cycle.id, event = ?event, "stale crash timer ignored"),
        }
    }

    /// Crash the cycle and settle every wager that did not cash out.
    fn crash_now(&self, cycle: &mut CrashCycle) {
        let crash_point = match cycle.phase {
            CrashPhase::Running { crash_point, .. } => crash_point,
            _ => return,
        };
        cycle.phase = CrashPhase::Crashed { crash_point };
        self.cycles.remove(&cycle.id);

        for (round_id, ticket) in cycle.tickets.iter() {
            if ticket.cashed_out_at.is_some() {
                continue;
            }
            let entry = self.rounds.get(round_id).map(|e| Arc::clone(e.value()));
            if let Some(entry) = entry {
                let mut guard = entry.lock().expect("round lock poisoned");
                self.settle_round(&mut guard, Outcome::Lose, 0.0);
            }
        }
        tracing::info!(cycle = %cycle.id, crash_point, "curve crashed");
    }

    fn apply_advance(&self, round: &mut ActiveRound, round_id: Uuid, advance: Advance) {
        match advance {
            Advance::Continue { arm: None } => {}
            Advance::Continue {
                arm: Some((event, delay)),
            } => self.scheduler.schedule(TimerFire { round_id, event }, delay),
            Advance::Settle {
                outcome,
                multiplier,
            } => self.settle_round(round, outcome, multiplier),
        }
    }

    /// Credit, free the game slot and emit the outcome, exactly once.
    fn settle_round(&self, round: &mut ActiveRound, outcome: Outcome, multiplier: f64) {
        let payout = (round.core.wager as f64 * multiplier).floor() as u64;
        let stored_multiplier = (outcome != Outcome::Lose).then_some(multiplier);
        if !round.core.settle(outcome, payout, stored_multiplier) {
            return;
        }
        if payout > 0 {
            self.ledger.credit(&round.core.player_id, payout);
        }
        self.release_slot(&round.core.player_id, round.core.game_type);
        self.events.round_settled(&RoundOutcome::new(
            round.core.id,
            &round.core.player_id,
            round.core.game_type,
            round.core.wager,
            payout,
            outcome,
            stored_multiplier,
        ));
        tracing::info!(
            round = %round.core.id,
            game = %round.core.game_type,
            wager = round.core.wager,
            payout,
            "round settled"
        );
    }

    fn reserve_slot(
        &self,
        player_id: &str,
        game_type: GameType,
        round_id: Uuid,
    ) -> EngineResult<()> {
        match self
            .slots_in_use
            .entry((player_id.to_string(), game_type))
        {
            Entry::Occupied(_) => Err(EngineError::SlotOccupied { game_type }),
            Entry::Vacant(vacant) => {
                vacant.insert(round_id);
                Ok(())
            }
        }
    }

    fn release_slot(&self, player_id: &str, game_type: GameType) {
        self.slots_in_use
            .remove(&(player_id.to_string(), game_type));
    }

    fn snapshot_plain(&self, round: &ActiveRound) -> RoundSnapshot {
        let (phase, view) = match &round.kind {
            RoundKind::Immediate(view) => ("settled".to_string(), view.clone()),
            RoundKind::Stateful(state) => (state.phase_name().to_string(), state.view()),
            RoundKind::CrashTicket { .. } => (
                "crash".to_string(),
                GameView::Crash {
                    current_multiplier: None,
                    crash_point: None,
                    cashed_out_at: None,
                },
            ),
        };
        RoundSnapshot {
            round_id: round.core.id,
            player_id: round.core.player_id.clone(),
            game_type: round.core.game_type,
            phase,
            wager: round.core.wager,
            outcome: round.core.outcome,
            payout: round.core.payout,
            multiplier: round.core.multiplier,
            commitment: round.core.commitment.clone(),
            revealed_seed: round.core.is_terminal().then(|| round.seed.reveal()),
            view,
        }
    }

    fn snapshot_crash(&self, round: &ActiveRound, cycle: &CrashCycle) -> RoundSnapshot {
        let cashed_out_at = cycle
            .tickets
            .get(&round.core.id)
            .and_then(|t| t.cashed_out_at);
        let (phase, current_multiplier, crash_point) = match cycle.phase {
            CrashPhase::Betting => ("betting".to_string(), None, None),
            CrashPhase::Running { since, .. } => (
                if cashed_out_at.is_some() {
                    "cashed".to_string()
                } else {
                    "running".to_string()
                },
                Some(multiplier_at(
                    self.config.crash.growth_rate_per_sec,
                    since.elapsed(),
                )),
                // The crash point stays hidden while the curve runs.
                None,
            ),
            CrashPhase::Crashed { crash_point } => (
                if cashed_out_at.is_some() {
                    "cashed".to_string()
                } else {
                    "crashed".to_string()
                },
                None,
                Some(crash_point),
            ),
        };
        // The cycle's seed determines the crash point, so it is revealed only
        // once the whole cycle is over, even for tickets cashed out earlier.
        let cycle_over = matches!(cycle.phase, CrashPhase::Crashed { .. });
        RoundSnapshot {
            round_id: round.core.id,
            player_id: round.core.player_id.clone(),
            game_type: round.core.game_type,
            phase,
            wager: round.core.wager,
            outcome: round.core.outcome,
            payout: round.core.payout,
            multiplier: round.core.multiplier,
            commitment: round.core.commitment.clone(),
            revealed_seed: cycle_over.then(|| round.seed.reveal()),
            view: GameView::Crash {
                current_multiplier,
                crash_point,
                cashed_out_at,
            },
        }
    }
}

fn phase_of(round: &ActiveRound) -> String {
    match &round.kind {
        RoundKind::Immediate(_) => "settled".to_string(),
        RoundKind::Stateful(state) => state.phase_name().to_string(),
        RoundKind::CrashTicket { .. } => "crash".to_string(),
    }
}

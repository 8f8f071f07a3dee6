//! End-to-end round trips over the public engine API.
//!
//! Timed transitions are driven by hand through a `ManualScheduler`, so every
//! test is deterministic; randomness comes from a fixed seeded entropy
//! source. The recurring assertion is balance conservation: for every round,
//! `balance_after == balance_before - wager + payout`, applied exactly once.

use croupier::{
    verify_reveal, Action, BalanceStore, BetParams, BroadcastSink, CasinoEngine, EngineConfig,
    EngineError, EventSink, GameType, GameView, InMemoryLedger, ManualScheduler, Outcome,
    RoundSnapshot, Scheduler, SeededEntropy, TimerEvent, WheelColor,
};
use std::sync::Arc;
use uuid::Uuid;

const WAGER: u64 = 100;
const BANKROLL: u64 = 1_000_000;

struct Harness {
    engine: Arc<CasinoEngine>,
    ledger: Arc<InMemoryLedger>,
    scheduler: Arc<ManualScheduler>,
    sink: Arc<BroadcastSink>,
}

fn harness(seed: u64) -> Harness {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.deposit("p1", BANKROLL);
    ledger.deposit("p2", BANKROLL);
    let scheduler = Arc::new(ManualScheduler::new());
    let sink = Arc::new(BroadcastSink::new(1024));
    let engine = CasinoEngine::new(
        EngineConfig::fast_resolution(),
        Arc::new(SeededEntropy::new(seed)),
        Arc::clone(&ledger) as Arc<dyn BalanceStore>,
        Arc::clone(&sink) as Arc<dyn EventSink>,
        Arc::clone(&scheduler) as Arc<dyn Scheduler>,
    )
    .expect("config is valid");
    Harness {
        engine,
        ledger,
        scheduler,
        sink,
    }
}

impl Harness {
    fn balance(&self, player: &str) -> u64 {
        self.ledger.balance(player).expect("player exists")
    }

    /// Pump every pending timer until the round settles.
    fn drive_to_terminal(&self, round_id: Uuid) -> RoundSnapshot {
        for _ in 0..200 {
            let snapshot = self.engine.round_state(round_id).expect("round exists");
            if snapshot.is_terminal() {
                return snapshot;
            }
            let (fire, _) = self
                .scheduler
                .pop()
                .expect("a timer must be pending while the round is open");
            self.engine.fire_timer(fire);
        }
        panic!("round {} never settled", round_id);
    }

    fn assert_conserved(&self, player: &str, before: u64, snapshot: &RoundSnapshot) {
        assert!(snapshot.is_terminal());
        assert_eq!(
            self.balance(player),
            before - snapshot.wager + snapshot.payout,
            "balance must change by payout - wager, exactly once"
        );
    }
}

#[test]
fn test_immediate_games_conserve_balance_across_rounds() {
    let h = harness(101);
    let bets = [
        BetParams::Dice { prediction: 50.0 },
        BetParams::Slots,
        BetParams::Roulette {
            color: WheelColor::Red,
        },
    ];
    for params in bets {
        for _ in 0..3 {
            let before = h.balance("p1");
            let round_id = h.engine.place_bet("p1", params, WAGER).unwrap();
            let snapshot = h.engine.round_state(round_id).unwrap();
            h.assert_conserved("p1", before, &snapshot);
            assert!(snapshot.payout == 0 || snapshot.outcome == Some(Outcome::Win));
        }
    }
}

#[test]
fn test_blackjack_stand_round_trip() {
    let h = harness(102);
    let before = h.balance("p1");
    let round_id = h.engine.place_bet("p1", BetParams::Blackjack, WAGER).unwrap();

    let snapshot = h.engine.act(round_id, Action::Stand).unwrap();
    assert_eq!(snapshot.phase, "dealer_turn");

    let snapshot = h.drive_to_terminal(round_id);
    h.assert_conserved("p1", before, &snapshot);
    match snapshot.outcome.unwrap() {
        Outcome::Win => assert_eq!(snapshot.payout, 2 * WAGER),
        Outcome::Push => assert_eq!(snapshot.payout, WAGER),
        Outcome::Lose => assert_eq!(snapshot.payout, 0),
    }

    // The dealer's hand is fully visible once the showdown happened.
    let GameView::Blackjack {
        dealer_score,
        hole_card_hidden,
        ..
    } = snapshot.view
    else {
        panic!("wrong view variant");
    };
    assert!(!hole_card_hidden);
    assert!(dealer_score.is_some());
}

#[test]
fn test_blackjack_terminal_act_is_idempotent() {
    let h = harness(103);
    let round_id = h.engine.place_bet("p1", BetParams::Blackjack, WAGER).unwrap();
    h.engine.act(round_id, Action::Stand).unwrap();
    h.drive_to_terminal(round_id);

    let settled = h.balance("p1");
    for _ in 0..2 {
        let err = h.engine.act(round_id, Action::Hit).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }
    // Repeated rejected actions never re-apply the payout.
    assert_eq!(h.balance("p1"), settled);
}

#[test]
fn test_blackjack_abandoned_hand_resolves_by_timeout() {
    let h = harness(104);
    let before = h.balance("p1");
    let round_id = h.engine.place_bet("p1", BetParams::Blackjack, WAGER).unwrap();

    // No player action at all: the turn timeout forces a stand and the
    // dealer plays out.
    let snapshot = h.drive_to_terminal(round_id);
    h.assert_conserved("p1", before, &snapshot);
}

#[test]
fn test_blackjack_hole_card_hidden_in_player_turn() {
    let h = harness(105);
    let round_id = h.engine.place_bet("p1", BetParams::Blackjack, WAGER).unwrap();
    let snapshot = h.engine.round_state(round_id).unwrap();
    assert_eq!(snapshot.phase, "player_turn");
    let GameView::Blackjack {
        dealer_cards,
        dealer_score,
        hole_card_hidden,
        ..
    } = snapshot.view
    else {
        panic!("wrong view variant");
    };
    assert!(hole_card_hidden);
    assert_eq!(dealer_cards.len(), 1);
    assert!(dealer_score.is_none());
}

#[test]
fn test_mines_cashout_round_trip() {
    let h = harness(106);
    let before = h.balance("p1");
    let round_id = h
        .engine
        .place_bet("p1", BetParams::Mines { mine_count: 3 }, WAGER)
        .unwrap();

    let mut snapshot = h.engine.round_state(round_id).unwrap();
    for cell in 0..3u8 {
        if snapshot.is_terminal() {
            break;
        }
        match h.engine.act(round_id, Action::RevealCell { cell }) {
            Ok(s) => snapshot = s,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    if !snapshot.is_terminal() {
        snapshot = h.engine.act(round_id, Action::CashOut).unwrap();
        assert_eq!(snapshot.outcome, Some(Outcome::Win));
    }
    h.assert_conserved("p1", before, &snapshot);

    // Terminal round: both repeats rejected, nothing re-applied.
    let settled = h.balance("p1");
    for _ in 0..2 {
        assert!(matches!(
            h.engine.act(round_id, Action::CashOut),
            Err(EngineError::InvalidTransition { .. })
        ));
    }
    assert_eq!(h.balance("p1"), settled);
}

#[test]
fn test_mines_single_safe_cell_round() {
    let h = harness(107);
    let before = h.balance("p1");
    let round_id = h
        .engine
        .place_bet("p1", BetParams::Mines { mine_count: 24 }, WAGER)
        .unwrap();

    // One cell in 25 is safe; revealing any cell either loses or clears the
    // board at the inverse-probability multiplier of exactly 25.
    let snapshot = h.engine.act(round_id, Action::RevealCell { cell: 0 }).unwrap();
    assert!(snapshot.is_terminal());
    match snapshot.outcome.unwrap() {
        Outcome::Win => assert_eq!(snapshot.payout, 25 * WAGER),
        Outcome::Lose => assert_eq!(snapshot.payout, 0),
        Outcome::Push => panic!("mines cannot push"),
    }
    h.assert_conserved("p1", before, &snapshot);
}

#[test]
fn test_crash_cashout_at_curve_start() {
    let h = harness(108);
    let before = h.balance("p1");
    let round_id = h.engine.place_bet("p1", BetParams::Crash, WAGER).unwrap();

    let snapshot = h.engine.round_state(round_id).unwrap();
    assert_eq!(snapshot.phase, "betting");

    // Close the betting window; the curve starts running.
    let (fire, _) = h.scheduler.pop().expect("countdown armed");
    assert_eq!(fire.event, TimerEvent::BettingCountdown);
    h.engine.fire_timer(fire);

    match h.engine.act(round_id, Action::CashOut) {
        Ok(snapshot) => {
            // Accepted strictly before the crash instant.
            assert_eq!(snapshot.outcome, Some(Outcome::Win));
            assert!(snapshot.payout >= WAGER);
            h.assert_conserved("p1", before, &snapshot);

            // A second cash-out can never double-pay.
            let settled = h.balance("p1");
            assert!(matches!(
                h.engine.act(round_id, Action::CashOut),
                Err(EngineError::InvalidTransition { .. })
            ));
            assert_eq!(h.balance("p1"), settled);
        }
        Err(EngineError::InvalidTransition { .. }) => {
            // Instant crash at 1.00x: the wager settles at zero.
            let snapshot = h.engine.round_state(round_id).unwrap();
            assert_eq!(snapshot.outcome, Some(Outcome::Lose));
            assert_eq!(snapshot.payout, 0);
            h.assert_conserved("p1", before, &snapshot);
        }
        Err(e) => panic!("unexpected error: {}", e),
    }
}

#[test]
fn test_crash_cashout_after_crash_is_rejected_as_loss() {
    let h = harness(109);
    let before = h.balance("p1");
    let round_id = h.engine.place_bet("p1", BetParams::Crash, WAGER).unwrap();

    // Countdown, then the crash instant itself.
    let (countdown, _) = h.scheduler.pop().expect("countdown armed");
    h.engine.fire_timer(countdown);
    let (crash_fire, _) = h.scheduler.pop().expect("crash instant armed");
    assert_eq!(crash_fire.event, TimerEvent::CrashInstant);
    h.engine.fire_timer(crash_fire);

    // At-or-after the crash instant: never accepted.
    let err = h.engine.act(round_id, Action::CashOut).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));

    let snapshot = h.engine.round_state(round_id).unwrap();
    assert_eq!(snapshot.phase, "crashed");
    assert_eq!(snapshot.outcome, Some(Outcome::Lose));
    assert_eq!(snapshot.payout, 0);
    h.assert_conserved("p1", before, &snapshot);

    // The crash point and seed are public once the cycle is over.
    let GameView::Crash { crash_point, .. } = snapshot.view else {
        panic!("wrong view variant");
    };
    assert!(crash_point.expect("crash point revealed") >= 1.0);
    let seed = snapshot.revealed_seed.expect("seed revealed");
    assert!(verify_reveal(&snapshot.commitment, &seed));
}

#[test]
fn test_crash_shares_one_curve_across_players() {
    let h = harness(110);
    let before_p1 = h.balance("p1");
    let before_p2 = h.balance("p2");

    let r1 = h.engine.place_bet("p1", BetParams::Crash, WAGER).unwrap();
    let r2 = h.engine.place_bet("p2", BetParams::Crash, WAGER).unwrap();

    // Both wagers ride the same committed curve.
    let s1 = h.engine.round_state(r1).unwrap();
    let s2 = h.engine.round_state(r2).unwrap();
    assert_eq!(s1.commitment, s2.commitment);
    // Exactly one countdown was armed for the shared cycle.
    assert_eq!(h.scheduler.pending_count(), 1);

    let (countdown, _) = h.scheduler.pop().unwrap();
    h.engine.fire_timer(countdown);

    // Player 1 tries to cash out immediately; player 2 rides until the crash.
    let p1_result = h.engine.act(r1, Action::CashOut);
    if let Some((crash_fire, _)) = h.scheduler.pop() {
        h.engine.fire_timer(crash_fire);
    }

    let s1 = h.engine.round_state(r1).unwrap();
    let s2 = h.engine.round_state(r2).unwrap();
    assert!(s1.is_terminal() && s2.is_terminal());
    assert_eq!(s2.outcome, Some(Outcome::Lose));
    if p1_result.is_ok() {
        assert_eq!(s1.outcome, Some(Outcome::Win));
    } else {
        assert_eq!(s1.outcome, Some(Outcome::Lose));
    }
    h.assert_conserved("p1", before_p1, &s1);
    h.assert_conserved("p2", before_p2, &s2);
}

#[test]
fn test_crash_bet_rejected_while_running() {
    let h = harness(111);
    h.engine.place_bet("p1", BetParams::Crash, WAGER).unwrap();
    let (countdown, _) = h.scheduler.pop().unwrap();
    h.engine.fire_timer(countdown);

    let err = h
        .engine
        .place_bet("p2", BetParams::Crash, WAGER)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
    // p2 was never debited.
    assert_eq!(h.balance("p2"), BANKROLL);
}

#[test]
fn test_invalid_params_rejected_without_debit() {
    let h = harness(112);
    let cases = [
        BetParams::Dice { prediction: 2.0 },
        BetParams::Dice { prediction: 98.0 },
        BetParams::Dice { prediction: 150.0 },
        BetParams::Mines { mine_count: 0 },
        BetParams::Mines { mine_count: 25 },
    ];
    for params in cases {
        let err = h.engine.place_bet("p1", params, WAGER).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParams(_)), "{:?}", params);
    }
    assert_eq!(h.balance("p1"), BANKROLL);
}

#[test]
fn test_event_sink_receives_exact_outcome_shape() {
    let h = harness(113);
    let mut rx = h.sink.subscribe();
    let round_id = h
        .engine
        .place_bet("p1", BetParams::Dice { prediction: 50.0 }, WAGER)
        .unwrap();
    let snapshot = h.engine.round_state(round_id).unwrap();

    let event = rx.try_recv().expect("settlement must emit one event");
    assert_eq!(event.round_id, round_id);
    assert_eq!(event.player_id, "p1");
    assert_eq!(event.game_type, GameType::Dice);
    assert_eq!(event.wager, WAGER);
    assert_eq!(event.payout, snapshot.payout);
    assert_eq!(event.is_win, snapshot.outcome == Some(Outcome::Win));
    if event.is_win {
        assert!(event.multiplier.is_some());
    } else {
        assert!(event.multiplier.is_none());
    }
    // Exactly one event per settlement.
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_commit_reveal_lifecycle() {
    let h = harness(114);

    // An in-progress round exposes the commitment but never the seed.
    let round_id = h.engine.place_bet("p1", BetParams::Blackjack, WAGER).unwrap();
    let snapshot = h.engine.round_state(round_id).unwrap();
    assert!(!snapshot.commitment.is_empty());
    assert!(snapshot.revealed_seed.is_none());

    // After settlement the revealed seed must match the prior commitment.
    h.engine.act(round_id, Action::Stand).unwrap();
    let snapshot = h.drive_to_terminal(round_id);
    let seed = snapshot.revealed_seed.expect("terminal round reveals seed");
    assert!(verify_reveal(&snapshot.commitment, &seed));
}

#[test]
fn test_slot_frees_after_settlement() {
    let h = harness(115);
    let round_id = h.engine.place_bet("p1", BetParams::Blackjack, WAGER).unwrap();
    assert!(matches!(
        h.engine.place_bet("p1", BetParams::Blackjack, WAGER),
        Err(EngineError::SlotOccupied { .. })
    ));

    h.engine.act(round_id, Action::Stand).unwrap();
    h.drive_to_terminal(round_id);

    // The slot reopens once the hand settles.
    assert!(h.engine.place_bet("p1", BetParams::Blackjack, WAGER).is_ok());
}

#[test]
fn test_three_seeded_rounds_of_every_game_conserve_balance() {
    let h = harness(116);
    for _ in 0..3 {
        // Dice, slots, roulette settle at placement.
        for params in [
            BetParams::Dice { prediction: 60.0 },
            BetParams::Slots,
            BetParams::Roulette {
                color: WheelColor::Green,
            },
        ] {
            let before = h.balance("p1");
            let round_id = h.engine.place_bet("p1", params, WAGER).unwrap();
            let snapshot = h.engine.round_state(round_id).unwrap();
            h.assert_conserved("p1", before, &snapshot);
        }

        // Blackjack: stand immediately and let the dealer play.
        let before = h.balance("p1");
        let round_id = h.engine.place_bet("p1", BetParams::Blackjack, WAGER).unwrap();
        h.engine.act(round_id, Action::Stand).unwrap();
        let snapshot = h.drive_to_terminal(round_id);
        h.assert_conserved("p1", before, &snapshot);

        // Mines: immediate cash-out returns the wager at 1.0x.
        let before = h.balance("p1");
        let round_id = h
            .engine
            .place_bet("p1", BetParams::Mines { mine_count: 5 }, WAGER)
            .unwrap();
        let snapshot = h.engine.act(round_id, Action::CashOut).unwrap();
        assert_eq!(snapshot.payout, WAGER);
        h.assert_conserved("p1", before, &snapshot);

        // Crash: cash out at the start of the curve, or lose to an instant
        // crash; either way the books balance.
        let before = h.balance("p1");
        let round_id = h.engine.place_bet("p1", BetParams::Crash, WAGER).unwrap();
        let (countdown, _) = h.scheduler.pop().unwrap();
        h.engine.fire_timer(countdown);
        let _ = h.engine.act(round_id, Action::CashOut);
        if let Some((fire, _)) = h.scheduler.pop() {
            h.engine.fire_timer(fire);
        }
        let snapshot = h.engine.round_state(round_id).unwrap();
        h.assert_conserved("p1", before, &snapshot);
    }
}

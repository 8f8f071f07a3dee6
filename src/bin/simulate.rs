//! Seeded simulation harness: runs rounds of every game against the engine
//! and reports realized return-to-player per game.
//!
//! Useful for eyeballing house-edge convergence and for exercising the full
//! place-act-settle path under the production scheduler.

use clap::Parser;
use croupier::{
    Action, BalanceStore, BetParams, CasinoEngine, EngineConfig, EngineError, EventSink, GameView,
    InMemoryLedger, NullSink, RoundSnapshot, SeededEntropy, WheelColor,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "simulate",
    about = "Seeded house-edge simulation across all six games"
)]
struct Args {
    /// Rounds to play per game.
    #[arg(long, default_value_t = 200)]
    rounds: u64,

    /// Seed for the deterministic entropy source.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Wager per round, in chips.
    #[arg(long, default_value_t = 100)]
    wager: u64,

    /// Crash strategy: cash out once the curve reaches this multiplier.
    #[arg(long, default_value_t = 1.5)]
    crash_target: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let ledger = Arc::new(InMemoryLedger::new());
    let engine = CasinoEngine::with_tokio_scheduler(
        EngineConfig::fast_resolution(),
        Arc::new(SeededEntropy::new(args.seed)),
        Arc::clone(&ledger) as Arc<dyn BalanceStore>,
        Arc::new(NullSink) as Arc<dyn EventSink>,
    )?;

    println!(
        "simulating {} rounds per game at {} chips each (seed {})",
        args.rounds, args.wager, args.seed
    );
    println!("{:<10} {:>8} {:>12} {:>12} {:>8}", "game", "rounds", "wagered", "returned", "rtp");

    run_game(&engine, &ledger, "sim-dice", args.rounds, args.wager, |_| {
        BetParams::Dice { prediction: 50.0 }
    })
    .await?;
    report(&ledger, "dice", "sim-dice", args.rounds);

    run_game(&engine, &ledger, "sim-slots", args.rounds, args.wager, |_| {
        BetParams::Slots
    })
    .await?;
    report(&ledger, "slots", "sim-slots", args.rounds);

    run_game(&engine, &ledger, "sim-roulette", args.rounds, args.wager, |_| {
        BetParams::Roulette {
            color: WheelColor::Red,
        }
    })
    .await?;
    report(&ledger, "roulette", "sim-roulette", args.rounds);

    run_blackjack(&engine, &ledger, "sim-blackjack", args.rounds, args.wager).await?;
    report(&ledger, "blackjack", "sim-blackjack", args.rounds);

    run_mines(&engine, &ledger, "sim-mines", args.rounds, args.wager).await?;
    report(&ledger, "mines", "sim-mines", args.rounds);

    run_crash(
        &engine,
        &ledger,
        "sim-crash",
        args.rounds,
        args.wager,
        args.crash_target,
    )
    .await?;
    report(&ledger, "crash", "sim-crash", args.rounds);

    Ok(())
}

/// Immediate-settlement games: place, read back, repeat.
async fn run_game(
    engine: &CasinoEngine,
    ledger: &InMemoryLedger,
    player: &str,
    rounds: u64,
    wager: u64,
    params: impl Fn(u64) -> BetParams,
) -> Result<(), EngineError> {
    ledger.deposit(player, rounds * wager);
    for i in 0..rounds {
        let round_id = engine.place_bet(player, params(i), wager)?;
        let snapshot = engine.round_state(round_id)?;
        assert!(snapshot.is_terminal());
    }
    engine.prune_settled();
    Ok(())
}

async fn run_blackjack(
    engine: &CasinoEngine,
    ledger: &InMemoryLedger,
    player: &str,
    rounds: u64,
    wager: u64,
) -> Result<(), EngineError> {
    ledger.deposit(player, rounds * wager);
    for _ in 0..rounds {
        let round_id = engine.place_bet(player, BetParams::Blackjack, wager)?;
        // Hit to 17, then stand and let the dealer play out.
        loop {
            let snapshot = engine.round_state(round_id)?;
            if snapshot.is_terminal() {
                break;
            }
            let GameView::Blackjack { player_score, .. } = &snapshot.view else {
                break;
            };
            if snapshot.phase == "player_turn" {
                let action = if *player_score < 17 {
                    Action::Hit
                } else {
                    Action::Stand
                };
                if engine.act(round_id, action).is_err() {
                    break;
                }
            } else {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        }
    }
    engine.prune_settled();
    Ok(())
}

async fn run_mines(
    engine: &CasinoEngine,
    ledger: &InMemoryLedger,
    player: &str,
    rounds: u64,
    wager: u64,
) -> Result<(), EngineError> {
    ledger.deposit(player, rounds * wager);
    for _ in 0..rounds {
        let round_id = engine.place_bet(player, BetParams::Mines { mine_count: 5 }, wager)?;
        // Reveal three cells, then bank whatever survived.
        for cell in 0..3 {
            match engine.act(round_id, Action::RevealCell { cell }) {
                Ok(snapshot) if snapshot.is_terminal() => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        let _ = engine.act(round_id, Action::CashOut);
    }
    engine.prune_settled();
    Ok(())
}

async fn run_crash(
    engine: &CasinoEngine,
    ledger: &InMemoryLedger,
    player: &str,
    rounds: u64,
    wager: u64,
    target: f64,
) -> Result<(), EngineError> {
    ledger.deposit(player, rounds * wager);
    for _ in 0..rounds {
        // Betting may be closed while the previous curve runs out.
        let round_id = loop {
            match engine.place_bet(player, BetParams::Crash, wager) {
                Ok(id) => break id,
                Err(EngineError::InvalidTransition { .. }) => {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                Err(e) => return Err(e),
            }
        };
        let _ = wait_crash_round(engine, round_id, target).await;
    }
    engine.prune_settled();
    Ok(())
}

/// Ride the curve to the target multiplier, then cash out; a rejection means
/// the curve crashed first.
async fn wait_crash_round(
    engine: &CasinoEngine,
    round_id: Uuid,
    target: f64,
) -> Result<RoundSnapshot, EngineError> {
    loop {
        let snapshot = engine.round_state(round_id)?;
        if snapshot.is_terminal() {
            return Ok(snapshot);
        }
        if let GameView::Crash {
            current_multiplier: Some(multiplier),
            ..
        } = snapshot.view
        {
            if multiplier >= target {
                let _ = engine.act(round_id, Action::CashOut);
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

fn report(ledger: &InMemoryLedger, game: &str, player: &str, rounds: u64) {
    let (wagered, won) = ledger.lifetime_stats(player).unwrap_or((0, 0));
    let rtp = if wagered > 0 {
        won as f64 / wagered as f64
    } else {
        0.0
    };
    println!(
        "{:<10} {:>8} {:>12} {:>12} {:>7.3}",
        game, rounds, wagered, won, rtp
    );
}

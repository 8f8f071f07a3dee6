//! Player balance store with per-player serialized mutation.
//!
//! Amounts are integer chips. Losses are captured entirely by the initial
//! wager debit; there is no negative credit operation, so a balance can never
//! go below zero.

use crate::errors::{EngineError, EngineResult};
use dashmap::DashMap;

/// Player identifier (wallet address or session id).
pub type PlayerId = String;

/// Balance collaborator the engine settles against.
///
/// Implementations must serialize `debit` and `credit` per player id so two
/// concurrent rounds cannot race past a balance check against a stale value.
pub trait BalanceStore: Send + Sync {
    /// Atomically check-and-decrement. Fails with `InsufficientFunds` if the
    /// player is unknown or the balance is short; no partial debit occurs.
    fn debit(&self, player: &str, amount: u64) -> EngineResult<()>;

    /// Add a payout and return the new balance. Creates the account if the
    /// player is unknown.
    fn credit(&self, player: &str, amount: u64) -> u64;

    /// Current balance, if the player exists.
    fn balance(&self, player: &str) -> Option<u64>;
}

#[derive(Debug, Default, Clone)]
struct PlayerAccount {
    balance: u64,
    lifetime_wagered: u64,
    lifetime_won: u64,
}

/// In-memory ledger. Each map entry's shard guard serializes debit/credit for
/// that player; different players proceed concurrently.
///
/// Players are created on first deposit or credit and never deleted.
pub struct InMemoryLedger {
    accounts: DashMap<PlayerId, PlayerAccount>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Fund a player, creating the account on first use.
    pub fn deposit(&self, player: &str, amount: u64) -> u64 {
        let mut account = self.accounts.entry(player.to_string()).or_default();
        account.balance += amount;
        account.balance
    }

    /// Lifetime (wagered, won) totals for leaderboard-style consumers.
    pub fn lifetime_stats(&self, player: &str) -> Option<(u64, u64)> {
        self.accounts
            .get(player)
            .map(|a| (a.lifetime_wagered, a.lifetime_won))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceStore for InMemoryLedger {
    fn debit(&self, player: &str, amount: u64) -> EngineResult<()> {
        let mut account = self
            .accounts
            .get_mut(player)
            .ok_or(EngineError::InsufficientFunds)?;
        if account.balance < amount {
            return Err(EngineError::InsufficientFunds);
        }
        account.balance -= amount;
        account.lifetime_wagered += amount;
        Ok(())
    }

    fn credit(&self, player: &str, amount: u64) -> u64 {
        let mut account = self.accounts.entry(player.to_string()).or_default();
        account.balance += amount;
        account.lifetime_won += amount;
        account.balance
    }

    fn balance(&self, player: &str) -> Option<u64> {
        self.accounts.get(player).map(|a| a.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_debit_unknown_player_fails() {
        let ledger = InMemoryLedger::new();
        assert_eq!(
            ledger.debit("ghost", 10),
            Err(EngineError::InsufficientFunds)
        );
    }

    #[test]
    fn test_debit_checks_and_decrements() {
        let ledger = InMemoryLedger::new();
        ledger.deposit("p1", 100);
        assert!(ledger.debit("p1", 60).is_ok());
        assert_eq!(ledger.balance("p1"), Some(40));
        assert_eq!(ledger.debit("p1", 41), Err(EngineError::InsufficientFunds));
        assert_eq!(ledger.balance("p1"), Some(40));
    }

    #[test]
    fn test_credit_returns_new_balance() {
        let ledger = InMemoryLedger::new();
        ledger.deposit("p1", 10);
        assert_eq!(ledger.credit("p1", 25), 35);
    }

    #[test]
    fn test_lifetime_stats_track_flows() {
        let ledger = InMemoryLedger::new();
        ledger.deposit("p1", 100);
        ledger.debit("p1", 30).unwrap();
        ledger.credit("p1", 60);
        assert_eq!(ledger.lifetime_stats("p1"), Some((30, 60)));
    }

    #[test]
    fn test_concurrent_debits_never_overdraw() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.deposit("p1", 100);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            handles.push(std::thread::spawn(move || {
                let mut ok = 0u64;
                for _ in 0..50 {
                    if ledger.debit("p1", 1).is_ok() {
                        ok += 1;
                    }
                }
                ok
            }));
        }

        let granted: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // 400 attempts against a balance of 100: exactly 100 may succeed.
        assert_eq!(granted, 100);
        assert_eq!(ledger.balance("p1"), Some(0));
    }
}

//! Matchmaking pairer: converts two waiting queue entries into one match.

use crate::config::Config;
use crate::db::repo::PairingOutcome;
use crate::db::Repository;
use crate::domain::{Amount, Match, QueueEntry, QueueStatus, UserId};
use crate::engine;
use crate::notify::{Notifier, NotifyEvent};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("account not found")]
    AccountNotFound,
    #[error("stake tier must be positive")]
    InvalidStake,
    #[error("player is already queued")]
    AlreadyQueued,
    #[error("player is already in an active match")]
    AlreadyInMatch,
    #[error("balance cannot cover the stake")]
    InsufficientFunds,
    #[error("no waiting queue entry to cancel")]
    NothingToCancel,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// What a queue join produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// No compatible opponent yet; the entry waits.
    Queued,
    /// Paired immediately.
    Paired(Match),
}

#[derive(Clone)]
pub struct Pairer {
    repo: Arc<Repository>,
    config: Config,
    notifier: Arc<dyn Notifier>,
}

impl Pairer {
    pub fn new(repo: Arc<Repository>, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repo,
            config,
            notifier,
        }
    }

    /// Put a player into the queue and attempt a pairing.
    pub async fn join_queue(
        &self,
        user_id: &UserId,
        stake_tier: Amount,
    ) -> Result<JoinOutcome, PairingError> {
        if !stake_tier.is_positive() {
            return Err(PairingError::InvalidStake);
        }

        let account = self
            .repo
            .get_account(user_id)
            .await?
            .ok_or(PairingError::AccountNotFound)?;

        if account.active_match_id.is_some() {
            return Err(PairingError::AlreadyInMatch);
        }
        // Early affordability check for a friendly error; the pairing
        // transaction re-verifies it authoritatively.
        if account.wallet_balance < stake_tier {
            return Err(PairingError::InsufficientFunds);
        }

        let entry = QueueEntry::new(user_id.clone(), stake_tier, account.display_name);
        if !self.repo.insert_queue_entry(&entry).await? {
            return Err(PairingError::AlreadyQueued);
        }
        info!(user = %user_id, stake = stake_tier.as_minor_units(), "player joined queue");

        match self.try_pair(user_id, stake_tier).await? {
            Some(paired) => Ok(JoinOutcome::Paired(paired)),
            None => Ok(JoinOutcome::Queued),
        }
    }

    /// Remove a still-waiting entry.
    pub async fn cancel_queue(&self, user_id: &UserId) -> Result<(), PairingError> {
        if !self.repo.delete_waiting_entry(user_id).await? {
            // The pairer won the race, or the player never queued.
            return Err(PairingError::NothingToCancel);
        }
        info!(user = %user_id, "queue entry cancelled");
        Ok(())
    }

    /// One pairing pass for a waiting entry.
    ///
    /// Safe under duplicate and concurrent invocation: the atomic claim
    /// inside `pair_players_atomic` makes the losing invocation a no-op.
    pub async fn try_pair(
        &self,
        user_id: &UserId,
        stake_tier: Amount,
    ) -> Result<Option<Match>, PairingError> {
        let prize_pool = engine::prize_pool(stake_tier, 2, self.config.commission_rate);

        loop {
            let Some(opponent) = self
                .repo
                .find_waiting_opponent(stake_tier, user_id)
                .await?
            else {
                return Ok(None);
            };

            // Earlier joiner takes the first seat.
            let outcome = self
                .repo
                .pair_players_atomic(stake_tier, &opponent, user_id, prize_pool)
                .await?;

            match outcome {
                PairingOutcome::Paired(paired) => {
                    info!(
                        match_id = %paired.id,
                        stake = stake_tier.as_minor_units(),
                        prize_pool = prize_pool.as_minor_units(),
                        "match created"
                    );
                    let event = NotifyEvent::MatchPaired {
                        match_id: paired.id.clone(),
                        stake_tier,
                        player_ids: paired.player_ids.clone(),
                    };
                    if let Err(e) = self.notifier.publish(&event).await {
                        warn!(match_id = %paired.id, error = %e, "pairing notification failed");
                    }
                    return Ok(Some(paired));
                }
                PairingOutcome::StaleEntry => {
                    // Our own entry may have been consumed by the opponent's
                    // concurrent invocation; only keep scanning while we are
                    // still waiting.
                    let own = self.repo.get_queue_entry(user_id).await?;
                    match own {
                        Some(entry) if entry.status == QueueStatus::Waiting => continue,
                        _ => return Ok(None),
                    }
                }
                PairingOutcome::InsufficientFunds(poor) => {
                    // Both entries stay waiting; a later join retries.
                    warn!(
                        user = %poor,
                        stake = stake_tier.as_minor_units(),
                        "pairing aborted: stake not affordable"
                    );
                    return Ok(None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::domain::{EntryKind, LedgerEntry, MatchStatus, UserAccount};
    use crate::notify::NoopNotifier;
    use std::collections::HashMap;
    use tempfile::TempDir;

    async fn setup() -> (Pairer, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));

        let mut env = HashMap::new();
        env.insert("DATABASE_PATH".to_string(), db_path);
        env.insert("ADMIN_TOKEN".to_string(), "secret".to_string());
        let config = Config::from_env_map(env).unwrap();

        let pairer = Pairer::new(repo.clone(), config, Arc::new(NoopNotifier));
        (pairer, repo, temp_dir)
    }

    async fn funded_account(repo: &Repository, id: &str, balance: i64) -> UserId {
        let user = UserId::new(id.to_string());
        repo.insert_account(&UserAccount::new(user.clone(), id.to_uppercase(), None))
            .await
            .unwrap();
        if balance > 0 {
            let entry = LedgerEntry::pending(
                user.clone(),
                Amount::new(balance),
                EntryKind::Deposit,
                None,
            );
            repo.insert_and_apply_entry(&entry).await.unwrap();
        }
        user
    }

    #[tokio::test]
    async fn test_first_join_waits_second_pairs() {
        let (pairer, repo, _temp) = setup().await;
        let u1 = funded_account(&repo, "u1", 500).await;
        let u2 = funded_account(&repo, "u2", 500).await;

        let first = pairer.join_queue(&u1, Amount::new(100)).await.unwrap();
        assert_eq!(first, JoinOutcome::Queued);

        let second = pairer.join_queue(&u2, Amount::new(100)).await.unwrap();
        let paired = match second {
            JoinOutcome::Paired(m) => m,
            other => panic!("expected Paired, got {:?}", other),
        };

        assert_eq!(paired.status, MatchStatus::Ongoing);
        // Stake 100, two players, default 10% commission: the fixed 1.8x pool.
        assert_eq!(paired.prize_pool, Amount::new(180));
        assert_eq!(paired.player_ids, vec![u1.clone(), u2.clone()]);

        for user in [&u1, &u2] {
            assert_eq!(
                repo.get_balance(user).await.unwrap(),
                Some(Amount::new(400))
            );
        }
    }

    #[tokio::test]
    async fn test_join_requires_affordable_stake() {
        let (pairer, repo, _temp) = setup().await;
        let user = funded_account(&repo, "u1", 50).await;

        let result = pairer.join_queue(&user, Amount::new(100)).await;
        assert!(matches!(result, Err(PairingError::InsufficientFunds)));
        assert!(repo.get_queue_entry(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_join_twice_rejected() {
        let (pairer, repo, _temp) = setup().await;
        let user = funded_account(&repo, "u1", 500).await;

        pairer.join_queue(&user, Amount::new(100)).await.unwrap();
        let second = pairer.join_queue(&user, Amount::new(100)).await;
        assert!(matches!(second, Err(PairingError::AlreadyQueued)));
    }

    #[tokio::test]
    async fn test_join_blocked_while_in_match() {
        let (pairer, repo, _temp) = setup().await;
        let u1 = funded_account(&repo, "u1", 500).await;
        let u2 = funded_account(&repo, "u2", 500).await;

        pairer.join_queue(&u1, Amount::new(100)).await.unwrap();
        pairer.join_queue(&u2, Amount::new(100)).await.unwrap();

        let result = pairer.join_queue(&u1, Amount::new(100)).await;
        assert!(matches!(result, Err(PairingError::AlreadyInMatch)));
    }

    #[tokio::test]
    async fn test_cancel_before_pairing() {
        let (pairer, repo, _temp) = setup().await;
        let u1 = funded_account(&repo, "u1", 500).await;
        let u2 = funded_account(&repo, "u2", 500).await;

        pairer.join_queue(&u1, Amount::new(100)).await.unwrap();
        pairer.cancel_queue(&u1).await.unwrap();

        // The cancelled entry must not be pairable.
        let second = pairer.join_queue(&u2, Amount::new(100)).await.unwrap();
        assert_eq!(second, JoinOutcome::Queued);

        let again = pairer.cancel_queue(&u1).await;
        assert!(matches!(again, Err(PairingError::NothingToCancel)));
    }

    #[tokio::test]
    async fn test_different_tiers_never_pair() {
        let (pairer, repo, _temp) = setup().await;
        let u1 = funded_account(&repo, "u1", 500).await;
        let u2 = funded_account(&repo, "u2", 500).await;

        pairer.join_queue(&u1, Amount::new(100)).await.unwrap();
        let second = pairer.join_queue(&u2, Amount::new(200)).await.unwrap();
        assert_eq!(second, JoinOutcome::Queued);
    }

    #[tokio::test]
    async fn test_concurrent_joins_pair_each_entry_once() {
        let (pairer, repo, _temp) = setup().await;
        let pairer = Arc::new(pairer);

        let mut users = Vec::new();
        for i in 0..6 {
            users.push(funded_account(&repo, &format!("u{}", i), 500).await);
        }

        let mut handles = Vec::new();
        for user in users.clone() {
            let pairer = pairer.clone();
            handles.push(tokio::spawn(async move {
                pairer.join_queue(&user, Amount::new(100)).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Every player was debited exactly once or not at all; at-most-once
        // pairing per entry.
        let mut matched = 0;
        for user in &users {
            let balance = repo.get_balance(user).await.unwrap().unwrap();
            assert!(balance == Amount::new(400) || balance == Amount::new(500));
            let account = repo.get_account(user).await.unwrap().unwrap();
            if account.active_match_id.is_some() {
                assert_eq!(balance, Amount::new(400));
                matched += 1;
            }
            assert_eq!(
                repo.sum_completed_for_user(user).await.unwrap(),
                balance
            );
        }
        // Pairs consume players two at a time.
        assert_eq!(matched % 2, 0);
    }
}

//! Payout distributor: releases the prize pool exactly once per match.

use crate::db::repo::PayoutOutcome;
use crate::db::Repository;
use crate::domain::MatchId;
use crate::engine::{RATING_LOSS_DELTA, RATING_WIN_DELTA};
use crate::notify::{Notifier, NotifyEvent};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct Distributor {
    repo: Arc<Repository>,
    notifier: Arc<dyn Notifier>,
}

impl Distributor {
    pub fn new(repo: Arc<Repository>, notifier: Arc<dyn Notifier>) -> Self {
        Self { repo, notifier }
    }

    /// Issue the winner's payout for a completed match.
    ///
    /// Idempotent: the write-once `prize_distributed` flag and the winnings
    /// entry commit together, so duplicate invocations (including a race
    /// with the admin override path) observe the flag and no-op. Stats,
    /// rating, and notification run after the commit and are best-effort.
    pub async fn distribute(&self, match_id: &MatchId) -> Result<PayoutOutcome, sqlx::Error> {
        let outcome = self.repo.distribute_prize_atomic(match_id).await?;

        match &outcome {
            PayoutOutcome::Paid {
                winner,
                amount,
                new_balance,
            } => {
                info!(
                    match_id = %match_id,
                    winner = %winner,
                    amount = amount.as_minor_units(),
                    balance = new_balance.as_minor_units(),
                    "prize distributed"
                );
                self.finish_best_effort(match_id, &outcome).await;
                let event = NotifyEvent::PrizePaid {
                    match_id: match_id.clone(),
                    winner_id: winner.clone(),
                    amount: *amount,
                };
                if let Err(e) = self.notifier.publish(&event).await {
                    warn!(match_id = %match_id, error = %e, "payout notification failed");
                }
            }
            PayoutOutcome::AlreadyDistributed => {
                info!(match_id = %match_id, "prize already distributed, no-op");
            }
            PayoutOutcome::NotEligible | PayoutOutcome::MatchMissing => {}
            PayoutOutcome::WinnerAccountMissing => {
                warn!(match_id = %match_id, "payout blocked: winner account missing");
            }
        }

        Ok(outcome)
    }

    /// Aggregate stats and rating deltas. Failures are logged, never
    /// propagated: the payout has already committed.
    async fn finish_best_effort(&self, match_id: &MatchId, outcome: &PayoutOutcome) {
        let PayoutOutcome::Paid { winner, .. } = outcome else {
            return;
        };

        let losers = match self.repo.get_match(match_id).await {
            Ok(Some(m)) => m
                .player_ids
                .into_iter()
                .filter(|p| p != winner)
                .collect::<Vec<_>>(),
            Ok(None) => return,
            Err(e) => {
                warn!(match_id = %match_id, error = %e, "stats update skipped: match read failed");
                return;
            }
        };

        if let Err(e) = self
            .repo
            .apply_match_stats(winner, &losers, RATING_WIN_DELTA, RATING_LOSS_DELTA)
            .await
        {
            warn!(match_id = %match_id, error = %e, "stats update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::db::repo::PairingOutcome;
    use crate::domain::{
        Amount, EntryKind, LedgerEntry, Match, MatchStatus, QueueEntry, UserAccount, UserId,
    };
    use crate::notify::NoopNotifier;
    use tempfile::TempDir;

    async fn setup() -> (Distributor, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));
        (
            Distributor::new(repo.clone(), Arc::new(NoopNotifier)),
            repo,
            temp_dir,
        )
    }

    async fn completed_match(repo: &Repository, winner: &UserId, loser: &UserId) -> Match {
        for user in [winner, loser] {
            repo.insert_account(&UserAccount::new(
                user.clone(),
                user.as_str().to_uppercase(),
                None,
            ))
            .await
            .unwrap();
            let entry = LedgerEntry::pending(
                user.clone(),
                Amount::new(500),
                EntryKind::Deposit,
                None,
            );
            repo.insert_and_apply_entry(&entry).await.unwrap();
            repo.insert_queue_entry(&QueueEntry::new(
                user.clone(),
                Amount::new(100),
                user.as_str().to_uppercase(),
            ))
            .await
            .unwrap();
        }

        let paired = match repo
            .pair_players_atomic(Amount::new(100), winner, loser, Amount::new(180))
            .await
            .unwrap()
        {
            PairingOutcome::Paired(m) => m,
            other => panic!("expected Paired, got {:?}", other),
        };

        repo.transition_match(
            &paired.id,
            &[MatchStatus::Ongoing],
            MatchStatus::Completed,
            Some(winner),
            None,
        )
        .await
        .unwrap();
        paired
    }

    #[tokio::test]
    async fn test_distribute_updates_stats_and_rating() {
        let (distributor, repo, _temp) = setup().await;
        let winner = UserId::new("u1".to_string());
        let loser = UserId::new("u2".to_string());
        let m = completed_match(&repo, &winner, &loser).await;

        let outcome = distributor.distribute(&m.id).await.unwrap();
        assert!(matches!(outcome, PayoutOutcome::Paid { .. }));

        let w = repo.get_account(&winner).await.unwrap().unwrap();
        assert_eq!(w.wallet_balance, Amount::new(580));
        assert_eq!(w.matches_played, 1);
        assert_eq!(w.matches_won, 1);
        assert_eq!(w.rating, RATING_WIN_DELTA);

        let l = repo.get_account(&loser).await.unwrap().unwrap();
        assert_eq!(l.wallet_balance, Amount::new(400));
        assert_eq!(l.matches_played, 1);
        assert_eq!(l.matches_won, 0);
        assert_eq!(l.rating, 0); // floored, not -5
    }

    #[tokio::test]
    async fn test_distribute_twice_pays_once() {
        let (distributor, repo, _temp) = setup().await;
        let winner = UserId::new("u1".to_string());
        let loser = UserId::new("u2".to_string());
        let m = completed_match(&repo, &winner, &loser).await;

        let first = distributor.distribute(&m.id).await.unwrap();
        assert!(matches!(first, PayoutOutcome::Paid { .. }));

        let second = distributor.distribute(&m.id).await.unwrap();
        assert_eq!(second, PayoutOutcome::AlreadyDistributed);

        assert_eq!(
            repo.get_balance(&winner).await.unwrap(),
            Some(Amount::new(580))
        );

        // Exactly one winnings entry exists.
        let winnings: Vec<_> = repo
            .query_entries_for_user(&winner, 50)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.kind == EntryKind::Winnings)
            .collect();
        assert_eq!(winnings.len(), 1);
    }
}

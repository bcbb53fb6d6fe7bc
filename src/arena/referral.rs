//! Referral commission evaluator.

use crate::db::repo::ReferralOutcome;
use crate::db::Repository;
use crate::domain::{Amount, UserId};
use crate::engine;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct ReferralEvaluator {
    repo: Arc<Repository>,
    referral_rate: Decimal,
}

impl ReferralEvaluator {
    pub fn new(repo: Arc<Repository>, referral_rate: Decimal) -> Self {
        Self {
            repo,
            referral_rate,
        }
    }

    /// Evaluate the one-time referral commission after a completed deposit.
    ///
    /// At most one bonus is ever paid per referred user: the
    /// `referral_bonus_paid` flag is checked-and-set in the same transaction
    /// that credits the referrer. Stale referral data (missing referrer) is
    /// a silent no-op so the deposit itself is never affected.
    pub async fn on_deposit_completed(
        &self,
        user_id: &UserId,
        deposit_amount: Amount,
    ) -> Result<ReferralOutcome, sqlx::Error> {
        let bonus = engine::referral_bonus(deposit_amount, self.referral_rate);
        if !bonus.is_positive() {
            debug!(user = %user_id, "referral bonus rounds to zero, skipped");
            return Ok(ReferralOutcome::NoReferrer);
        }

        let outcome = self.repo.pay_referral_bonus_atomic(user_id, bonus).await?;
        match &outcome {
            ReferralOutcome::Paid {
                referrer, bonus, ..
            } => {
                info!(
                    referred = %user_id,
                    referrer = %referrer,
                    bonus = bonus.as_minor_units(),
                    "referral commission paid"
                );
            }
            ReferralOutcome::AlreadyPaid => {
                debug!(referred = %user_id, "referral bonus already paid, no-op");
            }
            ReferralOutcome::NoReferrer => {}
            ReferralOutcome::ReferrerMissing => {
                debug!(referred = %user_id, "referrer account missing, bonus skipped");
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::domain::{EntryKind, LedgerEntry, UserAccount};
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn setup() -> (ReferralEvaluator, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));
        let evaluator =
            ReferralEvaluator::new(repo.clone(), Decimal::from_str("0.05").unwrap());
        (evaluator, repo, temp_dir)
    }

    #[tokio::test]
    async fn test_first_deposit_pays_five_percent() {
        let (evaluator, repo, _temp) = setup().await;

        let referrer = UserId::new("ref".to_string());
        repo.insert_account(&UserAccount::new(referrer.clone(), "REF".to_string(), None))
            .await
            .unwrap();

        let referred = UserId::new("u1".to_string());
        repo.insert_account(&UserAccount::new(
            referred.clone(),
            "U1".to_string(),
            Some(referrer.clone()),
        ))
        .await
        .unwrap();

        let outcome = evaluator
            .on_deposit_completed(&referred, Amount::new(1000))
            .await
            .unwrap();
        assert!(matches!(outcome, ReferralOutcome::Paid { .. }));
        assert_eq!(
            repo.get_balance(&referrer).await.unwrap(),
            Some(Amount::new(50))
        );

        let entries = repo.query_entries_for_user(&referrer, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::ReferralBonus);
    }

    #[tokio::test]
    async fn test_second_deposit_pays_nothing() {
        let (evaluator, repo, _temp) = setup().await;

        let referrer = UserId::new("ref".to_string());
        repo.insert_account(&UserAccount::new(referrer.clone(), "REF".to_string(), None))
            .await
            .unwrap();
        let referred = UserId::new("u1".to_string());
        repo.insert_account(&UserAccount::new(
            referred.clone(),
            "U1".to_string(),
            Some(referrer.clone()),
        ))
        .await
        .unwrap();

        evaluator
            .on_deposit_completed(&referred, Amount::new(1000))
            .await
            .unwrap();
        let second = evaluator
            .on_deposit_completed(&referred, Amount::new(5000))
            .await
            .unwrap();
        assert_eq!(second, ReferralOutcome::AlreadyPaid);
        assert_eq!(
            repo.get_balance(&referrer).await.unwrap(),
            Some(Amount::new(50))
        );
    }

    #[tokio::test]
    async fn test_tiny_deposit_rounds_to_zero_and_keeps_flag() {
        let (evaluator, repo, _temp) = setup().await;

        let referrer = UserId::new("ref".to_string());
        repo.insert_account(&UserAccount::new(referrer.clone(), "REF".to_string(), None))
            .await
            .unwrap();
        let referred = UserId::new("u1".to_string());
        repo.insert_account(&UserAccount::new(
            referred.clone(),
            "U1".to_string(),
            Some(referrer.clone()),
        ))
        .await
        .unwrap();

        // 10 * 0.05 = 0.5 -> 0: skipped, flag untouched.
        evaluator
            .on_deposit_completed(&referred, Amount::new(10))
            .await
            .unwrap();
        let account = repo.get_account(&referred).await.unwrap().unwrap();
        assert!(!account.referral_bonus_paid);

        // A later qualifying deposit still pays.
        let outcome = evaluator
            .on_deposit_completed(&referred, Amount::new(1000))
            .await
            .unwrap();
        assert!(matches!(outcome, ReferralOutcome::Paid { .. }));
    }

    #[tokio::test]
    async fn test_deposit_unaffected_when_referrer_gone() {
        let (evaluator, repo, _temp) = setup().await;

        let referred = UserId::new("u1".to_string());
        repo.insert_account(&UserAccount::new(
            referred.clone(),
            "U1".to_string(),
            Some(UserId::new("ghost".to_string())),
        ))
        .await
        .unwrap();
        let deposit = LedgerEntry::pending(
            referred.clone(),
            Amount::new(1000),
            EntryKind::Deposit,
            None,
        );
        repo.insert_and_apply_entry(&deposit).await.unwrap();

        let outcome = evaluator
            .on_deposit_completed(&referred, Amount::new(1000))
            .await
            .unwrap();
        assert_eq!(outcome, ReferralOutcome::ReferrerMissing);

        // The referred user's own deposit stands.
        assert_eq!(
            repo.get_balance(&referred).await.unwrap(),
            Some(Amount::new(1000))
        );
    }
}

//! The ledger service: the only component permitted to mutate balances.
//!
//! All mutation paths (direct application here, and the composite
//! transactions in the arena services) share the repository's single
//! ledger-application primitive; this service is the front door for the
//! standalone operations and wallet reads.

use crate::db::repo::ApplyOutcome;
use crate::db::Repository;
use crate::domain::{Amount, EntryKind, LedgerEntry, UserAccount, UserId};
use std::sync::Arc;
use tracing::{info, warn};

/// A wallet read: balance, recent history, and the conservation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletView {
    pub account: UserAccount,
    pub entries: Vec<LedgerEntry>,
    /// Sum of all completed entries; always equals the balance unless the
    /// store has been tampered with out-of-band.
    pub ledger_total: Amount,
}

#[derive(Clone)]
pub struct LedgerService {
    repo: Arc<Repository>,
}

impl LedgerService {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Apply a pending entry to its account, at most once.
    pub async fn apply(&self, entry_id: &str) -> Result<ApplyOutcome, sqlx::Error> {
        let outcome = self.repo.apply_pending_entry(entry_id).await?;
        match &outcome {
            ApplyOutcome::Applied { new_balance } => {
                info!(entry_id, balance = new_balance.as_minor_units(), "ledger entry applied");
            }
            ApplyOutcome::AlreadySettled => {
                info!(entry_id, "ledger entry already settled, no-op");
            }
            ApplyOutcome::AccountMissing | ApplyOutcome::InsufficientBalance => {
                warn!(entry_id, ?outcome, "ledger entry rejected");
            }
        }
        Ok(outcome)
    }

    /// Operator balance adjustment, recorded as an admin-credit or
    /// admin-debit entry.
    pub async fn admin_adjust(
        &self,
        user_id: &UserId,
        amount: Amount,
    ) -> Result<(LedgerEntry, ApplyOutcome), sqlx::Error> {
        let kind = if amount.is_negative() {
            EntryKind::AdminDebit
        } else {
            EntryKind::AdminCredit
        };
        let entry = LedgerEntry::pending(user_id.clone(), amount, kind, None);
        let outcome = self.repo.insert_and_apply_entry(&entry).await?;
        info!(
            user = %user_id,
            amount = amount.as_minor_units(),
            ?outcome,
            "admin balance adjustment"
        );
        Ok((entry, outcome))
    }

    /// Balance plus recent ledger history for a user.
    pub async fn wallet_view(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> Result<Option<WalletView>, sqlx::Error> {
        let Some(account) = self.repo.get_account(user_id).await? else {
            return Ok(None);
        };

        let entries = self.repo.query_entries_for_user(user_id, limit).await?;
        let ledger_total = self.repo.sum_completed_for_user(user_id).await?;

        if ledger_total != account.wallet_balance {
            warn!(
                user = %user_id,
                balance = account.wallet_balance.as_minor_units(),
                ledger_total = ledger_total.as_minor_units(),
                "wallet balance diverged from completed ledger sum"
            );
        }

        Ok(Some(WalletView {
            account,
            entries,
            ledger_total,
        }))
    }
}

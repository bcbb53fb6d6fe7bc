//! Deposit/withdrawal request flows and the referral bonus transaction.

use crate::domain::{
    Amount, DepositRequest, EntryKind, LedgerEntry, RequestStatus, TimeMs, UserId,
    WithdrawalRequest,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::ledger::{apply_entry_steps, insert_entry};
use super::{decode_err, ApplyOutcome, Repository};

/// Result of an admin decision on a deposit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositDecision {
    /// Request approved; deposit entry applied.
    Approved {
        user_id: UserId,
        amount: Amount,
        entry_id: String,
        new_balance: Amount,
    },
    /// Request rejected; no ledger activity.
    Rejected,
    /// Request was already decided; nothing changed.
    AlreadyDecided,
    /// No such request.
    RequestMissing,
    /// Target account vanished; transaction rolled back.
    AccountMissing,
}

/// Result of creating a withdrawal request (the hold).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalOutcome {
    /// Hold applied and request created.
    Created(WithdrawalRequest),
    /// Balance cannot cover the hold; the failed entry is kept for review.
    InsufficientFunds { entry_id: String },
    /// No such account; the failed entry is kept for review.
    AccountMissing { entry_id: String },
}

/// Result of an admin decision on a withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalDecision {
    /// Funds were already held; nothing further moves.
    Approved,
    /// Hold refunded through a refund entry.
    Rejected {
        refund_entry_id: String,
        new_balance: Amount,
    },
    /// Request was already decided; nothing changed.
    AlreadyDecided,
    /// No such request.
    RequestMissing,
    /// Refund could not be applied; transaction rolled back.
    RefundFailed,
}

/// Result of evaluating the one-time referral commission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralOutcome {
    /// Bonus credited to the referrer and the flag set.
    Paid {
        referrer: UserId,
        bonus: Amount,
        entry_id: String,
    },
    /// Flag already set; nothing changed.
    AlreadyPaid,
    /// The user has no referrer (or no account); nothing to do.
    NoReferrer,
    /// Referral data is stale: referrer account gone. Silent no-op, the
    /// flag stays unset.
    ReferrerMissing,
}

impl Repository {
    /// Insert a deposit request idempotently on its event key.
    ///
    /// Returns false if a request with the same key already exists.
    pub async fn insert_deposit_request(
        &self,
        request: &DepositRequest,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO deposit_requests (
                id, event_key, user_id, amount, external_ref, status,
                created_at, decided_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(event_key) DO NOTHING
            "#,
        )
        .bind(&request.id)
        .bind(&request.event_key)
        .bind(request.user_id.as_str())
        .bind(request.amount.as_minor_units())
        .bind(request.external_ref.as_deref())
        .bind(request.status.as_str())
        .bind(request.created_at.as_ms())
        .bind(request.decided_at.map(|t| t.as_ms()))
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch a deposit request by id.
    pub async fn get_deposit_request(
        &self,
        request_id: &str,
    ) -> Result<Option<DepositRequest>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, event_key, user_id, amount, external_ref, status,
                   created_at, decided_at
            FROM deposit_requests
            WHERE id = ?
            "#,
        )
        .bind(request_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(map_deposit_request_row).transpose()
    }

    /// Fetch a deposit request by its idempotency key.
    pub async fn get_deposit_request_by_event_key(
        &self,
        event_key: &str,
    ) -> Result<Option<DepositRequest>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, event_key, user_id, amount, external_ref, status,
                   created_at, decided_at
            FROM deposit_requests
            WHERE event_key = ?
            "#,
        )
        .bind(event_key)
        .fetch_optional(self.pool())
        .await?;

        row.map(map_deposit_request_row).transpose()
    }

    /// Approve a pending deposit: flip the request and apply the credit in
    /// one transaction.
    pub async fn approve_deposit_atomic(
        &self,
        request_id: &str,
    ) -> Result<DepositDecision, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let claimed = sqlx::query(
            r#"
            UPDATE deposit_requests
            SET status = 'approved', decided_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(TimeMs::now().as_ms())
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            return Ok(self.decide_request_miss(request_id).await?);
        }

        let row = sqlx::query("SELECT user_id, amount FROM deposit_requests WHERE id = ?")
            .bind(request_id)
            .fetch_one(&mut *tx)
            .await?;
        let user_id = UserId::new(row.get::<String, _>("user_id"));
        let amount = Amount::new(row.get::<i64, _>("amount"));

        let entry = LedgerEntry::pending(user_id.clone(), amount, EntryKind::Deposit, None);
        insert_entry(&mut tx, &entry).await?;
        let outcome = apply_entry_steps(&mut tx, &entry.id, &user_id, entry.amount).await?;
        let new_balance = match outcome {
            ApplyOutcome::Applied { new_balance } => new_balance,
            _ => return Ok(DepositDecision::AccountMissing),
        };

        tx.commit().await?;

        Ok(DepositDecision::Approved {
            user_id,
            amount,
            entry_id: entry.id,
            new_balance,
        })
    }

    /// Reject a pending deposit. No ledger activity.
    pub async fn reject_deposit_atomic(
        &self,
        request_id: &str,
    ) -> Result<DepositDecision, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE deposit_requests
            SET status = 'rejected', decided_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(TimeMs::now().as_ms())
        .bind(request_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(self.decide_request_miss(request_id).await?);
        }
        Ok(DepositDecision::Rejected)
    }

    /// Create a withdrawal request, holding the amount via a debit entry.
    ///
    /// On a failed guard the entry is committed as `failed` (inspectable)
    /// and no request row is created.
    pub async fn create_withdrawal_atomic(
        &self,
        user_id: &UserId,
        amount: Amount,
    ) -> Result<WithdrawalOutcome, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let hold = LedgerEntry::pending(
            user_id.clone(),
            amount.negated(),
            EntryKind::Withdrawal,
            None,
        );
        insert_entry(&mut tx, &hold).await?;
        let outcome = apply_entry_steps(&mut tx, &hold.id, user_id, hold.amount).await?;

        match outcome {
            ApplyOutcome::Applied { .. } => {}
            ApplyOutcome::InsufficientBalance => {
                tx.commit().await?;
                return Ok(WithdrawalOutcome::InsufficientFunds { entry_id: hold.id });
            }
            ApplyOutcome::AccountMissing | ApplyOutcome::AlreadySettled => {
                tx.commit().await?;
                return Ok(WithdrawalOutcome::AccountMissing { entry_id: hold.id });
            }
        }

        let request = WithdrawalRequest {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.clone(),
            amount,
            hold_entry_id: hold.id.clone(),
            status: RequestStatus::Pending,
            created_at: TimeMs::now(),
            decided_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO withdrawal_requests (
                id, user_id, amount, hold_entry_id, status, created_at, decided_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(request.user_id.as_str())
        .bind(request.amount.as_minor_units())
        .bind(&request.hold_entry_id)
        .bind(request.status.as_str())
        .bind(request.created_at.as_ms())
        .bind(request.decided_at.map(|t| t.as_ms()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(WithdrawalOutcome::Created(request))
    }

    /// Fetch a withdrawal request by id.
    pub async fn get_withdrawal_request(
        &self,
        request_id: &str,
    ) -> Result<Option<WithdrawalRequest>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, amount, hold_entry_id, status, created_at, decided_at
            FROM withdrawal_requests
            WHERE id = ?
            "#,
        )
        .bind(request_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| {
            let status_str: String = r.get("status");
            let status = RequestStatus::parse(&status_str)
                .ok_or_else(|| decode_err("status", &status_str))?;
            Ok(WithdrawalRequest {
                id: r.get("id"),
                user_id: UserId::new(r.get::<String, _>("user_id")),
                amount: Amount::new(r.get::<i64, _>("amount")),
                hold_entry_id: r.get("hold_entry_id"),
                status,
                created_at: TimeMs::new(r.get::<i64, _>("created_at")),
                decided_at: r.get::<Option<i64>, _>("decided_at").map(TimeMs::new),
            })
        })
        .transpose()
    }

    /// Approve a pending withdrawal. The hold already moved the funds.
    pub async fn approve_withdrawal_atomic(
        &self,
        request_id: &str,
    ) -> Result<WithdrawalDecision, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE withdrawal_requests
            SET status = 'approved', decided_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(TimeMs::now().as_ms())
        .bind(request_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM withdrawal_requests WHERE id = ?")
                .bind(request_id)
                .fetch_optional(self.pool())
                .await?;
            return Ok(if exists.is_some() {
                WithdrawalDecision::AlreadyDecided
            } else {
                WithdrawalDecision::RequestMissing
            });
        }
        Ok(WithdrawalDecision::Approved)
    }

    /// Reject a pending withdrawal and refund the held amount, atomically.
    pub async fn reject_withdrawal_atomic(
        &self,
        request_id: &str,
    ) -> Result<WithdrawalDecision, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let claimed = sqlx::query(
            r#"
            UPDATE withdrawal_requests
            SET status = 'rejected', decided_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(TimeMs::now().as_ms())
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM withdrawal_requests WHERE id = ?")
                .bind(request_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Ok(if exists.is_some() {
                WithdrawalDecision::AlreadyDecided
            } else {
                WithdrawalDecision::RequestMissing
            });
        }

        let row = sqlx::query("SELECT user_id, amount FROM withdrawal_requests WHERE id = ?")
            .bind(request_id)
            .fetch_one(&mut *tx)
            .await?;
        let user_id = UserId::new(row.get::<String, _>("user_id"));
        let amount = Amount::new(row.get::<i64, _>("amount"));

        let refund = LedgerEntry::pending(user_id.clone(), amount, EntryKind::Refund, None);
        insert_entry(&mut tx, &refund).await?;
        let outcome = apply_entry_steps(&mut tx, &refund.id, &user_id, refund.amount).await?;
        let new_balance = match outcome {
            ApplyOutcome::Applied { new_balance } => new_balance,
            _ => return Ok(WithdrawalDecision::RefundFailed),
        };

        tx.commit().await?;
        Ok(WithdrawalDecision::Rejected {
            refund_entry_id: refund.id,
            new_balance,
        })
    }

    /// Pay the one-time referral commission for a referred user's first
    /// qualifying deposit, atomically with the check-and-set of the flag.
    pub async fn pay_referral_bonus_atomic(
        &self,
        referred: &UserId,
        bonus: Amount,
    ) -> Result<ReferralOutcome, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query(
            "SELECT referred_by, referral_bonus_paid FROM accounts WHERE id = ?",
        )
        .bind(referred.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(ReferralOutcome::NoReferrer);
        };
        let Some(referrer) = row.get::<Option<String>, _>("referred_by").map(UserId::new) else {
            return Ok(ReferralOutcome::NoReferrer);
        };
        if row.get::<i64, _>("referral_bonus_paid") != 0 {
            return Ok(ReferralOutcome::AlreadyPaid);
        }

        let claimed = sqlx::query(
            "UPDATE accounts SET referral_bonus_paid = 1 WHERE id = ? AND referral_bonus_paid = 0",
        )
        .bind(referred.as_str())
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            return Ok(ReferralOutcome::AlreadyPaid);
        }

        // Stale referral data: drop the transaction so the flag stays unset
        // and the deposit itself is unaffected.
        let referrer_exists = sqlx::query("SELECT 1 FROM accounts WHERE id = ?")
            .bind(referrer.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if referrer_exists.is_none() {
            return Ok(ReferralOutcome::ReferrerMissing);
        }

        let entry = LedgerEntry::pending(referrer.clone(), bonus, EntryKind::ReferralBonus, None);
        insert_entry(&mut tx, &entry).await?;
        let outcome = apply_entry_steps(&mut tx, &entry.id, &referrer, entry.amount).await?;
        if !matches!(outcome, ApplyOutcome::Applied { .. }) {
            return Ok(ReferralOutcome::ReferrerMissing);
        }

        tx.commit().await?;
        Ok(ReferralOutcome::Paid {
            referrer,
            bonus,
            entry_id: entry.id,
        })
    }

    /// Distinguish an already-decided request from a missing one after a
    /// conditional update affected zero rows.
    async fn decide_request_miss(&self, request_id: &str) -> Result<DepositDecision, sqlx::Error> {
        let exists = sqlx::query("SELECT 1 FROM deposit_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(if exists.is_some() {
            DepositDecision::AlreadyDecided
        } else {
            DepositDecision::RequestMissing
        })
    }
}

fn map_deposit_request_row(row: SqliteRow) -> Result<DepositRequest, sqlx::Error> {
    let status_str: String = row.get("status");
    let status =
        RequestStatus::parse(&status_str).ok_or_else(|| decode_err("status", &status_str))?;

    Ok(DepositRequest {
        id: row.get("id"),
        event_key: row.get("event_key"),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        amount: Amount::new(row.get::<i64, _>("amount")),
        external_ref: row.get("external_ref"),
        status,
        created_at: TimeMs::new(row.get::<i64, _>("created_at")),
        decided_at: row.get::<Option<i64>, _>("decided_at").map(TimeMs::new),
    })
}

//! Ledger entry operations for the repository.
//!
//! Every wallet balance mutation in the system funnels through
//! `apply_entry_steps`; no other code writes `accounts.wallet_balance`.

use crate::domain::{Amount, EntryKind, EntryStatus, LedgerEntry, MatchId, TimeMs, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{decode_err, Repository};

/// Result of applying one ledger entry to its account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Delta applied; entry is `completed`.
    Applied { new_balance: Amount },
    /// Entry was no longer `pending`; nothing changed.
    AlreadySettled,
    /// Target account does not exist; entry marked `failed`.
    AccountMissing,
    /// Delta would take the balance negative; entry marked `failed`.
    InsufficientBalance,
}

impl Repository {
    /// Insert an entry in `pending` state without applying it.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_pending_entry(&self, entry: &LedgerEntry) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        insert_entry(&mut conn, entry).await
    }

    /// Apply a previously inserted `pending` entry to its account, atomically.
    ///
    /// A stale entry (already `completed` or `failed`) is a safe no-op:
    /// duplicate delivery of the same settlement event must not double-apply.
    pub async fn apply_pending_entry(&self, entry_id: &str) -> Result<ApplyOutcome, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        // Write-first so the transaction holds the write lock from the start.
        let now = TimeMs::now().as_ms();
        let claimed = sqlx::query(
            r#"
            UPDATE ledger_entries
            SET status = 'completed', settled_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(entry_id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            return Ok(ApplyOutcome::AlreadySettled);
        }

        let row = sqlx::query("SELECT user_id, amount FROM ledger_entries WHERE id = ?")
            .bind(entry_id)
            .fetch_one(&mut *tx)
            .await?;
        let user_id = UserId::new(row.get::<String, _>("user_id"));
        let amount = Amount::new(row.get::<i64, _>("amount"));

        let outcome = apply_claimed_entry(&mut tx, entry_id, &user_id, amount, now).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Insert an entry and apply it in one transaction.
    ///
    /// On a failed guard (missing account, insufficient balance) the entry is
    /// still committed, marked `failed` with a reason, so the rejection stays
    /// inspectable.
    pub async fn insert_and_apply_entry(
        &self,
        entry: &LedgerEntry,
    ) -> Result<ApplyOutcome, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        insert_entry(&mut tx, entry).await?;
        let outcome = apply_entry_steps(&mut tx, &entry.id, &entry.user_id, entry.amount).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Fetch a single entry by id.
    pub async fn get_entry(&self, entry_id: &str) -> Result<Option<LedgerEntry>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, amount, kind, status, related_match_id, reason,
                   created_at, settled_at
            FROM ledger_entries
            WHERE id = ?
            "#,
        )
        .bind(entry_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(map_entry_row).transpose()
    }

    /// Ledger history for a user, newest first.
    pub async fn query_entries_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, amount, kind, status, related_match_id, reason,
                   created_at, settled_at
            FROM ledger_entries
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id.as_str())
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(map_entry_row).collect()
    }

    /// Sum of all `completed` entry amounts for a user.
    ///
    /// The primary correctness property of the core is that this always
    /// equals the account's `wallet_balance`.
    pub async fn sum_completed_for_user(&self, user_id: &UserId) -> Result<Amount, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount), 0) AS total
            FROM ledger_entries
            WHERE user_id = ? AND status = 'completed'
            "#,
        )
        .bind(user_id.as_str())
        .fetch_one(self.pool())
        .await?;

        Ok(Amount::new(row.get::<i64, _>("total")))
    }

    /// Sum of completed winnings credits for a user (leaderboard metric).
    pub async fn sum_winnings_for_user(&self, user_id: &UserId) -> Result<Amount, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount), 0) AS total
            FROM ledger_entries
            WHERE user_id = ? AND kind = 'winnings' AND status = 'completed'
            "#,
        )
        .bind(user_id.as_str())
        .fetch_one(self.pool())
        .await?;

        Ok(Amount::new(row.get::<i64, _>("total")))
    }
}

/// Insert an entry row in its current state.
pub(crate) async fn insert_entry(
    conn: &mut SqliteConnection,
    entry: &LedgerEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO ledger_entries (
            id, user_id, amount, kind, status, related_match_id, reason,
            created_at, settled_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.id)
    .bind(entry.user_id.as_str())
    .bind(entry.amount.as_minor_units())
    .bind(entry.kind.as_str())
    .bind(entry.status.as_str())
    .bind(entry.related_match_id.as_ref().map(|m| m.as_str().to_string()))
    .bind(entry.reason.as_deref())
    .bind(entry.created_at.as_ms())
    .bind(entry.settled_at.map(|t| t.as_ms()))
    .execute(conn)
    .await?;

    Ok(())
}

/// The guarded settle-and-apply steps, run inside the caller's transaction.
///
/// Claims the entry with a conditional update (zero rows affected means a
/// concurrent application won, which is a safe no-op), then applies the
/// delta with the non-negativity guard. Failed guards settle the entry as
/// `failed` with a reason instead of dropping it.
pub(crate) async fn apply_entry_steps(
    conn: &mut SqliteConnection,
    entry_id: &str,
    user_id: &UserId,
    amount: Amount,
) -> Result<ApplyOutcome, sqlx::Error> {
    let now = TimeMs::now().as_ms();

    let claimed = sqlx::query(
        r#"
        UPDATE ledger_entries
        SET status = 'completed', settled_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(now)
    .bind(entry_id)
    .execute(&mut *conn)
    .await?;

    if claimed.rows_affected() == 0 {
        return Ok(ApplyOutcome::AlreadySettled);
    }

    apply_claimed_entry(conn, entry_id, user_id, amount, now).await
}

/// Post-claim guard and balance update, shared by both application paths.
async fn apply_claimed_entry(
    conn: &mut SqliteConnection,
    entry_id: &str,
    user_id: &UserId,
    amount: Amount,
    now: i64,
) -> Result<ApplyOutcome, sqlx::Error> {
    let account = sqlx::query("SELECT wallet_balance FROM accounts WHERE id = ?")
        .bind(user_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    let Some(account) = account else {
        settle_failed(conn, entry_id, "account not found", now).await?;
        return Ok(ApplyOutcome::AccountMissing);
    };

    let balance = Amount::new(account.get::<i64, _>("wallet_balance"));
    let new_balance = match balance.checked_add(amount) {
        Some(b) if !b.is_negative() => b,
        _ => {
            settle_failed(conn, entry_id, "insufficient balance", now).await?;
            return Ok(ApplyOutcome::InsufficientBalance);
        }
    };

    sqlx::query("UPDATE accounts SET wallet_balance = ? WHERE id = ?")
        .bind(new_balance.as_minor_units())
        .bind(user_id.as_str())
        .execute(&mut *conn)
        .await?;

    Ok(ApplyOutcome::Applied { new_balance })
}

async fn settle_failed(
    conn: &mut SqliteConnection,
    entry_id: &str,
    reason: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE ledger_entries
        SET status = 'failed', reason = ?, settled_at = ?
        WHERE id = ?
        "#,
    )
    .bind(reason)
    .bind(now)
    .bind(entry_id)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) fn map_entry_row(row: SqliteRow) -> Result<LedgerEntry, sqlx::Error> {
    let kind_str: String = row.get("kind");
    let kind = EntryKind::parse(&kind_str).ok_or_else(|| decode_err("kind", &kind_str))?;
    let status_str: String = row.get("status");
    let status =
        EntryStatus::parse(&status_str).ok_or_else(|| decode_err("status", &status_str))?;

    Ok(LedgerEntry {
        id: row.get("id"),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        amount: Amount::new(row.get::<i64, _>("amount")),
        kind,
        status,
        related_match_id: row
            .get::<Option<String>, _>("related_match_id")
            .map(MatchId::new),
        reason: row.get("reason"),
        created_at: TimeMs::new(row.get::<i64, _>("created_at")),
        settled_at: row.get::<Option<i64>, _>("settled_at").map(TimeMs::new),
    })
}

//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `ledger.rs` - Ledger entry application (the sole balance mutator)
//! - `matchmaking.rs` - Queue entries and the atomic pairing transaction
//! - `matches.rs` - Match state transitions, submissions, payout, stats
//! - `requests.rs` - Deposit/withdrawal request flows

mod ledger;
mod matches;
mod matchmaking;
mod requests;

use crate::domain::{Amount, MatchId, TimeMs, UserAccount, UserId};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

pub use ledger::ApplyOutcome;
pub use matches::{CancelOutcome, PayoutOutcome};
pub use matchmaking::PairingOutcome;
pub use requests::{DepositDecision, ReferralOutcome, WithdrawalDecision, WithdrawalOutcome};

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Account operations
    // =========================================================================

    /// Insert an account idempotently. Returns false if the id is taken.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_account(&self, account: &UserAccount) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (
                id, display_name, wallet_balance, referred_by, referral_bonus_paid,
                active_match_id, matches_played, matches_won, rating, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.display_name)
        .bind(account.wallet_balance.as_minor_units())
        .bind(account.referred_by.as_ref().map(|u| u.as_str().to_string()))
        .bind(account.referral_bonus_paid as i64)
        .bind(account.active_match_id.as_ref().map(|m| m.as_str().to_string()))
        .bind(account.matches_played)
        .bind(account.matches_won)
        .bind(account.rating)
        .bind(account.created_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch an account by id.
    pub async fn get_account(&self, user_id: &UserId) -> Result<Option<UserAccount>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, display_name, wallet_balance, referred_by, referral_bonus_paid,
                   active_match_id, matches_played, matches_won, rating, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(map_account_row))
    }

    /// Current wallet balance for a user, if the account exists.
    pub async fn get_balance(&self, user_id: &UserId) -> Result<Option<Amount>, sqlx::Error> {
        let row = sqlx::query("SELECT wallet_balance FROM accounts WHERE id = ?")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Amount::new(r.get::<i64, _>("wallet_balance"))))
    }

    /// Accounts ranked by rating, then wins, for the leaderboard.
    pub async fn top_accounts_by_rating(
        &self,
        limit: i64,
    ) -> Result<Vec<UserAccount>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, display_name, wallet_balance, referred_by, referral_bonus_paid,
                   active_match_id, matches_played, matches_won, rating, created_at
            FROM accounts
            ORDER BY rating DESC, matches_won DESC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(map_account_row).collect())
    }
}

pub(crate) fn map_account_row(row: SqliteRow) -> UserAccount {
    UserAccount {
        id: UserId::new(row.get::<String, _>("id")),
        display_name: row.get("display_name"),
        wallet_balance: Amount::new(row.get::<i64, _>("wallet_balance")),
        referred_by: row
            .get::<Option<String>, _>("referred_by")
            .map(UserId::new),
        referral_bonus_paid: row.get::<i64, _>("referral_bonus_paid") != 0,
        active_match_id: row
            .get::<Option<String>, _>("active_match_id")
            .map(MatchId::new),
        matches_played: row.get("matches_played"),
        matches_won: row.get("matches_won"),
        rating: row.get("rating"),
        created_at: TimeMs::new(row.get::<i64, _>("created_at")),
    }
}

/// Build a decode error for a status/kind string the schema should never hold.
pub(crate) fn decode_err(column: &str, value: &str) -> sqlx::Error {
    sqlx::Error::Decode(format!("unrecognized {} value: {}", column, value).into())
}

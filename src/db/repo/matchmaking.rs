//! Queue entry operations and the atomic pairing transaction.

use crate::domain::{
    Amount, EntryKind, LedgerEntry, Match, MatchId, MatchStatus, QueueEntry, QueueStatus, TimeMs,
    UserId,
};
use sqlx::Row;

use super::ledger::{apply_entry_steps, insert_entry};
use super::{decode_err, ApplyOutcome, Repository};

/// Result of one pairing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingOutcome {
    /// Both entries consumed; match and entry-fee debits committed.
    Paired(Match),
    /// One of the entries was no longer `waiting` (consumed or cancelled by
    /// a concurrent invocation); nothing changed.
    StaleEntry,
    /// A player could not afford the stake; the transaction was rolled back
    /// and both entries remain `waiting`.
    InsufficientFunds(UserId),
}

impl Repository {
    /// Insert a queue entry. Returns false if the user is already queued.
    ///
    /// The user id is the primary key, which enforces the at-most-one-entry
    /// invariant at the storage layer.
    pub async fn insert_queue_entry(&self, entry: &QueueEntry) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO queue_entries (user_id, stake_tier, status, joined_at, display_name)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(entry.user_id.as_str())
        .bind(entry.stake_tier.as_minor_units())
        .bind(entry.status.as_str())
        .bind(entry.joined_at.as_ms())
        .bind(&entry.display_name)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch a queue entry by user id.
    pub async fn get_queue_entry(
        &self,
        user_id: &UserId,
    ) -> Result<Option<QueueEntry>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT user_id, stake_tier, status, joined_at, display_name
            FROM queue_entries
            WHERE user_id = ?
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| {
            let status_str: String = r.get("status");
            let status = QueueStatus::parse(&status_str)
                .ok_or_else(|| decode_err("status", &status_str))?;
            Ok(QueueEntry {
                user_id: UserId::new(r.get::<String, _>("user_id")),
                stake_tier: Amount::new(r.get::<i64, _>("stake_tier")),
                status,
                joined_at: TimeMs::new(r.get::<i64, _>("joined_at")),
                display_name: r.get("display_name"),
            })
        })
        .transpose()
    }

    /// Delete a still-waiting entry (player cancellation).
    ///
    /// Returns false when there was nothing to cancel: the entry is gone or
    /// already consumed by the pairer, which won the race.
    pub async fn delete_waiting_entry(&self, user_id: &UserId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM queue_entries WHERE user_id = ? AND status = 'waiting'")
                .bind(user_id.as_str())
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Oldest waiting opponent at the same stake tier, excluding the caller.
    pub async fn find_waiting_opponent(
        &self,
        stake_tier: Amount,
        exclude: &UserId,
    ) -> Result<Option<UserId>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT user_id
            FROM queue_entries
            WHERE stake_tier = ? AND status = 'waiting' AND user_id != ?
            ORDER BY joined_at ASC, user_id ASC
            LIMIT 1
            "#,
        )
        .bind(stake_tier.as_minor_units())
        .bind(exclude.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| UserId::new(r.get::<String, _>("user_id"))))
    }

    /// Convert two waiting entries into one match, atomically.
    ///
    /// Within a single transaction: both entries are claimed with conditional
    /// updates (a concurrent pairing or cancellation makes the claim fail and
    /// the whole operation a no-op), the match and both entry-fee debits are
    /// written through the ledger primitive, both accounts are attached to
    /// the match, and both queue entries are deleted. An unaffordable stake
    /// rolls everything back, leaving both entries `waiting`.
    pub async fn pair_players_atomic(
        &self,
        stake_tier: Amount,
        first: &UserId,
        second: &UserId,
        prize_pool: Amount,
    ) -> Result<PairingOutcome, sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        let now = TimeMs::now();

        for user in [first, second] {
            let claimed = sqlx::query(
                r#"
                UPDATE queue_entries
                SET status = 'matched'
                WHERE user_id = ? AND stake_tier = ? AND status = 'waiting'
                "#,
            )
            .bind(user.as_str())
            .bind(stake_tier.as_minor_units())
            .execute(&mut *tx)
            .await?;

            if claimed.rows_affected() == 0 {
                return Ok(PairingOutcome::StaleEntry);
            }
        }

        let match_id = MatchId::generate();
        sqlx::query(
            r#"
            INSERT INTO matches (
                id, stake_tier, prize_pool, status, winner_id, prize_distributed,
                dispute_reason, created_at, resolved_at
            ) VALUES (?, ?, ?, ?, NULL, 0, NULL, ?, NULL)
            "#,
        )
        .bind(match_id.as_str())
        .bind(stake_tier.as_minor_units())
        .bind(prize_pool.as_minor_units())
        .bind(MatchStatus::Ongoing.as_str())
        .bind(now.as_ms())
        .execute(&mut *tx)
        .await?;

        for (seat, user) in [first, second].into_iter().enumerate() {
            sqlx::query("INSERT INTO match_players (match_id, user_id, seat) VALUES (?, ?, ?)")
                .bind(match_id.as_str())
                .bind(user.as_str())
                .bind(seat as i64)
                .execute(&mut *tx)
                .await?;

            let fee = LedgerEntry::pending(
                user.clone(),
                stake_tier.negated(),
                EntryKind::EntryFee,
                Some(match_id.clone()),
            );
            insert_entry(&mut tx, &fee).await?;
            let outcome = apply_entry_steps(&mut tx, &fee.id, user, fee.amount).await?;
            if !matches!(outcome, ApplyOutcome::Applied { .. }) {
                // Rolls back the claims too; both entries stay waiting.
                return Ok(PairingOutcome::InsufficientFunds(user.clone()));
            }

            sqlx::query("UPDATE accounts SET active_match_id = ? WHERE id = ?")
                .bind(match_id.as_str())
                .bind(user.as_str())
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM queue_entries WHERE user_id IN (?, ?)")
            .bind(first.as_str())
            .bind(second.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(PairingOutcome::Paired(Match {
            id: match_id,
            stake_tier,
            prize_pool,
            player_ids: vec![first.clone(), second.clone()],
            status: MatchStatus::Ongoing,
            winner_id: None,
            prize_distributed: false,
            dispute_reason: None,
            created_at: now,
            resolved_at: None,
        }))
    }
}

//! Match state, result submissions, payout and cancellation transactions.

use crate::domain::{
    Amount, ClaimedStatus, EntryKind, LedgerEntry, Match, MatchId, MatchStatus, ResultSubmission,
    TimeMs, UserId,
};
use sqlx::Row;

use super::ledger::{apply_entry_steps, insert_entry};
use super::{decode_err, ApplyOutcome, Repository};

/// Result of a prize distribution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutOutcome {
    /// The single winnings entry was issued.
    Paid {
        winner: UserId,
        amount: Amount,
        new_balance: Amount,
    },
    /// The write-once flag was already set; nothing changed.
    AlreadyDistributed,
    /// Match is not `completed` with a winner.
    NotEligible,
    /// No such match.
    MatchMissing,
    /// Winner account vanished; transaction rolled back for operator review.
    WinnerAccountMissing,
}

/// Result of an admin match cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Match cancelled; entry fees refunded to these players.
    Cancelled { refunded: Vec<UserId> },
    /// Match was already terminal.
    NotCancellable,
    /// No such match.
    MatchMissing,
    /// A refund could not be applied; transaction rolled back.
    RefundFailed(UserId),
}

impl Repository {
    /// Fetch a match with its seated players.
    pub async fn get_match(&self, match_id: &MatchId) -> Result<Option<Match>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, stake_tier, prize_pool, status, winner_id, prize_distributed,
                   dispute_reason, created_at, resolved_at
            FROM matches
            WHERE id = ?
            "#,
        )
        .bind(match_id.as_str())
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let players = sqlx::query(
            "SELECT user_id FROM match_players WHERE match_id = ? ORDER BY seat ASC",
        )
        .bind(match_id.as_str())
        .fetch_all(self.pool())
        .await?;

        let status_str: String = row.get("status");
        let status =
            MatchStatus::parse(&status_str).ok_or_else(|| decode_err("status", &status_str))?;

        Ok(Some(Match {
            id: MatchId::new(row.get::<String, _>("id")),
            stake_tier: Amount::new(row.get::<i64, _>("stake_tier")),
            prize_pool: Amount::new(row.get::<i64, _>("prize_pool")),
            player_ids: players
                .into_iter()
                .map(|r| UserId::new(r.get::<String, _>("user_id")))
                .collect(),
            status,
            winner_id: row.get::<Option<String>, _>("winner_id").map(UserId::new),
            prize_distributed: row.get::<i64, _>("prize_distributed") != 0,
            dispute_reason: row.get("dispute_reason"),
            created_at: TimeMs::new(row.get::<i64, _>("created_at")),
            resolved_at: row.get::<Option<i64>, _>("resolved_at").map(TimeMs::new),
        }))
    }

    /// Insert a result submission. Returns false if this player already
    /// submitted for this match; the first submission is immutable.
    pub async fn insert_submission(
        &self,
        submission: &ResultSubmission,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO result_submissions (
                match_id, user_id, claimed_position, claimed_status,
                screenshot_ref, submitted_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(match_id, user_id) DO NOTHING
            "#,
        )
        .bind(submission.match_id.as_str())
        .bind(submission.user_id.as_str())
        .bind(submission.claimed_position)
        .bind(submission.claimed_status.as_str())
        .bind(&submission.screenshot_ref)
        .bind(submission.submitted_at.as_ms())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All submissions for a match, in deterministic order.
    pub async fn list_submissions(
        &self,
        match_id: &MatchId,
    ) -> Result<Vec<ResultSubmission>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT match_id, user_id, claimed_position, claimed_status,
                   screenshot_ref, submitted_at
            FROM result_submissions
            WHERE match_id = ?
            ORDER BY user_id ASC
            "#,
        )
        .bind(match_id.as_str())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|r| {
                let status_str: String = r.get("claimed_status");
                let claimed_status = ClaimedStatus::parse(&status_str)
                    .ok_or_else(|| decode_err("claimed_status", &status_str))?;
                Ok(ResultSubmission {
                    match_id: MatchId::new(r.get::<String, _>("match_id")),
                    user_id: UserId::new(r.get::<String, _>("user_id")),
                    claimed_position: r.get("claimed_position"),
                    claimed_status,
                    screenshot_ref: r.get("screenshot_ref"),
                    submitted_at: TimeMs::new(r.get::<i64, _>("submitted_at")),
                })
            })
            .collect()
    }

    /// Conditionally transition a match.
    ///
    /// The update is gated on the current status being one of `from`; zero
    /// rows affected means a concurrent transition won and the caller must
    /// treat the attempt as a no-op.
    pub async fn transition_match(
        &self,
        match_id: &MatchId,
        from: &[MatchStatus],
        to: MatchStatus,
        winner: Option<&UserId>,
        dispute_reason: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        debug_assert!(from.iter().all(|f| f.can_transition_to(to)));

        let placeholders = vec!["?"; from.len()].join(", ");
        let sql = format!(
            r#"
            UPDATE matches
            SET status = ?, winner_id = COALESCE(?, winner_id),
                dispute_reason = COALESCE(?, dispute_reason), resolved_at = ?
            WHERE id = ? AND status IN ({})
            "#,
            placeholders
        );

        let resolved_at = to.is_terminal().then(|| TimeMs::now().as_ms());

        let mut query = sqlx::query(&sql)
            .bind(to.as_str())
            .bind(winner.map(|w| w.as_str().to_string()))
            .bind(dispute_reason)
            .bind(resolved_at)
            .bind(match_id.as_str());
        for f in from {
            query = query.bind(f.as_str());
        }

        let result = query.execute(self.pool()).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Issue the winner's payout exactly once.
    ///
    /// The write-once `prize_distributed` flag and the winnings entry are
    /// committed in the same transaction; duplicate invocations observe the
    /// flag and no-op.
    pub async fn distribute_prize_atomic(
        &self,
        match_id: &MatchId,
    ) -> Result<PayoutOutcome, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query(
            "SELECT status, winner_id, prize_pool FROM matches WHERE id = ?",
        )
        .bind(match_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(PayoutOutcome::MatchMissing);
        };

        let status: String = row.get("status");
        let winner = row.get::<Option<String>, _>("winner_id").map(UserId::new);
        let prize_pool = Amount::new(row.get::<i64, _>("prize_pool"));

        let Some(winner) = winner else {
            return Ok(PayoutOutcome::NotEligible);
        };
        if status != MatchStatus::Completed.as_str() {
            return Ok(PayoutOutcome::NotEligible);
        }

        let claimed = sqlx::query(
            "UPDATE matches SET prize_distributed = 1 WHERE id = ? AND prize_distributed = 0",
        )
        .bind(match_id.as_str())
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            return Ok(PayoutOutcome::AlreadyDistributed);
        }

        let winnings = LedgerEntry::pending(
            winner.clone(),
            prize_pool,
            EntryKind::Winnings,
            Some(match_id.clone()),
        );
        insert_entry(&mut tx, &winnings).await?;
        let outcome = apply_entry_steps(&mut tx, &winnings.id, &winner, winnings.amount).await?;
        let new_balance = match outcome {
            ApplyOutcome::Applied { new_balance } => new_balance,
            _ => return Ok(PayoutOutcome::WinnerAccountMissing),
        };

        sqlx::query(
            r#"
            UPDATE accounts SET active_match_id = NULL
            WHERE id IN (SELECT user_id FROM match_players WHERE match_id = ?)
            "#,
        )
        .bind(match_id.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PayoutOutcome::Paid {
            winner,
            amount: prize_pool,
            new_balance,
        })
    }

    /// Cancel a non-terminal match and refund collected entry fees.
    pub async fn cancel_match_atomic(
        &self,
        match_id: &MatchId,
    ) -> Result<CancelOutcome, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let exists = sqlx::query("SELECT 1 FROM matches WHERE id = ?")
            .bind(match_id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(CancelOutcome::MatchMissing);
        }

        let claimed = sqlx::query(
            r#"
            UPDATE matches
            SET status = 'cancelled', resolved_at = ?
            WHERE id = ? AND status IN ('open', 'ongoing', 'verification')
            "#,
        )
        .bind(TimeMs::now().as_ms())
        .bind(match_id.as_str())
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            return Ok(CancelOutcome::NotCancellable);
        }

        // Refund exactly what each player paid in: the sum of their completed
        // entry-fee debits for this match.
        let fees = sqlx::query(
            r#"
            SELECT user_id, SUM(amount) AS paid
            FROM ledger_entries
            WHERE related_match_id = ? AND kind = 'entry-fee' AND status = 'completed'
            GROUP BY user_id
            "#,
        )
        .bind(match_id.as_str())
        .fetch_all(&mut *tx)
        .await?;

        let mut refunded = Vec::new();
        for fee in fees {
            let user = UserId::new(fee.get::<String, _>("user_id"));
            let paid = Amount::new(fee.get::<i64, _>("paid"));
            if !paid.is_negative() {
                continue;
            }

            let refund = LedgerEntry::pending(
                user.clone(),
                paid.negated(),
                EntryKind::Refund,
                Some(match_id.clone()),
            );
            insert_entry(&mut tx, &refund).await?;
            let outcome = apply_entry_steps(&mut tx, &refund.id, &user, refund.amount).await?;
            if !matches!(outcome, ApplyOutcome::Applied { .. }) {
                return Ok(CancelOutcome::RefundFailed(user));
            }
            refunded.push(user);
        }

        sqlx::query(
            r#"
            UPDATE accounts SET active_match_id = NULL
            WHERE id IN (SELECT user_id FROM match_players WHERE match_id = ?)
            "#,
        )
        .bind(match_id.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CancelOutcome::Cancelled { refunded })
    }

    /// Post-payout aggregate stats update: played/won counters and rating
    /// deltas, floored at zero. Best-effort from the caller's point of view;
    /// runs in its own transaction.
    pub async fn apply_match_stats(
        &self,
        winner: &UserId,
        losers: &[UserId],
        win_delta: i64,
        loss_delta: i64,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"
            UPDATE accounts
            SET matches_played = matches_played + 1,
                matches_won = matches_won + 1,
                rating = MAX(0, rating + ?)
            WHERE id = ?
            "#,
        )
        .bind(win_delta)
        .bind(winner.as_str())
        .execute(&mut *tx)
        .await?;

        for loser in losers {
            sqlx::query(
                r#"
                UPDATE accounts
                SET matches_played = matches_played + 1,
                    rating = MAX(0, rating + ?)
                WHERE id = ?
                "#,
            )
            .bind(loss_delta)
            .bind(loser.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

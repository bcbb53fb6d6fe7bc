//! Match result reconciler: drives a match to its terminal outcome.

use crate::arena::payout::Distributor;
use crate::db::Repository;
use crate::domain::{
    ClaimedStatus, Match, MatchId, MatchStatus, ResultSubmission, UserId,
};
use crate::engine::reconcile::{decide, Outcome, REASON_SYSTEM_ERROR};
use crate::notify::{Notifier, NotifyEvent};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ResultError {
    #[error("match not found")]
    MatchNotFound,
    #[error("user is not a participant in this match")]
    NotAParticipant,
    #[error("match is already resolved")]
    AlreadyResolved,
    #[error("player already submitted a result")]
    AlreadySubmitted,
    #[error("winner is not a participant in this match")]
    InvalidWinner,
    #[error("prize already distributed")]
    AlreadyDistributed,
    #[error("match is not awaiting review")]
    NotReviewable,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct Reconciler {
    repo: Arc<Repository>,
    distributor: Distributor,
    notifier: Arc<dyn Notifier>,
}

impl Reconciler {
    pub fn new(repo: Arc<Repository>, distributor: Distributor, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repo,
            distributor,
            notifier,
        }
    }

    /// Record a player's result claim and run reconciliation.
    ///
    /// Returns the match as it stands after the attempt.
    pub async fn submit_result(
        &self,
        match_id: &MatchId,
        user_id: &UserId,
        claimed_position: i64,
        claimed_status: ClaimedStatus,
        screenshot_ref: String,
    ) -> Result<Match, ResultError> {
        let m = self
            .repo
            .get_match(match_id)
            .await?
            .ok_or(ResultError::MatchNotFound)?;

        if !m.has_player(user_id) {
            return Err(ResultError::NotAParticipant);
        }
        if m.status.is_terminal() {
            return Err(ResultError::AlreadyResolved);
        }

        let submission = ResultSubmission::new(
            match_id.clone(),
            user_id.clone(),
            claimed_position,
            claimed_status,
            screenshot_ref,
        );
        if !self.repo.insert_submission(&submission).await? {
            return Err(ResultError::AlreadySubmitted);
        }
        info!(match_id = %match_id, user = %user_id, claim = %claimed_status.as_str(), "result submitted");

        // Any internal failure past this point degrades the match to
        // disputed instead of leaving it stuck mid-resolution.
        if let Err(e) = self.reconcile(match_id).await {
            error!(match_id = %match_id, error = %e, "reconciliation failed");
            self.degrade_to_disputed(match_id).await;
        }

        self.repo
            .get_match(match_id)
            .await?
            .ok_or(ResultError::MatchNotFound)
    }

    /// Evaluate all submissions for a match and apply the verdict.
    ///
    /// Idempotent: terminal matches no-op, and every transition is gated on
    /// the status the verdict was computed against.
    pub async fn reconcile(&self, match_id: &MatchId) -> Result<(), sqlx::Error> {
        let Some(m) = self.repo.get_match(match_id).await? else {
            return Ok(());
        };
        if m.status.is_terminal() {
            return Ok(());
        }

        let submissions = self.repo.list_submissions(match_id).await?;
        match decide(m.expected_submissions(), &submissions) {
            Outcome::AwaitingSubmissions => {
                // First claim in: the match moves into verification until the
                // remaining players report.
                if !submissions.is_empty() {
                    self.repo
                        .transition_match(
                            match_id,
                            &[MatchStatus::Ongoing],
                            MatchStatus::Verification,
                            None,
                            None,
                        )
                        .await?;
                }
            }
            Outcome::Completed { winner } => {
                let moved = self
                    .repo
                    .transition_match(
                        match_id,
                        &[MatchStatus::Ongoing, MatchStatus::Verification],
                        MatchStatus::Completed,
                        Some(&winner),
                        None,
                    )
                    .await?;
                if moved {
                    info!(match_id = %match_id, winner = %winner, "match completed");
                    self.publish_resolution(match_id, MatchStatus::Completed, Some(&winner), None)
                        .await;
                    self.distributor.distribute(match_id).await?;
                }
            }
            Outcome::Disputed { reason } => {
                let moved = self
                    .repo
                    .transition_match(
                        match_id,
                        &[MatchStatus::Ongoing, MatchStatus::Verification],
                        MatchStatus::Disputed,
                        None,
                        Some(reason),
                    )
                    .await?;
                if moved {
                    warn!(match_id = %match_id, reason, "match disputed");
                    self.publish_resolution(match_id, MatchStatus::Disputed, None, Some(reason))
                        .await;
                }
            }
        }

        Ok(())
    }

    /// Admin override: force a match under review to a completed outcome.
    ///
    /// Goes through the same single-issuance payout guard as automatic
    /// resolution.
    pub async fn declare_winner(
        &self,
        match_id: &MatchId,
        winner_id: &UserId,
    ) -> Result<Match, ResultError> {
        let m = self
            .repo
            .get_match(match_id)
            .await?
            .ok_or(ResultError::MatchNotFound)?;

        if !m.has_player(winner_id) {
            return Err(ResultError::InvalidWinner);
        }
        if m.prize_distributed {
            return Err(ResultError::AlreadyDistributed);
        }

        // Resolution already happened but the payout never issued (e.g. a
        // crash between the two): re-drive the distributor for the same
        // winner instead of rejecting.
        if m.status == MatchStatus::Completed {
            if m.winner_id.as_ref() != Some(winner_id) {
                return Err(ResultError::NotReviewable);
            }
            self.distributor.distribute(match_id).await?;
            return self
                .repo
                .get_match(match_id)
                .await?
                .ok_or(ResultError::MatchNotFound);
        }

        let moved = self
            .repo
            .transition_match(
                match_id,
                &[MatchStatus::Verification, MatchStatus::Disputed],
                MatchStatus::Completed,
                Some(winner_id),
                None,
            )
            .await?;
        if !moved {
            // Completed/cancelled in the meantime, or never under review.
            return Err(ResultError::NotReviewable);
        }

        info!(match_id = %match_id, winner = %winner_id, "winner declared by operator");
        self.publish_resolution(match_id, MatchStatus::Completed, Some(winner_id), None)
            .await;
        self.distributor.distribute(match_id).await?;

        self.repo
            .get_match(match_id)
            .await?
            .ok_or(ResultError::MatchNotFound)
    }

    async fn degrade_to_disputed(&self, match_id: &MatchId) {
        let result = self
            .repo
            .transition_match(
                match_id,
                &[MatchStatus::Ongoing, MatchStatus::Verification],
                MatchStatus::Disputed,
                None,
                Some(REASON_SYSTEM_ERROR),
            )
            .await;
        match result {
            Ok(true) => {
                warn!(match_id = %match_id, "match degraded to disputed after internal error")
            }
            Ok(false) => {}
            Err(e) => {
                error!(match_id = %match_id, error = %e, "failed to degrade match to disputed")
            }
        }
    }

    async fn publish_resolution(
        &self,
        match_id: &MatchId,
        status: MatchStatus,
        winner: Option<&UserId>,
        reason: Option<&str>,
    ) {
        let event = NotifyEvent::MatchResolved {
            match_id: match_id.clone(),
            status,
            winner_id: winner.cloned(),
            reason: reason.map(|r| r.to_string()),
        };
        if let Err(e) = self.notifier.publish(&event).await {
            warn!(match_id = %match_id, error = %e, "resolution notification failed");
        }
    }
}

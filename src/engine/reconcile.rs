//! Reconciliation of self-reported match results into one outcome.
//!
//! Pure and deterministic: the decision depends only on the set of
//! submissions, never on their arrival order. Checks run in a fixed order so
//! the recorded dispute reason is the most actionable one: conflicting win
//! claims are reported before shared-evidence fraud, which is reported
//! before an absent winner.

use crate::domain::{ClaimedStatus, ResultSubmission, UserId};
use std::collections::HashSet;

pub const REASON_MULTIPLE_WINNERS: &str = "multiple players claimed victory";
pub const REASON_DUPLICATE_EVIDENCE: &str = "duplicate screenshots submitted";
pub const REASON_NO_WINNER: &str = "no clear winner claimed";
pub const REASON_SYSTEM_ERROR: &str = "internal error during reconciliation";

/// The reconciliation verdict for a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not every player has submitted yet.
    AwaitingSubmissions,
    /// Exactly one credible win claim.
    Completed { winner: UserId },
    /// Conflicting or fraudulent claims; held for manual review.
    Disputed { reason: &'static str },
}

/// Decide the outcome for a match with `expected_players` seats.
pub fn decide(expected_players: usize, submissions: &[ResultSubmission]) -> Outcome {
    if submissions.len() < expected_players {
        return Outcome::AwaitingSubmissions;
    }

    let winners: Vec<&UserId> = submissions
        .iter()
        .filter(|s| s.claimed_status == ClaimedStatus::Win)
        .map(|s| &s.user_id)
        .collect();

    if winners.len() > 1 {
        return Outcome::Disputed {
            reason: REASON_MULTIPLE_WINNERS,
        };
    }

    let mut seen = HashSet::new();
    for submission in submissions {
        if !seen.insert(submission.screenshot_ref.as_str()) {
            return Outcome::Disputed {
                reason: REASON_DUPLICATE_EVIDENCE,
            };
        }
    }

    match winners.first() {
        Some(winner) => Outcome::Completed {
            winner: (*winner).clone(),
        },
        None => Outcome::Disputed {
            reason: REASON_NO_WINNER,
        },
    }
}

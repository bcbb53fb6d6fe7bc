//! Self-reported match result submission.

use crate::domain::{MatchId, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// The outcome a player claims for themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimedStatus {
    Win,
    Loss,
}

impl ClaimedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimedStatus::Win => "win",
            ClaimedStatus::Loss => "loss",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "win" => Some(ClaimedStatus::Win),
            "loss" => Some(ClaimedStatus::Loss),
            _ => None,
        }
    }
}

/// One player's result claim for one match, with screenshot evidence.
///
/// Keyed by (match_id, user_id) and immutable once written: it is the
/// evidence record disputes are reviewed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSubmission {
    pub match_id: MatchId,
    pub user_id: UserId,
    /// Final placement the player claims (1 = first).
    pub claimed_position: i64,
    pub claimed_status: ClaimedStatus,
    /// Reference into the evidence blob store.
    pub screenshot_ref: String,
    pub submitted_at: TimeMs,
}

impl ResultSubmission {
    pub fn new(
        match_id: MatchId,
        user_id: UserId,
        claimed_position: i64,
        claimed_status: ClaimedStatus,
        screenshot_ref: String,
    ) -> Self {
        Self {
            match_id,
            user_id,
            claimed_position,
            claimed_status,
            screenshot_ref: screenshot_ref.trim().to_string(),
            submitted_at: TimeMs::now(),
        }
    }
}

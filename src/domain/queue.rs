//! Matchmaking queue entry.

use crate::domain::{Amount, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// Queue entry lifecycle: waiting until consumed by the pairer or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Waiting,
    Matched,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Waiting => "waiting",
            QueueStatus::Matched => "matched",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(QueueStatus::Waiting),
            "matched" => Some(QueueStatus::Matched),
            _ => None,
        }
    }
}

/// A player waiting to be paired at a given stake tier.
///
/// Keyed by user id: a player can hold at most one queue entry at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub user_id: UserId,
    /// Entry-fee bracket used to group compatible opponents.
    pub stake_tier: Amount,
    pub status: QueueStatus,
    pub joined_at: TimeMs,
    /// Display name snapshot taken when the player joined.
    pub display_name: String,
}

impl QueueEntry {
    pub fn new(user_id: UserId, stake_tier: Amount, display_name: String) -> Self {
        Self {
            user_id,
            stake_tier,
            status: QueueStatus::Waiting,
            joined_at: TimeMs::now(),
            display_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [QueueStatus::Waiting, QueueStatus::Matched] {
            assert_eq!(QueueStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(QueueStatus::parse("paired"), None);
    }

    #[test]
    fn test_new_entry_is_waiting() {
        let entry = QueueEntry::new(
            UserId::new("u1".to_string()),
            Amount::new(100),
            "Player One".to_string(),
        );
        assert_eq!(entry.status, QueueStatus::Waiting);
    }
}

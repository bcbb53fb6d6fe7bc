//! Match entity and its status state machine.

use crate::domain::{Amount, MatchId, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// Match status with an explicit transition table.
///
/// `open` is the filling state (tournament formats); paired 1v1 matches are
/// created directly in `ongoing` since both seats are filled at creation.
/// `verification` means at least one result claim is in and the rest are
/// awaited. `completed`, `disputed`, and `cancelled` admit no automatic
/// transition; `disputed -> completed` is reserved for the admin override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Open,
    Ongoing,
    Verification,
    Completed,
    Disputed,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Open => "open",
            MatchStatus::Ongoing => "ongoing",
            MatchStatus::Verification => "verification",
            MatchStatus::Completed => "completed",
            MatchStatus::Disputed => "disputed",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(MatchStatus::Open),
            "ongoing" => Some(MatchStatus::Ongoing),
            "verification" => Some(MatchStatus::Verification),
            "completed" => Some(MatchStatus::Completed),
            "disputed" => Some(MatchStatus::Disputed),
            "cancelled" => Some(MatchStatus::Cancelled),
            _ => None,
        }
    }

    /// No automatic transition leaves these states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MatchStatus::Completed | MatchStatus::Disputed | MatchStatus::Cancelled
        )
    }

    /// Statically checked transition table.
    pub fn can_transition_to(&self, next: MatchStatus) -> bool {
        use MatchStatus::*;
        match (self, next) {
            (Open, Ongoing) | (Open, Cancelled) => true,
            (Ongoing, Verification)
            | (Ongoing, Completed)
            | (Ongoing, Disputed)
            | (Ongoing, Cancelled) => true,
            (Verification, Completed) | (Verification, Disputed) | (Verification, Cancelled) => {
                true
            }
            // Admin override path only.
            (Disputed, Completed) => true,
            _ => false,
        }
    }
}

/// A stake match between a fixed set of players.
///
/// Never deleted; terminal matches remain as the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub stake_tier: Amount,
    /// Pot released to the winner; commission is withheld here, at pool
    /// formation, and never re-applied at payout.
    pub prize_pool: Amount,
    /// Immutable after creation.
    pub player_ids: Vec<UserId>,
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<UserId>,
    /// Write-once: flips to true when the winnings entry is issued.
    pub prize_distributed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute_reason: Option<String>,
    pub created_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<TimeMs>,
}

impl Match {
    /// Number of result submissions required before reconciliation can run.
    pub fn expected_submissions(&self) -> usize {
        self.player_ids.len()
    }

    pub fn has_player(&self, user_id: &UserId) -> bool {
        self.player_ids.iter().any(|p| p == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            MatchStatus::Open,
            MatchStatus::Ongoing,
            MatchStatus::Verification,
            MatchStatus::Completed,
            MatchStatus::Disputed,
            MatchStatus::Cancelled,
        ] {
            assert_eq!(MatchStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MatchStatus::parse("resolved"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(MatchStatus::Completed.is_terminal());
        assert!(MatchStatus::Disputed.is_terminal());
        assert!(MatchStatus::Cancelled.is_terminal());
        assert!(!MatchStatus::Ongoing.is_terminal());
        assert!(!MatchStatus::Verification.is_terminal());
    }

    #[test]
    fn test_transition_table() {
        use MatchStatus::*;
        assert!(Open.can_transition_to(Ongoing));
        assert!(Ongoing.can_transition_to(Verification));
        assert!(Ongoing.can_transition_to(Completed));
        assert!(Verification.can_transition_to(Disputed));
        assert!(Disputed.can_transition_to(Completed));

        assert!(!Completed.can_transition_to(Disputed));
        assert!(!Cancelled.can_transition_to(Ongoing));
        assert!(!Verification.can_transition_to(Ongoing));
        assert!(!Open.can_transition_to(Completed));
    }
}

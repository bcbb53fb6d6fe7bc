//! User account: wallet balance and aggregate play stats.

use crate::domain::{Amount, MatchId, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// A player account.
///
/// `wallet_balance` is owned exclusively by the ledger service; every other
/// component reads it but must never write it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub display_name: String,
    /// Balance in minor currency units, never negative.
    pub wallet_balance: Amount,
    /// Referrer, if this account was created through a referral link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<UserId>,
    /// Write-once flag: the one-time referral bonus has been paid out.
    pub referral_bonus_paid: bool,
    /// Match the player is currently seated in, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_match_id: Option<MatchId>,
    pub matches_played: i64,
    pub matches_won: i64,
    /// Skill rating, floored at zero.
    pub rating: i64,
    pub created_at: TimeMs,
}

impl UserAccount {
    /// Create a fresh account with a zero balance and default rating.
    pub fn new(id: UserId, display_name: String, referred_by: Option<UserId>) -> Self {
        Self {
            id,
            display_name,
            wallet_balance: Amount::zero(),
            referred_by,
            referral_bonus_paid: false,
            active_match_id: None,
            matches_played: 0,
            matches_won: 0,
            rating: 0,
            created_at: TimeMs::now(),
        }
    }

    /// Win rate in [0, 1]; zero when no matches have been played.
    pub fn win_rate(&self) -> f64 {
        if self.matches_played == 0 {
            return 0.0;
        }
        self.matches_won as f64 / self.matches_played as f64
    }
}

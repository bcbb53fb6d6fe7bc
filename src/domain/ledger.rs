//! Ledger entry: the immutable, signed monetary record balances derive from.

use crate::domain::{Amount, MatchId, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// What a ledger entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Deposit,
    Withdrawal,
    EntryFee,
    Winnings,
    Refund,
    ReferralBonus,
    AdminCredit,
    AdminDebit,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Deposit => "deposit",
            EntryKind::Withdrawal => "withdrawal",
            EntryKind::EntryFee => "entry-fee",
            EntryKind::Winnings => "winnings",
            EntryKind::Refund => "refund",
            EntryKind::ReferralBonus => "referral-bonus",
            EntryKind::AdminCredit => "admin-credit",
            EntryKind::AdminDebit => "admin-debit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(EntryKind::Deposit),
            "withdrawal" => Some(EntryKind::Withdrawal),
            "entry-fee" => Some(EntryKind::EntryFee),
            "winnings" => Some(EntryKind::Winnings),
            "refund" => Some(EntryKind::Refund),
            "referral-bonus" => Some(EntryKind::ReferralBonus),
            "admin-credit" => Some(EntryKind::AdminCredit),
            "admin-debit" => Some(EntryKind::AdminDebit),
            _ => None,
        }
    }
}

/// Entry settlement status. Only `completed` entries count toward a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Completed,
    Failed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Completed => "completed",
            EntryStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(EntryStatus::Pending),
            "completed" => Some(EntryStatus::Completed),
            "failed" => Some(EntryStatus::Failed),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, EntryStatus::Completed | EntryStatus::Failed)
    }
}

/// An append-only signed monetary record.
///
/// Invariant: for every user, the sum of `completed` entry amounts equals
/// the account's wallet balance after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Uuid, stored as text.
    pub id: String,
    pub user_id: UserId,
    /// Signed amount in minor units: positive credit, negative debit.
    pub amount: Amount,
    pub kind: EntryKind,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_match_id: Option<MatchId>,
    /// Failure reason for operator review; None while pending/completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<TimeMs>,
}

impl LedgerEntry {
    /// Create a pending entry awaiting application.
    pub fn pending(
        user_id: UserId,
        amount: Amount,
        kind: EntryKind,
        related_match_id: Option<MatchId>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            amount,
            kind,
            status: EntryStatus::Pending,
            related_match_id,
            reason: None,
            created_at: TimeMs::now(),
            settled_at: None,
        }
    }
}

//! Deposit and withdrawal requests: the admin-review gateway into the ledger.

use crate::domain::{Amount, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// Review status of a money-movement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

/// A deposit awaiting admin approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    /// Uuid, stored as text.
    pub id: String,
    /// Stable idempotency key.
    ///
    /// Priority: normalized `external_ref` (if present) > hash of
    /// deterministic fields.
    pub event_key: String,
    pub user_id: UserId,
    pub amount: Amount,
    /// External payment reference when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    pub status: RequestStatus,
    pub created_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<TimeMs>,
}

impl DepositRequest {
    /// Create a new pending request and compute its `event_key`.
    pub fn new(user_id: UserId, amount: Amount, external_ref: Option<String>) -> Self {
        let external_ref = normalize_ref(external_ref);
        let created_at = TimeMs::now();
        let event_key =
            Self::compute_event_key(&user_id, created_at, amount, external_ref.as_deref());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_key,
            user_id,
            amount,
            external_ref,
            status: RequestStatus::Pending,
            created_at,
            decided_at: None,
        }
    }

    /// Compute a stable unique key for this request.
    ///
    /// Priority: `external_ref` (if present) > hash of deterministic fields
    /// (user, created_at, amount). When hashing, a SHA-256 digest truncated
    /// to 128 bits keeps collisions out of reach for any realistic volume.
    pub fn compute_event_key(
        user_id: &UserId,
        created_at: TimeMs,
        amount: Amount,
        external_ref: Option<&str>,
    ) -> String {
        if let Some(r) = external_ref.filter(|s| !s.trim().is_empty()) {
            return r.trim().to_lowercase();
        }

        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, user_id.as_str());
        hasher.update(created_at.as_ms().to_le_bytes());
        hasher.update(amount.as_minor_units().to_le_bytes());

        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }
}

/// A withdrawal whose amount is held in the ledger while under review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Uuid, stored as text.
    pub id: String,
    pub user_id: UserId,
    pub amount: Amount,
    /// The debit ledger entry holding the funds.
    pub hold_entry_id: String,
    pub status: RequestStatus,
    pub created_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<TimeMs>,
}

fn normalize_ref(external_ref: Option<String>) -> Option<String> {
    external_ref
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
}

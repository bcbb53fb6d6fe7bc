//! Domain primitives: UserId, MatchId, TimeMs, Amount.

use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }
}

/// User identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Create a UserId from a string.
    pub fn new(id: String) -> Self {
        UserId(id)
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = EmptyIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EmptyIdError);
        }
        Ok(UserId(trimmed.to_string()))
    }
}

/// Match identifier (uuid, stored as text).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchId(pub String);

impl MatchId {
    /// Create a MatchId from a string.
    pub fn new(id: String) -> Self {
        MatchId(id)
    }

    /// Generate a fresh random MatchId.
    pub fn generate() -> Self {
        MatchId(uuid::Uuid::new_v4().to_string())
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MatchId {
    type Err = EmptyIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EmptyIdError);
        }
        Ok(MatchId(trimmed.to_string()))
    }
}

/// Error returned when parsing an empty identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyIdError;

impl std::fmt::Display for EmptyIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "identifier must be non-empty")
    }
}

impl std::error::Error for EmptyIdError {}

/// Signed monetary amount in integer minor currency units (cents).
///
/// All ledger arithmetic stays in the integer domain; configured rates are
/// applied via `rust_decimal` and rounded toward zero before re-entering it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(pub i64);

impl Amount {
    /// Create an Amount from minor units.
    pub fn new(minor_units: i64) -> Self {
        Amount(minor_units)
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Amount(0)
    }

    /// Get the underlying minor-units value.
    pub fn as_minor_units(&self) -> i64 {
        self.0
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Negated amount.
    pub fn negated(&self) -> Self {
        Amount(-self.0)
    }

    /// Checked addition, None on overflow.
    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_user_id_rejects_empty() {
        assert!(UserId::from_str("   ").is_err());
        assert_eq!(UserId::from_str(" u1 ").unwrap().as_str(), "u1");
    }

    #[test]
    fn test_match_id_generate_unique() {
        assert_ne!(MatchId::generate(), MatchId::generate());
    }

    #[test]
    fn test_amount_sign_helpers() {
        assert!(Amount::new(-5).is_negative());
        assert!(Amount::new(5).is_positive());
        assert!(!Amount::zero().is_negative());
        assert_eq!(Amount::new(100).negated(), Amount::new(-100));
    }

    #[test]
    fn test_timems_ordering() {
        assert!(TimeMs::new(1000) < TimeMs::new(2000));
    }
}

//! The reactive core services.
//!
//! Each service is a stateless handler invoked after a state write (queue
//! join, result submission, admin decision). Handlers may be invoked more
//! than once for the same logical event; every transition they perform is
//! guarded by a conditional read-check-write inside one transaction, so a
//! duplicate or racing invocation degrades to a safe no-op.

pub mod funding;
pub mod pairing;
pub mod payout;
pub mod reconcile;
pub mod referral;

pub use funding::{Funding, FundingError};
pub use pairing::{JoinOutcome, Pairer, PairingError};
pub use payout::Distributor;
pub use reconcile::{Reconciler, ResultError};
pub use referral::ReferralEvaluator;

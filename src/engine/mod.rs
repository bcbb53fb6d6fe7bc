//! Pure computation engine(s) for deterministic match-and-ledger logic.

pub mod payout;
pub mod reconcile;

pub use payout::{prize_pool, referral_bonus, RATING_LOSS_DELTA, RATING_WIN_DELTA};
pub use reconcile::{decide, Outcome};

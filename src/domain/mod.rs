//! Domain types for the match-and-ledger core.

pub mod account;
pub mod ledger;
pub mod match_state;
pub mod primitives;
pub mod queue;
pub mod request;
pub mod submission;

pub use account::UserAccount;
pub use ledger::{EntryKind, EntryStatus, LedgerEntry};
pub use match_state::{Match, MatchStatus};
pub use primitives::{Amount, MatchId, TimeMs, UserId};
pub use queue::{QueueEntry, QueueStatus};
pub use request::{DepositRequest, RequestStatus, WithdrawalRequest};
pub use submission::{ClaimedStatus, ResultSubmission};

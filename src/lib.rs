pub mod api;
pub mod arena;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod notify;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Amount, ClaimedStatus, EntryKind, EntryStatus, LedgerEntry, Match, MatchId, MatchStatus,
    QueueEntry, ResultSubmission, TimeMs, UserAccount, UserId,
};
pub use error::AppError;
pub use ledger::LedgerService;
pub use notify::{NoopNotifier, Notifier, WebhookNotifier};

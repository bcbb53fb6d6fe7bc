pub mod accounts;
pub mod admin;
pub mod health;
pub mod leaderboard;
pub mod matches;
pub mod queue;
pub mod wallet;

use crate::arena::{Distributor, Funding, Pairer, Reconciler, ReferralEvaluator};
use crate::config::Config;
use crate::db::Repository;
use crate::ledger::LedgerService;
use crate::notify::Notifier;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub ledger: LedgerService,
    pub pairer: Pairer,
    pub reconciler: Reconciler,
    pub funding: Funding,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        let ledger = LedgerService::new(repo.clone());
        let distributor = Distributor::new(repo.clone(), notifier.clone());
        let reconciler = Reconciler::new(repo.clone(), distributor, notifier.clone());
        let referral = ReferralEvaluator::new(repo.clone(), config.referral_rate);
        let funding = Funding::new(repo.clone(), referral);
        let pairer = Pairer::new(repo.clone(), config.clone(), notifier);

        Self {
            repo,
            config,
            ledger,
            pairer,
            reconciler,
            funding,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/accounts", post(accounts::create_account))
        .route("/v1/accounts/:id", get(accounts::get_account))
        .route("/v1/queue/join", post(queue::join_queue))
        .route("/v1/queue/cancel", post(queue::cancel_queue))
        .route("/v1/matches/:id", get(matches::get_match))
        .route("/v1/matches/:id/results", post(matches::submit_result))
        .route("/v1/wallet/:user_id", get(wallet::get_wallet))
        .route("/v1/wallet/deposits", post(wallet::request_deposit))
        .route("/v1/wallet/withdrawals", post(wallet::request_withdrawal))
        .route("/v1/leaderboard", get(leaderboard::get_leaderboard))
        .route("/v1/admin/matches/:id/winner", post(admin::declare_winner))
        .route("/v1/admin/matches/:id/cancel", post(admin::cancel_match))
        .route("/v1/admin/deposits/:id", get(admin::get_deposit_request))
        .route(
            "/v1/admin/withdrawals/:id",
            get(admin::get_withdrawal_request),
        )
        .route(
            "/v1/admin/deposits/:id/approve",
            post(admin::approve_deposit),
        )
        .route("/v1/admin/deposits/:id/reject", post(admin::reject_deposit))
        .route(
            "/v1/admin/withdrawals/:id/approve",
            post(admin::approve_withdrawal),
        )
        .route(
            "/v1/admin/withdrawals/:id/reject",
            post(admin::reject_withdrawal),
        )
        .route("/v1/admin/wallet/adjust", post(admin::adjust_wallet))
        .layer(cors)
        .with_state(state)
}

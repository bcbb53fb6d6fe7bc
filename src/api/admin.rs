//! Privileged operator endpoints, guarded by the admin token.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;

use crate::api::matches::MatchDto;
use crate::api::AppState;
use crate::db::repo::{ApplyOutcome, CancelOutcome};
use crate::domain::{Amount, MatchId, UserId};
use crate::error::AppError;

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented != state.config.admin_token {
        return Err(AppError::PermissionDenied);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclareWinnerRequest {
    pub winner_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustWalletRequest {
    pub user_id: String,
    /// Signed amount in minor units: positive credit, negative debit.
    pub amount: i64,
}

pub async fn declare_winner(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DeclareWinnerRequest>,
) -> Result<Json<MatchDto>, AppError> {
    require_admin(&state, &headers)?;

    let match_id = MatchId::from_str(&id)
        .map_err(|_| AppError::InvalidArgument("id must be non-empty".into()))?;
    let winner_id = UserId::from_str(&body.winner_id)
        .map_err(|_| AppError::InvalidArgument("winnerId must be non-empty".into()))?;

    let m = state.reconciler.declare_winner(&match_id, &winner_id).await?;
    Ok(Json(m.into()))
}

pub async fn cancel_match(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;

    let match_id = MatchId::from_str(&id)
        .map_err(|_| AppError::InvalidArgument("id must be non-empty".into()))?;

    match state.repo.cancel_match_atomic(&match_id).await? {
        CancelOutcome::Cancelled { refunded } => Ok(Json(json!({
            "status": "cancelled",
            "refunded": refunded.iter().map(|u| u.as_str()).collect::<Vec<_>>(),
        }))),
        CancelOutcome::NotCancellable => Err(AppError::FailedPrecondition(
            "match is already terminal".into(),
        )),
        CancelOutcome::MatchMissing => {
            Err(AppError::NotFound(format!("no match {}", match_id)))
        }
        CancelOutcome::RefundFailed(user) => Err(AppError::Internal(format!(
            "refund failed for {}",
            user
        ))),
    }
}

pub async fn get_deposit_request(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;

    let request = state
        .repo
        .get_deposit_request(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no deposit request {}", id)))?;

    Ok(Json(json!({
        "requestId": request.id,
        "userId": request.user_id.as_str(),
        "amount": request.amount.as_minor_units(),
        "externalRef": request.external_ref,
        "status": request.status.as_str(),
        "createdAt": request.created_at.as_ms(),
    })))
}

pub async fn get_withdrawal_request(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;

    let request = state
        .repo
        .get_withdrawal_request(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no withdrawal request {}", id)))?;

    Ok(Json(json!({
        "requestId": request.id,
        "userId": request.user_id.as_str(),
        "amount": request.amount.as_minor_units(),
        "holdEntryId": request.hold_entry_id,
        "status": request.status.as_str(),
        "createdAt": request.created_at.as_ms(),
    })))
}

pub async fn approve_deposit(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;
    state.funding.approve_deposit(&id).await?;
    Ok(Json(json!({"status": "approved"})))
}

pub async fn reject_deposit(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;
    state.funding.reject_deposit(&id).await?;
    Ok(Json(json!({"status": "rejected"})))
}

pub async fn approve_withdrawal(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;
    state.funding.approve_withdrawal(&id).await?;
    Ok(Json(json!({"status": "approved"})))
}

pub async fn reject_withdrawal(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;
    state.funding.reject_withdrawal(&id).await?;
    Ok(Json(json!({"status": "rejected"})))
}

pub async fn adjust_wallet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AdjustWalletRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;

    let user_id = UserId::from_str(&body.user_id)
        .map_err(|_| AppError::InvalidArgument("userId must be non-empty".into()))?;
    if body.amount == 0 {
        return Err(AppError::InvalidArgument("amount must be non-zero".into()));
    }
    if state.repo.get_account(&user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("no account {}", user_id)));
    }

    let (entry, outcome) = state
        .ledger
        .admin_adjust(&user_id, Amount::new(body.amount))
        .await?;

    match outcome {
        ApplyOutcome::Applied { new_balance } => Ok(Json(json!({
            "entryId": entry.id,
            "balance": new_balance.as_minor_units(),
        }))),
        ApplyOutcome::AccountMissing => {
            Err(AppError::NotFound(format!("no account {}", user_id)))
        }
        ApplyOutcome::InsufficientBalance => Err(AppError::InsufficientFunds),
        ApplyOutcome::AlreadySettled => {
            Err(AppError::Internal("adjustment entry was not applied".into()))
        }
    }
}

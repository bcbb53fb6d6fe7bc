use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::AppState;
use crate::domain::{Amount, LedgerEntry, UserId};
use crate::error::AppError;

const LEDGER_PAGE_SIZE: i64 = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub user_id: String,
    pub balance: i64,
    /// Sum of completed entries; equals `balance` on a healthy ledger.
    pub ledger_total: i64,
    pub entries: Vec<LedgerEntryDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryDto {
    pub id: String,
    pub amount: i64,
    pub kind: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_match_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<i64>,
}

impl From<LedgerEntry> for LedgerEntryDto {
    fn from(entry: LedgerEntry) -> Self {
        LedgerEntryDto {
            id: entry.id,
            amount: entry.amount.as_minor_units(),
            kind: entry.kind.as_str().to_string(),
            status: entry.status.as_str().to_string(),
            related_match_id: entry.related_match_id.map(|m| m.0),
            reason: entry.reason,
            created_at: entry.created_at.as_ms(),
            settled_at: entry.settled_at.map(|t| t.as_ms()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequestBody {
    pub user_id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    /// External payment reference, if the payment processor supplied one.
    pub external_ref: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAcceptedResponse {
    pub request_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequestBody {
    pub user_id: String,
    pub amount: i64,
}

pub async fn get_wallet(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<WalletResponse>, AppError> {
    let user_id = UserId::from_str(&user_id)
        .map_err(|_| AppError::InvalidArgument("userId must be non-empty".into()))?;

    let view = state
        .ledger
        .wallet_view(&user_id, LEDGER_PAGE_SIZE)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no account {}", user_id)))?;

    Ok(Json(WalletResponse {
        user_id: view.account.id.0,
        balance: view.account.wallet_balance.as_minor_units(),
        ledger_total: view.ledger_total.as_minor_units(),
        entries: view.entries.into_iter().map(Into::into).collect(),
    }))
}

pub async fn request_deposit(
    State(state): State<AppState>,
    Json(body): Json<DepositRequestBody>,
) -> Result<Json<RequestAcceptedResponse>, AppError> {
    let user_id = UserId::from_str(&body.user_id)
        .map_err(|_| AppError::InvalidArgument("userId must be non-empty".into()))?;

    let request = state
        .funding
        .request_deposit(&user_id, Amount::new(body.amount), body.external_ref)
        .await?;

    Ok(Json(RequestAcceptedResponse {
        request_id: request.id,
        status: request.status.as_str().to_string(),
    }))
}

pub async fn request_withdrawal(
    State(state): State<AppState>,
    Json(body): Json<WithdrawalRequestBody>,
) -> Result<Json<RequestAcceptedResponse>, AppError> {
    let user_id = UserId::from_str(&body.user_id)
        .map_err(|_| AppError::InvalidArgument("userId must be non-empty".into()))?;

    let request = state
        .funding
        .request_withdrawal(&user_id, Amount::new(body.amount))
        .await?;

    Ok(Json(RequestAcceptedResponse {
        request_id: request.id,
        status: request.status.as_str().to_string(),
    }))
}

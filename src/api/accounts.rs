use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::AppState;
use crate::domain::{UserAccount, UserId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub user_id: String,
    pub display_name: String,
    pub referred_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub user_id: String,
    pub display_name: String,
    pub wallet_balance: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_match_id: Option<String>,
    pub matches_played: i64,
    pub matches_won: i64,
    pub win_rate: f64,
    pub rating: i64,
}

impl From<UserAccount> for AccountDto {
    fn from(account: UserAccount) -> Self {
        let win_rate = account.win_rate();
        AccountDto {
            user_id: account.id.0,
            display_name: account.display_name,
            wallet_balance: account.wallet_balance.as_minor_units(),
            referred_by: account.referred_by.map(|u| u.0),
            active_match_id: account.active_match_id.map(|m| m.0),
            matches_played: account.matches_played,
            matches_won: account.matches_won,
            win_rate,
            rating: account.rating,
        }
    }
}

pub async fn create_account(
    State(state): State<AppState>,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<AccountDto>, AppError> {
    let user_id = UserId::from_str(&body.user_id)
        .map_err(|_| AppError::InvalidArgument("userId must be non-empty".into()))?;
    let display_name = body.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(AppError::InvalidArgument("displayName must be non-empty".into()));
    }

    let referred_by = match body.referred_by.as_deref() {
        Some(raw) => Some(
            UserId::from_str(raw)
                .map_err(|_| AppError::InvalidArgument("referredBy must be non-empty".into()))?,
        ),
        None => None,
    };
    if referred_by.as_ref() == Some(&user_id) {
        return Err(AppError::InvalidArgument("a user cannot refer themselves".into()));
    }

    let account = UserAccount::new(user_id, display_name, referred_by);
    if !state.repo.insert_account(&account).await? {
        return Err(AppError::FailedPrecondition("account already exists".into()));
    }

    Ok(Json(account.into()))
}

pub async fn get_account(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AccountDto>, AppError> {
    let user_id = UserId::from_str(&id)
        .map_err(|_| AppError::InvalidArgument("id must be non-empty".into()))?;

    let account = state
        .repo
        .get_account(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no account {}", user_id)))?;

    Ok(Json(account.into()))
}

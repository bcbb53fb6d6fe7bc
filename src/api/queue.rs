use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::matches::MatchDto;
use crate::api::AppState;
use crate::arena::JoinOutcome;
use crate::domain::{Amount, UserId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueRequest {
    pub user_id: String,
    /// Stake in minor currency units.
    pub stake_tier: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinQueueResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_info: Option<MatchDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelQueueRequest {
    pub user_id: String,
}

pub async fn join_queue(
    State(state): State<AppState>,
    Json(body): Json<JoinQueueRequest>,
) -> Result<Json<JoinQueueResponse>, AppError> {
    let user_id = UserId::from_str(&body.user_id)
        .map_err(|_| AppError::InvalidArgument("userId must be non-empty".into()))?;

    let outcome = state
        .pairer
        .join_queue(&user_id, Amount::new(body.stake_tier))
        .await?;

    Ok(Json(match outcome {
        JoinOutcome::Queued => JoinQueueResponse {
            status: "queued",
            match_info: None,
        },
        JoinOutcome::Paired(m) => JoinQueueResponse {
            status: "paired",
            match_info: Some(m.into()),
        },
    }))
}

pub async fn cancel_queue(
    State(state): State<AppState>,
    Json(body): Json<CancelQueueRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = UserId::from_str(&body.user_id)
        .map_err(|_| AppError::InvalidArgument("userId must be non-empty".into()))?;

    state.pairer.cancel_queue(&user_id).await?;
    Ok(Json(serde_json::json!({"status": "cancelled"})))
}

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::AppState;
use crate::domain::{ClaimedStatus, Match, MatchId, UserId};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDto {
    pub id: String,
    pub stake_tier: i64,
    pub prize_pool: i64,
    pub player_ids: Vec<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    pub prize_distributed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute_reason: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
}

impl From<Match> for MatchDto {
    fn from(m: Match) -> Self {
        MatchDto {
            id: m.id.0,
            stake_tier: m.stake_tier.as_minor_units(),
            prize_pool: m.prize_pool.as_minor_units(),
            player_ids: m.player_ids.into_iter().map(|p| p.0).collect(),
            status: m.status.as_str().to_string(),
            winner_id: m.winner_id.map(|w| w.0),
            prize_distributed: m.prize_distributed,
            dispute_reason: m.dispute_reason,
            created_at: m.created_at.as_ms(),
            resolved_at: m.resolved_at.map(|t| t.as_ms()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResultRequest {
    pub user_id: String,
    pub claimed_position: i64,
    pub claimed_status: String,
    pub screenshot_ref: String,
}

pub async fn get_match(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MatchDto>, AppError> {
    let match_id = MatchId::from_str(&id)
        .map_err(|_| AppError::InvalidArgument("id must be non-empty".into()))?;

    let m = state
        .repo
        .get_match(&match_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no match {}", match_id)))?;

    Ok(Json(m.into()))
}

pub async fn submit_result(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<SubmitResultRequest>,
) -> Result<Json<MatchDto>, AppError> {
    let match_id = MatchId::from_str(&id)
        .map_err(|_| AppError::InvalidArgument("id must be non-empty".into()))?;
    let user_id = UserId::from_str(&body.user_id)
        .map_err(|_| AppError::InvalidArgument("userId must be non-empty".into()))?;
    let claimed_status = ClaimedStatus::parse(&body.claimed_status).ok_or_else(|| {
        AppError::InvalidArgument("claimedStatus must be \"win\" or \"loss\"".into())
    })?;
    if body.screenshot_ref.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "screenshotRef must reference uploaded evidence".into(),
        ));
    }
    if body.claimed_position < 1 {
        return Err(AppError::InvalidArgument("claimedPosition must be >= 1".into()));
    }

    let m = state
        .reconciler
        .submit_result(
            &match_id,
            &user_id,
            body.claimed_position,
            claimed_status,
            body.screenshot_ref,
        )
        .await?;

    Ok(Json(m.into()))
}

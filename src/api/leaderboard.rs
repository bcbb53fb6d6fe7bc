use axum::extract::State;
use axum::Json;
use futures::future::try_join_all;
use serde::Serialize;

use crate::api::AppState;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: String,
    pub display_name: String,
    pub rating: i64,
    pub matches_played: i64,
    pub matches_won: i64,
    pub win_rate: f64,
    /// Sum of completed winnings entries, in minor units.
    pub total_winnings: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let accounts = state
        .repo
        .top_accounts_by_rating(state.config.leaderboard_limit)
        .await?;

    let winnings_futures = accounts.iter().map(|account| {
        let state = state.clone();
        let user_id = account.id.clone();
        async move { state.repo.sum_winnings_for_user(&user_id).await }
    });
    let winnings = try_join_all(winnings_futures).await?;

    let entries = accounts
        .into_iter()
        .zip(winnings)
        .enumerate()
        .map(|(i, (account, total_winnings))| LeaderboardEntry {
            rank: (i + 1) as i64,
            user_id: account.id.as_str().to_string(),
            display_name: account.display_name.clone(),
            rating: account.rating,
            matches_played: account.matches_played,
            matches_won: account.matches_won,
            win_rate: account.win_rate(),
            total_winnings: total_winnings.as_minor_units(),
        })
        .collect();

    Ok(Json(LeaderboardResponse { entries }))
}

use axum::{Json, Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::user_profile::{DailyMode, UserProfile};
use serde::{Deserialize, Serialize};
use services::services::{mission_content::StepEstimates, progress_store::StoreError};
use tracing::info;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, identity::CurrentUser};

#[derive(Debug, Serialize, TS)]
pub struct SettingsView {
    pub daily_mode: i32,
    pub estimates: StepEstimates,
    pub total_minutes: i32,
}

impl SettingsView {
    fn for_profile(profile: &UserProfile) -> Self {
        let estimates = StepEstimates::for_mode(profile.mode());
        Self {
            daily_mode: profile.daily_mode,
            total_minutes: estimates.total(),
            estimates,
        }
    }
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateSettings {
    pub daily_mode: i32,
}

pub async fn get_settings(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<ResponseJson<ApiResponse<SettingsView>>, ApiError> {
    let profile = state
        .store
        .ensure_profile(&user.id, &user.email, user.full_name.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(SettingsView::for_profile(&profile))))
}

/// Switch the daily mode. Only 10, 20 and 30 minutes are accepted.
pub async fn update_settings(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<UpdateSettings>,
) -> Result<ResponseJson<ApiResponse<SettingsView>>, ApiError> {
    let mode = DailyMode::try_from_minutes(payload.daily_mode).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "daily mode must be 10, 20 or 30 minutes, got {}",
            payload.daily_mode
        ))
    })?;

    state
        .store
        .ensure_profile(&user.id, &user.email, user.full_name.as_deref())
        .await?;
    let profile = state
        .store
        .set_daily_mode(&user.id, mode)
        .await?
        .ok_or_else(|| StoreError::Unavailable(format!("profile {} vanished", user.id)))?;

    info!(user_id = %user.id, daily_mode = profile.daily_mode, "Updated daily mode");
    Ok(ResponseJson(ApiResponse::success(SettingsView::for_profile(&profile))))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}

use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::user_profile::UserProfile;
use serde::Serialize;
use services::services::stats::{self, DashboardStats};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, identity::CurrentUser};

#[derive(Debug, Serialize, TS)]
pub struct DashboardResponse {
    pub profile: UserProfile,
    pub stats: DashboardStats,
}

/// Profile plus the figures shown on the landing page, including today's mission
pub async fn get_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<ResponseJson<ApiResponse<DashboardResponse>>, ApiError> {
    let profile = state
        .store
        .ensure_profile(&user.id, &user.email, user.full_name.as_deref())
        .await?;
    let roadmap = state.reconciler().load(&user.id).await?;
    let stats = stats::dashboard(&profile, &roadmap);

    Ok(ResponseJson(ApiResponse::success(DashboardResponse {
        profile,
        stats,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

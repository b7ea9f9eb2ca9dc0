use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use services::services::stats::{self, ProgressStats};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, identity::CurrentUser};

pub async fn get_progress(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<ResponseJson<ApiResponse<ProgressStats>>, ApiError> {
    let profile = state
        .store
        .ensure_profile(&user.id, &user.email, user.full_name.as_deref())
        .await?;
    let roadmap = state.reconciler().load(&user.id).await?;
    Ok(ResponseJson(ApiResponse::success(stats::progress(
        &profile, &roadmap,
    ))))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/progress", get(get_progress))
}

use axum::{Json, Router, extract::State, response::Json as ResponseJson, routing::post};
use services::services::sandbox::{RunOutput, RunRequest};
use tracing::debug;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, identity::CurrentUser};

const MAX_SOURCE_BYTES: usize = 64 * 1024;

/// Run a snippet from the Python playground or a coding step
pub async fn run_code(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<RunRequest>,
) -> Result<ResponseJson<ApiResponse<RunOutput>>, ApiError> {
    if request.source.len() > MAX_SOURCE_BYTES {
        return Err(ApiError::BadRequest(format!(
            "source exceeds {MAX_SOURCE_BYTES} bytes"
        )));
    }

    debug!(user_id = %user.id, bytes = request.source.len(), "Running playground code");
    let output = state.sandbox.run(&request.source).await?;
    Ok(ResponseJson(ApiResponse::success(output)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/playground/run", post(run_code))
}

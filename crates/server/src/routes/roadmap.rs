use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use services::services::reconciler::Roadmap;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, identity::CurrentUser};

/// All thirty days with their reconciled status
pub async fn get_roadmap(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<ResponseJson<ApiResponse<Roadmap>>, ApiError> {
    let roadmap = state.reconciler().load(&user.id).await?;
    Ok(ResponseJson(ApiResponse::success(roadmap)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/roadmap", get(get_roadmap))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::routes::test_support::{app, get};

    #[tokio::test]
    async fn roadmap_lists_every_day_in_order() {
        let app = app().await;
        let (status, body) = get(&app, "/api/roadmap", "u1").await;
        assert_eq!(status, StatusCode::OK);

        let entries = body["data"]["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 30);
        assert_eq!(entries[0]["day_number"], 1);
        assert_eq!(entries[0]["status"], "available");
        assert_eq!(entries[1]["status"], "locked");
        assert_eq!(entries[29]["day_number"], 30);
        assert_eq!(entries[6]["is_project"], true);
        assert_eq!(body["data"]["target_day"], 1);
    }
}

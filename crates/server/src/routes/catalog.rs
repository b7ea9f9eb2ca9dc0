use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use services::services::catalog::ProvisionReport;
use tracing::info;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, identity::CurrentUser};

/// Back-fill any missing curriculum days
pub async fn provision_catalog(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<ResponseJson<ApiResponse<ProvisionReport>>, ApiError> {
    let provisioned = state.provisioner().ensure().await?;
    info!(
        user_id = %user.id,
        inserted = provisioned.report.inserted,
        "Catalog provisioning requested"
    );
    Ok(ResponseJson(ApiResponse::success(provisioned.report)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/catalog/provision", post(provision_catalog))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::routes::test_support::{app, post};

    #[tokio::test]
    async fn provisioning_is_idempotent() {
        let app = app().await;

        let (status, body) = post(&app, "/api/catalog/provision", "u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["inserted"], 30);
        assert_eq!(body["data"]["missing_after"].as_array().unwrap().len(), 0);

        let (_, body) = post(&app, "/api/catalog/provision", "u1", None).await;
        assert_eq!(body["data"]["inserted"], 0);
        assert_eq!(body["data"]["missing_before"].as_array().unwrap().len(), 0);
    }
}

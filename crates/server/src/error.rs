use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::services::{
    mission_content::ContentError, mission_session::SessionError, progress_store::StoreError,
    sandbox::SandboxError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

const LOAD_FAILED: &str = "Something went wrong loading your progress. Please try again.";

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Store(_) | ApiError::Session(SessionError::Store(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, LOAD_FAILED.to_string())
            }
            ApiError::Session(SessionError::UnknownMission(_)) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Session(SessionError::OutOfOrder { .. } | SessionError::ReviewLocked) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            ApiError::Content(ContentError::CodingTaskNotFound(_)) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Sandbox(SandboxError::Timeout(_)) => {
                (StatusCode::REQUEST_TIMEOUT, self.to_string())
            }
            ApiError::Sandbox(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Code runner is unavailable".to_string(),
            ),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(status = %status, "Request failed: {}", self);
        }
        (status, ResponseJson(ApiResponse::<()>::error(&message))).into_response()
    }
}

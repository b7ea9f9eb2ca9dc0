use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub mod catalog;
pub mod dashboard;
pub mod health;
pub mod missions;
pub mod playground;
pub mod progress;
pub mod roadmap;
pub mod settings;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(dashboard::router())
        .merge(roadmap::router())
        .merge(progress::router())
        .merge(catalog::router())
        .merge(missions::router())
        .merge(playground::router())
        .merge(settings::router());

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use db::DBService;
    use serde_json::Value;
    use services::services::{
        progress_store::SqliteProgressStore,
        sandbox::{CodeSandbox, RunOutput, SandboxError},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::identity::{USER_EMAIL_HEADER, USER_ID_HEADER};

    /// Echoes the submitted source back as stdout
    pub struct EchoSandbox;

    #[async_trait]
    impl CodeSandbox for EchoSandbox {
        async fn run(&self, source: &str) -> Result<RunOutput, SandboxError> {
            Ok(RunOutput {
                stdout: source.to_string(),
                stderr: String::new(),
                exit_code: Some(0),
                success: true,
            })
        }
    }

    pub async fn app() -> Router {
        let db = DBService::in_memory().await.unwrap();
        let state = AppState::new(Arc::new(SqliteProgressStore::new(db)), Arc::new(EchoSandbox));
        router(state)
    }

    pub async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder
                .header(USER_ID_HEADER, user)
                .header(USER_EMAIL_HEADER, format!("{user}@example.com"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(app: &Router, uri: &str, user: &str) -> (StatusCode, Value) {
        send(app, Method::GET, uri, Some(user), None).await
    }

    pub async fn post(app: &Router, uri: &str, user: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(app, Method::POST, uri, Some(user), body).await
    }
}

//! The engine's minimal HTTP surface: a single `GET /rand` endpoint, per
//! specification §6.

use crate::errors::EngineError;
use crate::Engine;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct RandResponse {
    outcome: [u64; 1],
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

async fn rand_handler(State(engine): State<Arc<Engine>>) -> Result<Json<RandResponse>, EngineError> {
    let n = engine.get_rand(100, 0)?;
    tracing::debug!(outcome = n, "served /rand");
    Ok(Json(RandResponse { outcome: [n] }))
}

/// Builds the router. Takes a shared `Engine` handle so the same instance
/// backs every request.
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/rand", get(rand_handler))
        .with_state(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn rand_endpoint_returns_value_in_range() {
        let engine = Arc::new(Engine::new(&AppConfig::default()));
        let app = router(engine);
        let response = app
            .oneshot(Request::builder().uri("/rand").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let outcome = parsed["outcome"][0].as_u64().unwrap();
        assert!(outcome < 100);
    }
}

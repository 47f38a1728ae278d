use axum::body::Body;
use axum::http::{Request, StatusCode};
use fortuna_engine::{http, AppConfig, Engine};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn rand_endpoint_round_trips_a_value_below_the_configured_upper_bound() {
    let engine = Arc::new(Engine::new(&AppConfig::default()));
    let app = http::router(engine);

    let response = app
        .oneshot(Request::builder().uri("/rand").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let outcome = parsed["outcome"][0].as_u64().expect("outcome is a number");
    assert!(outcome < 100);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let engine = Arc::new(Engine::new(&AppConfig::default()));
    let app = http::router(engine);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

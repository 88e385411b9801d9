#![cfg(feature = "server")]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use fauna_database::Database;
use fauna_kernel::domain::config::ApiConfig;
use fauna_kernel::server::ApiState;
use fauna_kernel::server::router::system_router;
use tower::ServiceExt;

async fn state() -> ApiState {
    let database = Database::builder().url("sqlite::memory:").init().await.expect("database");
    ApiState::builder().config(ApiConfig::default()).db(database).build().expect("state")
}

async fn app() -> axum::Router {
    let (router, _) = system_router().with_state(state().await).split_for_parts();
    router
}

#[tokio::test]
async fn ping_answers_pong() {
    let response = app()
        .await
        .oneshot(Request::get("/api/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"pong");
}

#[tokio::test]
async fn health_reports_up() {
    let response =
        app().await.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "up");
}

#[tokio::test]
async fn builder_requires_database() {
    let err = ApiState::builder().config(ApiConfig::default()).build().unwrap_err();
    assert!(err.to_string().contains("Database not provided"));
}

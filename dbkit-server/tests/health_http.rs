//! /health through the full router and layer stack

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use dbkit_core::{CompiledStatement, Database, Driver, QueryOutcome, StatementKind};
use dbkit_server::{build_router, AppState, ServerConfig};
use serde_json::Value;
use tower::ServiceExt;

struct Reachable;

#[async_trait]
impl Driver for Reachable {
    async fn run(
        &self,
        _statement: &CompiledStatement,
        _kind: StatementKind,
    ) -> Result<QueryOutcome, sqlx::Error> {
        Ok(QueryOutcome::Rows(vec![]))
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

async fn get_health(db: Database) -> (StatusCode, Value) {
    let app = build_router(AppState::new(Arc::new(db)), &ServerConfig::default());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn reachable_database_reports_ok() {
    let (status, body) = get_health(Database::with_driver(Arc::new(Reachable))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"]["connected"], true);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn missing_database_still_answers_200() {
    let (status, body) = get_health(Database::detached()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"]["connected"], false);
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn unknown_routes_are_404() {
    let app = build_router(
        AppState::new(Arc::new(Database::detached())),
        &ServerConfig::default(),
    );
    let response = app
        .oneshot(Request::builder().uri("/query").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

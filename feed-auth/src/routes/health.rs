use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use feed_shared::{HealthCheck, HealthResponse, HealthStatus};
use std::sync::Arc;

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let database = match state.db.get() {
        Ok(_) => HealthCheck::healthy("database"),
        Err(e) => HealthCheck::unhealthy("database", e.to_string()),
    };
    let redis = match state.redis.ping().await {
        Ok(()) => HealthCheck::healthy("redis"),
        Err(e) => HealthCheck::unhealthy("redis", e.to_string()),
    };
    let rabbitmq = if state.rabbitmq.is_connected() {
        HealthCheck::healthy("rabbitmq")
    } else {
        HealthCheck::unhealthy("rabbitmq", "channel closed")
    };

    let response = HealthResponse::healthy("feed-auth", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![database, redis, rabbitmq]);

    let status = match response.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status, Json(response)).into_response()
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}

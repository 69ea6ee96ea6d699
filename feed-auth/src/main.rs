use axum::{middleware, routing::{get, post}, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use feed_shared::clients::db::{self, DbPool};
use feed_shared::clients::rabbitmq::RabbitMQClient;
use feed_shared::clients::redis::RedisClient;
use metrics_exporter_prometheus::PrometheusHandle;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub redis: RedisClient,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feed_shared::middleware::init_tracing("feed-auth")?;

    let config = AppConfig::load()?;
    let port = config.port;

    let db = db::create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect_with_retry(&config.rabbitmq_url, 5, Duration::from_secs(2)).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;
    let metrics = feed_shared::middleware::init_metrics("feed-auth")?;

    let state = Arc::new(AppState { db, config, rabbitmq, redis, metrics });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/register", post(routes::register::register))
        .route("/login", post(routes::login::login))
        .route("/refresh", post(routes::refresh::refresh_token))
        .route("/logout", post(routes::logout::logout))
        .route("/password", post(routes::password::change_password))
        .route("/me", get(routes::me::me))
        .route_layer(middleware::from_fn(feed_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "feed-auth starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use axum::{extract::DefaultBodyLimit, middleware, routing::{get, post}, Router};
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
use feed_shared::clients::minio::MinioClient;
use feed_shared::clients::rabbitmq::RabbitMQClient;
use metrics_exporter_prometheus::PrometheusHandle;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub minio: MinioClient,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feed_shared::middleware::init_tracing("feed-social")?;

    let config = AppConfig::load()?;
    let port = config.port;
    let body_limit = config.max_image_bytes + 64 * 1024;

    let db = db::create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect_with_retry(&config.rabbitmq_url, 5, Duration::from_secs(2)).await?;
    let minio = MinioClient::new(
        &config.minio_endpoint,
        &config.minio_access_key,
        &config.minio_secret_key,
        &config.minio_bucket,
        &config.minio_public_url,
    )
    .await;
    let metrics = feed_shared::middleware::init_metrics("feed-social")?;

    let state = Arc::new(AppState { db, config, rabbitmq, minio, metrics });

    // Spawn RabbitMQ subscriber for user.registered events
    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_user_registered(sub_state).await {
            tracing::error!(error = %e, "user.registered subscriber failed");
        }
    });

    let app = Router::new()
        .route("/", get(routes::index::index))
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/profile", get(routes::profile::get_profile).put(routes::profile::update_profile))
        .route("/myfeed", get(routes::feeds::my_feed))
        .route("/friendsfeed", get(routes::feeds::friends_feed))
        .route("/posts", post(routes::posts::new_post)
            .layer(DefaultBodyLimit::max(body_limit)))
        .route("/posts/:id/comments", get(routes::comments::list_comments).post(routes::comments::add_comment))
        .route("/posts/:id/like", post(routes::likes::like_post))
        .route("/friends", get(routes::friends::friends_page))
        .route("/friends/requests", post(routes::friends::send_requests))
        .route("/friends/requests/accept", post(routes::friends::accept_requests))
        .route_layer(middleware::from_fn(feed_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "feed-social starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

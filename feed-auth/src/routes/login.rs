use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use feed_shared::clients::db;
use feed_shared::errors::{AppError, AppResult, ErrorCode};
use feed_shared::types::auth::TokenPair;
use feed_shared::types::ApiResponse;

use crate::models::Credential;
use crate::schema::credentials;
use crate::services::{auth_service, token_service};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let username = req.username.trim().to_lowercase();

    let key = auth_service::login_attempts_key(&username);
    match state
        .redis
        .rate_limit_check(&key, state.config.login_attempts_per_window, state.config.login_window_secs)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(username = %username, "login rate limit exceeded");
            return Err(AppError::new(ErrorCode::RateLimited, "too many login attempts, try again later"));
        }
        Err(e) => tracing::warn!(error = %e, "login rate limiter unavailable"),
    }

    let mut conn = db::checkout(&state.db)?;

    let credential: Credential = credentials::table
        .filter(credentials::username.eq(&username))
        .first::<Credential>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::InvalidCredentials, "invalid username or password"))?;

    let valid = auth_service::verify_password(&req.password, &credential.password_hash)?;
    if !valid {
        return Err(AppError::new(ErrorCode::InvalidCredentials, "invalid username or password"));
    }

    diesel::update(credentials::table.filter(credentials::id.eq(credential.id)))
        .set(credentials::last_login_at.eq(Some(chrono::Utc::now())))
        .execute(&mut conn)?;

    let token_pair = token_service::issue_session(&mut conn, &state.config, &credential)?;

    if let Err(e) = state.redis.del(&key).await {
        tracing::debug!(error = %e, "failed to reset login attempts");
    }

    tracing::info!(user_id = %credential.id, "user logged in");

    Ok(Json(ApiResponse::ok(token_pair)))
}

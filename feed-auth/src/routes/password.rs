use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use feed_shared::clients::db;
use feed_shared::errors::{AppError, AppResult, ErrorCode};
use feed_shared::types::auth::AuthUser;
use feed_shared::types::ApiResponse;

use crate::models::Credential;
use crate::schema::{credentials, refresh_tokens};
use crate::services::auth_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

/// Changes the caller's password and signs out every other session.
pub async fn change_password(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    let mut conn = db::checkout(&state.db)?;

    let credential = credentials::table
        .find(user.id)
        .first::<Credential>(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::NotFound, "user not found"))?;

    if !auth_service::verify_password(&req.old_password, &credential.password_hash)? {
        return Err(AppError::new(ErrorCode::InvalidCredentials, "your old password was entered incorrectly"));
    }

    auth_service::confirm_password(&req.new_password, &req.new_password_confirm)?;
    auth_service::validate_password(&req.new_password, &credential.username)?;
    let password_hash = auth_service::hash_password(&req.new_password)?;

    let now = chrono::Utc::now();
    conn.transaction::<_, AppError, _>(|conn| {
        diesel::update(credentials::table.filter(credentials::id.eq(credential.id)))
            .set((
                credentials::password_hash.eq(&password_hash),
                credentials::updated_at.eq(now),
            ))
            .execute(conn)?;
        diesel::update(
            refresh_tokens::table
                .filter(refresh_tokens::credential_id.eq(credential.id))
                .filter(refresh_tokens::revoked_at.is_null()),
        )
        .set(refresh_tokens::revoked_at.eq(Some(now)))
        .execute(conn)?;
        Ok(())
    })?;

    tracing::info!(user_id = %credential.id, "password changed");

    Ok(Json(ApiResponse::ok("password changed")))
}

use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use feed_shared::clients::db;
use feed_shared::errors::{AppError, AppResult, ErrorCode};
use feed_shared::types::auth::TokenPair;
use feed_shared::types::ApiResponse;

use crate::models::{Credential, RefreshToken};
use crate::schema::{credentials, refresh_tokens};
use crate::services::token_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let token_hash = token_service::hash_token(&req.refresh_token);
    let mut conn = db::checkout(&state.db)?;

    let stored: RefreshToken = refresh_tokens::table
        .filter(refresh_tokens::token_hash.eq(&token_hash))
        .first::<RefreshToken>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::TokenInvalid, "invalid refresh token"))?;

    if stored.revoked_at.is_some() {
        tracing::warn!(credential_id = %stored.credential_id, "revoked refresh token presented");
        return Err(AppError::new(ErrorCode::RefreshTokenRevoked, "refresh token has been revoked"));
    }

    if stored.expires_at < chrono::Utc::now() {
        return Err(AppError::new(ErrorCode::TokenExpired, "refresh token expired"));
    }

    let credential: Credential = credentials::table
        .find(stored.credential_id)
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::InvalidCredentials, "credential not found"))?;

    // Rotate: the presented token is revoked in the same transaction that issues its successor.
    // Only one concurrent refresh can revoke a live token; the loser gets nothing.
    let token_pair = conn.transaction::<_, AppError, _>(|conn| {
        let revoked = diesel::update(
            refresh_tokens::table
                .filter(refresh_tokens::id.eq(stored.id))
                .filter(refresh_tokens::revoked_at.is_null()),
        )
        .set(refresh_tokens::revoked_at.eq(Some(chrono::Utc::now())))
        .execute(conn)?;
        ensure_rotated(revoked)?;
        token_service::issue_session(conn, &state.config, &credential)
    })?;

    Ok(Json(ApiResponse::ok(token_pair)))
}

/// The conditional revoke must have claimed the token for this request.
fn ensure_rotated(rows_revoked: usize) -> AppResult<()> {
    if rows_revoked == 0 {
        return Err(AppError::new(ErrorCode::RefreshTokenRevoked, "refresh token has been revoked"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn losing_a_concurrent_rotation_is_reported_as_revoked() {
        assert_eq!(ensure_rotated(0).unwrap_err().error_code(), ErrorCode::RefreshTokenRevoked);
        assert!(ensure_rotated(1).is_ok());
    }
}

use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use feed_shared::clients::db;
use feed_shared::errors::{AppError, AppResult, ErrorCode};
use feed_shared::types::auth::AuthUser;
use feed_shared::types::ApiResponse;

use crate::models::Credential;
use crate::schema::credentials;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: uuid::Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Credential> for MeResponse {
    fn from(credential: Credential) -> Self {
        Self {
            id: credential.id,
            username: credential.username,
            email: credential.email,
            role: credential.role,
            last_login_at: credential.last_login_at,
            created_at: credential.created_at,
        }
    }
}

pub async fn me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MeResponse>>> {
    let mut conn = db::checkout(&state.db)?;

    let credential = credentials::table
        .filter(credentials::id.eq(user.id))
        .first::<Credential>(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::NotFound, "user not found"))?;

    Ok(Json(ApiResponse::ok(MeResponse::from(credential))))
}

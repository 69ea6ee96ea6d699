use axum::extract::{Query, State};
use axum::Json;
use std::sync::Arc;

use feed_shared::clients::db;
use feed_shared::errors::AppResult;
use feed_shared::types::auth::AuthUser;
use feed_shared::types::{ApiResponse, Paginated, PaginationParams};

use crate::services::feed_service::{self, FeedEntry};
use crate::services::{profile_service, relationship_service};
use crate::AppState;

// --- GET /myfeed ---

pub async fn my_feed(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<FeedEntry>>>> {
    let mut conn = db::checkout(&state.db)?;
    let profile = profile_service::ensure_profile(&mut conn, &user)?;

    let feed = feed_service::load_feed(&mut conn, profile.id, &[profile.id], &params)?;
    Ok(Json(ApiResponse::ok(feed)))
}

// --- GET /friendsfeed ---

pub async fn friends_feed(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<FeedEntry>>>> {
    let mut conn = db::checkout(&state.db)?;
    let profile = profile_service::ensure_profile(&mut conn, &user)?;

    let friend_ids = relationship_service::load_friend_ids(&mut conn, profile.id)?;
    let feed = feed_service::load_feed(&mut conn, profile.id, &friend_ids, &params)?;
    Ok(Json(ApiResponse::ok(feed)))
}

use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use feed_shared::clients::db;
use feed_shared::errors::AppResult;
use feed_shared::types::auth::AuthUser;
use feed_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::NewLike;
use crate::routes::comments::find_post;
use crate::schema::likes;
use crate::services::{feed_service, profile_service};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    /// False when the caller had already liked the post.
    pub liked: bool,
    pub like_count: i64,
}

// --- POST /posts/:id/like ---

pub async fn like_post(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<LikeResponse>>> {
    let mut conn = db::checkout(&state.db)?;
    let post = find_post(&mut conn, post_id)?;
    let profile = profile_service::ensure_profile(&mut conn, &user)?;

    // The unique (author_id, post_id) index makes a repeated like a no-op.
    let inserted = diesel::insert_into(likes::table)
        .values(&NewLike { author_id: profile.id, post_id: post.id })
        .on_conflict_do_nothing()
        .execute(&mut conn)?;

    let like_count = feed_service::like_count(&mut conn, post.id)?;
    let liked = inserted > 0;

    if liked {
        tracing::debug!(post_id = %post.id, liker_id = %profile.id, "post liked");
        publisher::publish_post_liked(
            &state.rabbitmq,
            user.id,
            post.id,
            post.author_id,
            profile.id,
            &profile.username,
        )
        .await;
    }

    Ok(Json(ApiResponse::ok(LikeResponse { liked, like_count })))
}

use axum::extract::{Path, State};
use axum::Json;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use feed_shared::clients::db;
use feed_shared::errors::{AppError, AppResult, ErrorCode};
use feed_shared::types::auth::AuthUser;
use feed_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{Comment, NewComment, Post};
use crate::schema::{comments, posts};
use crate::services::{post_service, profile_service};
use crate::AppState;

const PREVIEW_CHARS: usize = 80;

pub(crate) fn find_post(conn: &mut PgConnection, post_id: Uuid) -> AppResult<Post> {
    posts::table
        .filter(posts::id.eq(post_id))
        .first::<Post>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::PostNotFound, "post not found"))
}

#[derive(Debug, Serialize)]
pub struct PostComments {
    pub post: Post,
    pub comments: Vec<Comment>,
}

// --- GET /posts/:id/comments ---

pub async fn list_comments(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PostComments>>> {
    let mut conn = db::checkout(&state.db)?;
    let post = find_post(&mut conn, post_id)?;

    let comments = comments::table
        .filter(comments::post_id.eq(post.id))
        .order((comments::date_added.asc(), comments::id.asc()))
        .load::<Comment>(&mut conn)?;

    Ok(Json(ApiResponse::ok(PostComments { post, comments })))
}

// --- POST /posts/:id/comments ---

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

pub async fn add_comment(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    let text = post_service::clean_comment(&req.text)?;
    let mut conn = db::checkout(&state.db)?;
    let post = find_post(&mut conn, post_id)?;
    let profile = profile_service::ensure_profile(&mut conn, &user)?;

    let comment = diesel::insert_into(comments::table)
        .values(&NewComment {
            post_id: post.id,
            author_id: profile.id,
            text,
        })
        .get_result::<Comment>(&mut conn)?;

    publisher::publish_comment_added(
        &state.rabbitmq,
        user.id,
        comment.id,
        post.id,
        profile.id,
        post_service::preview(&comment.text, PREVIEW_CHARS),
    )
    .await;

    Ok(Json(ApiResponse::ok(comment)))
}

use axum::extract::{Multipart, State};
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use feed_shared::clients::db;
use feed_shared::errors::{AppError, AppResult, ErrorCode};
use feed_shared::types::auth::AuthUser;
use feed_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{NewPost, Post};
use crate::schema::posts;
use crate::services::{post_service, profile_service};
use crate::AppState;

struct ImageUpload {
    content_type: String,
    ext: &'static str,
    data: Vec<u8>,
}

/// The parts of the post form, read before anything is stored.
#[derive(Default)]
struct PostForm {
    description: Option<String>,
    image: Option<ImageUpload>,
}

async fn read_form(mut multipart: Multipart, max_image_bytes: usize) -> AppResult<PostForm> {
    let mut form = PostForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(ErrorCode::ValidationError, format!("multipart error: {e}")))?
    {
        match field.name() {
            Some("description") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::new(ErrorCode::ValidationError, format!("failed to read description: {e}")))?;
                form.description = Some(text);
            }
            Some("image") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::new(ErrorCode::ImageUploadFailed, format!("failed to read file data: {e}")))?;

                // Browsers submit an empty part when no file was chosen.
                if data.is_empty() {
                    continue;
                }
                if data.len() > max_image_bytes {
                    return Err(AppError::new(
                        ErrorCode::PayloadTooLarge,
                        format!("image must be at most {max_image_bytes} bytes"),
                    ));
                }

                let ext = post_service::image_extension(&content_type).ok_or_else(|| {
                    AppError::new(
                        ErrorCode::ImageUploadFailed,
                        "unsupported image format, accepted: jpeg, png, webp, gif",
                    )
                })?;

                form.image = Some(ImageUpload { content_type, ext, data: data.to_vec() });
            }
            _ => {}
        }
    }

    Ok(form)
}

// --- POST /posts ---

pub async fn new_post(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Post>>> {
    let form = read_form(multipart, state.config.max_image_bytes).await?;
    let description = post_service::clean_description(form.description.as_deref(), form.image.is_some())?;

    let mut conn = db::checkout(&state.db)?;
    let profile = profile_service::ensure_profile(&mut conn, &user)?;

    let (image_key, image_url) = match form.image {
        Some(image) => {
            let key = format!("posts/{}/{}.{}", profile.id, Uuid::now_v7(), image.ext);
            let url = state
                .minio
                .upload(&key, image.data, &image.content_type)
                .await
                .map_err(|e| AppError::new(ErrorCode::ImageUploadFailed, e))?;
            (Some(key), Some(url))
        }
        None => (None, None),
    };

    let inserted = diesel::insert_into(posts::table)
        .values(&NewPost {
            author_id: profile.id,
            description,
            image_url,
        })
        .get_result::<Post>(&mut conn);

    let post = match inserted {
        Ok(post) => post,
        Err(e) => {
            // Don't leave an orphaned object behind.
            if let Some(key) = image_key {
                if let Err(cleanup) = state.minio.delete(&key).await {
                    tracing::warn!(error = %cleanup, key = %key, "failed to remove uploaded image");
                }
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        post_id = %post.id,
        author_id = %profile.id,
        has_image = post.image_url.is_some(),
        "post created"
    );

    publisher::publish_post_created(
        &state.rabbitmq,
        user.id,
        post.id,
        profile.id,
        post.image_url.is_some(),
    )
    .await;

    Ok(Json(ApiResponse::ok_with_message(post, "post created")))
}

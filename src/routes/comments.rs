// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Comment routes.

use crate::db::new_object_id;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Comment, CommentView};
use crate::routes::extract::{non_blank, parse_id, ValidJson, ValidQuery};
use crate::routes::response::ApiResponse;
use crate::services::read_model::{self, DEFAULT_PAGE_SIZE};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Extension, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/comments/{video_id}", get(list_comments).post(add_comment))
        .route(
            "/comments/c/{comment_id}",
            patch(update_comment).delete(delete_comment),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct PageQuery {
    #[validate(range(
        min = 1,
        max = 10000,
        message = "page must be between 1 and 10000"
    ))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(custom(function = "non_blank", message = "content is required"))]
    pub content: String,
}

async fn list_comments(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(video_id): Path<String>,
    ValidQuery(query): ValidQuery<PageQuery>,
) -> Result<ApiResponse<Vec<CommentView>>> {
    let video_id = parse_id(&video_id, "video")?;
    if state
        .db
        .get_visible_video(video_id, &auth.user_id)
        .await?
        .is_none()
    {
        return Err(AppError::not_found("Video"));
    }

    let comments = read_model::video_comments(
        &state.db,
        video_id,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )
    .await?;

    Ok(ApiResponse::ok(comments, "Comments fetched successfully"))
}

async fn add_comment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(video_id): Path<String>,
    ValidJson(body): ValidJson<CommentRequest>,
) -> Result<ApiResponse<Comment>> {
    let video_id = parse_id(&video_id, "video")?;
    if state
        .db
        .get_visible_video(video_id, &auth.user_id)
        .await?
        .is_none()
    {
        return Err(AppError::not_found("Video"));
    }

    let now = now_rfc3339();
    let comment = Comment {
        id: new_object_id(),
        content: body.content.trim().to_string(),
        video: video_id.to_string(),
        owner: auth.user_id,
        created_at: now.clone(),
        updated_at: now,
    };
    let comment = state.db.create_comment(&comment).await?;

    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

async fn update_comment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(comment_id): Path<String>,
    ValidJson(body): ValidJson<CommentRequest>,
) -> Result<ApiResponse<Comment>> {
    let comment_id = parse_id(&comment_id, "comment")?;

    let comment = state
        .db
        .update_comment(comment_id, &auth.user_id, body.content.trim())
        .await?
        .ok_or_else(|| AppError::not_found("Comment"))?;

    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(comment_id): Path<String>,
) -> Result<ApiResponse<Value>> {
    let comment_id = parse_id(&comment_id, "comment")?;

    state
        .db
        .delete_comment(comment_id, &auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment"))?;

    Ok(ApiResponse::ok(json!({}), "Comment deleted successfully"))
}

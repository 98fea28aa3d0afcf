// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Like toggles and liked videos.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{LikeTarget, VideoSummary};
use crate::routes::extract::parse_id;
use crate::routes::response::ApiResponse;
use crate::services::read_model;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/likes/toggle/v/{video_id}", post(toggle_video_like))
        .route("/likes/toggle/c/{comment_id}", post(toggle_comment_like))
        .route("/likes/toggle/t/{tweet_id}", post(toggle_tweet_like))
        .route("/likes/videos", get(liked_videos))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub is_liked: bool,
}

async fn toggle(
    state: &AppState,
    user_id: &str,
    target: LikeTarget,
    id: &str,
) -> Result<ApiResponse<LikeState>> {
    let id = parse_id(id, target.field())?;
    let exists = match target {
        LikeTarget::Video => state.db.get_visible_video(id, user_id).await?.is_some(),
        LikeTarget::Comment | LikeTarget::Tweet => state.db.target_exists(target, id).await?,
    };
    if !exists {
        return Err(AppError::not_found(target.label()));
    }

    let is_liked = state.db.toggle_like(user_id, target, id).await?;
    tracing::debug!(user_id, target = target.field(), id, is_liked, "Like toggled");

    let message = if is_liked {
        format!("{} liked", target.label())
    } else {
        format!("{} unliked", target.label())
    };
    Ok(ApiResponse::ok(LikeState { is_liked }, message))
}

async fn toggle_video_like(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<LikeState>> {
    toggle(&state, &auth.user_id, LikeTarget::Video, &video_id).await
}

async fn toggle_comment_like(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(comment_id): Path<String>,
) -> Result<ApiResponse<LikeState>> {
    toggle(&state, &auth.user_id, LikeTarget::Comment, &comment_id).await
}

async fn toggle_tweet_like(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(tweet_id): Path<String>,
) -> Result<ApiResponse<LikeState>> {
    toggle(&state, &auth.user_id, LikeTarget::Tweet, &tweet_id).await
}

async fn liked_videos(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<VideoSummary>>> {
    let videos = read_model::liked_videos(&state.db, &auth.user_id).await?;
    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}

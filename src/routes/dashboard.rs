// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Channel owner dashboard.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{ChannelStats, VideoSummary};
use crate::routes::response::ApiResponse;
use crate::services::read_model;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard/stats", get(channel_stats))
        .route("/dashboard/videos", get(channel_videos))
}

async fn channel_stats(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<ChannelStats>> {
    let stats = read_model::channel_stats(&state.db, &auth.user_id).await?;
    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

async fn channel_videos(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<VideoSummary>>> {
    let videos = read_model::channel_videos(&state.db, &auth.user_id).await?;
    Ok(ApiResponse::ok(videos, "Channel videos fetched successfully"))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video routes.

use crate::db::{new_object_id, Patch, SortOrder};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Video, VideoPage, VideoSummary};
use crate::routes::extract::{non_blank, parse_id, ValidJson, ValidQuery};
use crate::routes::response::ApiResponse;
use crate::services::read_model::{self, VideoListParams, VideoSortField, DEFAULT_PAGE_SIZE};
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
        .route("/videos", get(list_videos).post(publish_video))
        .route(
            "/videos/{video_id}",
            get(get_video).patch(update_video).delete(delete_video),
        )
        .route("/videos/toggle/publish/{video_id}", patch(toggle_publish))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListVideosQuery {
    #[validate(range(
        min = 1,
        max = 10000,
        message = "page must be between 1 and 10000"
    ))]
    pub page: Option<u64>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u64>,
    /// Search text for title and description
    pub query: Option<String>,
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub sort_type: Option<String>,
    /// Restrict to one channel
    pub user_id: Option<String>,
}

impl ListVideosQuery {
    fn into_params(self) -> Result<VideoListParams> {
        let sort_by = match self.sort_by.as_deref() {
            None => VideoSortField::default(),
            Some(field) => VideoSortField::parse(field)
                .ok_or_else(|| AppError::Validation(format!("Cannot sort by '{}'", field)))?,
        };
        let sort_order = match self.sort_type.as_deref() {
            None | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "sortType must be 'asc' or 'desc', got '{}'",
                    other
                )))
            }
        };
        let owner = match self.user_id {
            Some(id) => Some(parse_id(&id, "user")?.to_string()),
            None => None,
        };

        Ok(VideoListParams {
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            search: self.query,
            owner,
            sort_by,
            sort_order,
        })
    }
}

async fn list_videos(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidQuery(query): ValidQuery<ListVideosQuery>,
) -> Result<ApiResponse<VideoPage>> {
    let params = query.into_params()?;
    let page = read_model::list_videos(&state.db, &auth.user_id, &params).await?;
    Ok(ApiResponse::ok(page, "Videos fetched successfully"))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PublishVideoRequest {
    #[validate(custom(function = "non_blank", message = "title is required"))]
    pub title: String,
    #[validate(custom(function = "non_blank", message = "description is required"))]
    pub description: String,
    #[validate(url(message = "videoFile must be a URL"))]
    pub video_file: String,
    #[validate(url(message = "thumbnail must be a URL"))]
    pub thumbnail: String,
    #[validate(range(min = 0.0, message = "duration must not be negative"))]
    pub duration: f64,
    pub is_published: Option<bool>,
}

async fn publish_video(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(body): ValidJson<PublishVideoRequest>,
) -> Result<ApiResponse<Video>> {
    let now = now_rfc3339();
    let video = Video {
        id: new_object_id(),
        video_file: body.video_file,
        thumbnail: body.thumbnail,
        title: body.title.trim().to_string(),
        description: body.description.trim().to_string(),
        duration: body.duration,
        views: 0,
        is_published: body.is_published.unwrap_or(true),
        owner: auth.user_id.clone(),
        created_at: now.clone(),
        updated_at: now,
    };

    let video = state.db.create_video(&video).await?;
    tracing::info!(video_id = %video.id, owner = %auth.user_id, "Video published");

    Ok(ApiResponse::created(video, "Video published successfully"))
}

/// Fetch a video. Counts a view and records it in the viewer's history.
async fn get_video(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<VideoSummary>> {
    let video_id = parse_id(&video_id, "video")?;

    let mut video = read_model::video_detail(&state.db, video_id, &auth.user_id).await?;
    state.db.record_view(video_id).await?;
    state
        .db
        .add_to_watch_history(&auth.user_id, video_id)
        .await?;
    video.views += 1;

    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVideoRequest {
    #[validate(custom(function = "non_blank", message = "title cannot be blank"))]
    pub title: Option<String>,
    #[validate(custom(function = "non_blank", message = "description cannot be blank"))]
    pub description: Option<String>,
    #[validate(url(message = "thumbnail must be a URL"))]
    pub thumbnail: Option<String>,
}

async fn update_video(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(video_id): Path<String>,
    ValidJson(body): ValidJson<UpdateVideoRequest>,
) -> Result<ApiResponse<Video>> {
    let video_id = parse_id(&video_id, "video")?;

    let mut patch = Patch::new();
    if let Some(title) = body.title {
        patch = patch.set("title", title.trim());
    }
    if let Some(description) = body.description {
        patch = patch.set("description", description.trim());
    }
    if let Some(thumbnail) = body.thumbnail {
        patch = patch.set("thumbnail", thumbnail);
    }
    if patch.is_empty() {
        return Err(AppError::Validation(
            "title, description or thumbnail is required".to_string(),
        ));
    }

    let video = state
        .db
        .update_video(video_id, &auth.user_id, patch)
        .await?
        .ok_or_else(|| AppError::not_found("Video"))?;

    Ok(ApiResponse::ok(video, "Video updated successfully"))
}

/// Delete a video. Likes, comments and playlist entries pointing at it
/// are left in place; read models skip them.
async fn delete_video(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Value>> {
    let video_id = parse_id(&video_id, "video")?;

    state
        .db
        .delete_video(video_id, &auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Video"))?;
    tracing::info!(video_id, owner = %auth.user_id, "Video deleted");

    Ok(ApiResponse::ok(json!({}), "Video deleted successfully"))
}

async fn toggle_publish(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<ApiResponse<Video>> {
    let video_id = parse_id(&video_id, "video")?;

    let current = state
        .db
        .get_video(video_id)
        .await?
        .filter(|v| v.owner == auth.user_id)
        .ok_or_else(|| AppError::not_found("Video"))?;

    let video = state
        .db
        .update_video(
            video_id,
            &auth.user_id,
            Patch::new().set("isPublished", !current.is_published),
        )
        .await?
        .ok_or_else(|| AppError::not_found("Video"))?;

    Ok(ApiResponse::ok(
        video,
        "Video publish status toggled successfully",
    ))
}

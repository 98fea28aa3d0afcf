// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Playlist routes.

use crate::db::{new_object_id, Patch};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Playlist;
use crate::routes::extract::{non_blank, parse_id, ValidJson};
use crate::routes::response::ApiResponse;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Extension, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/playlist", post(create_playlist))
        .route("/playlist/user/{user_id}", get(user_playlists))
        .route(
            "/playlist/{playlist_id}",
            get(get_playlist).patch(update_playlist).delete(delete_playlist),
        )
        .route("/playlist/add/{video_id}/{playlist_id}", patch(add_video))
        .route("/playlist/remove/{video_id}/{playlist_id}", patch(remove_video))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlaylistRequest {
    #[validate(custom(function = "non_blank", message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePlaylistRequest {
    #[validate(custom(function = "non_blank", message = "name cannot be blank"))]
    pub name: Option<String>,
    pub description: Option<String>,
}

async fn create_playlist(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(body): ValidJson<CreatePlaylistRequest>,
) -> Result<ApiResponse<Playlist>> {
    let now = now_rfc3339();
    let playlist = Playlist {
        id: new_object_id(),
        name: body.name.trim().to_string(),
        description: body.description.unwrap_or_default().trim().to_string(),
        videos: Vec::new(),
        owner: auth.user_id,
        created_at: now.clone(),
        updated_at: now,
    };
    let playlist = state.db.create_playlist(&playlist).await?;

    Ok(ApiResponse::created(playlist, "Playlist created successfully"))
}

async fn user_playlists(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<Vec<Playlist>>> {
    let user_id = parse_id(&user_id, "user")?;
    let playlists = state.db.playlists_by_owner(user_id).await?;
    Ok(ApiResponse::ok(playlists, "Playlists fetched successfully"))
}

async fn get_playlist(
    State(state): State<Arc<AppState>>,
    Path(playlist_id): Path<String>,
) -> Result<ApiResponse<Playlist>> {
    let playlist_id = parse_id(&playlist_id, "playlist")?;
    let playlist = state
        .db
        .get_playlist(playlist_id)
        .await?
        .ok_or_else(|| AppError::not_found("Playlist"))?;

    Ok(ApiResponse::ok(playlist, "Playlist fetched successfully"))
}

async fn update_playlist(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
    ValidJson(body): ValidJson<UpdatePlaylistRequest>,
) -> Result<ApiResponse<Playlist>> {
    let playlist_id = parse_id(&playlist_id, "playlist")?;

    let mut patch = Patch::new();
    if let Some(name) = body.name {
        patch = patch.set("name", name.trim());
    }
    if let Some(description) = body.description {
        patch = patch.set("description", description.trim());
    }
    if patch.is_empty() {
        return Err(AppError::Validation(
            "name or description is required".to_string(),
        ));
    }

    let playlist = state
        .db
        .update_playlist(playlist_id, &auth.user_id, patch)
        .await?
        .ok_or_else(|| AppError::not_found("Playlist"))?;

    Ok(ApiResponse::ok(playlist, "Playlist updated successfully"))
}

async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
) -> Result<ApiResponse<Value>> {
    let playlist_id = parse_id(&playlist_id, "playlist")?;

    state
        .db
        .delete_playlist(playlist_id, &auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Playlist"))?;

    Ok(ApiResponse::ok(json!({}), "Playlist deleted successfully"))
}

async fn add_video(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<ApiResponse<Playlist>> {
    let video_id = parse_id(&video_id, "video")?;
    let playlist_id = parse_id(&playlist_id, "playlist")?;
    if state
        .db
        .get_visible_video(video_id, &auth.user_id)
        .await?
        .is_none()
    {
        return Err(AppError::not_found("Video"));
    }

    let playlist = state
        .db
        .update_playlist(
            playlist_id,
            &auth.user_id,
            Patch::new().add_to_set("videos", video_id),
        )
        .await?
        .ok_or_else(|| AppError::not_found("Playlist"))?;

    Ok(ApiResponse::ok(playlist, "Video added to playlist"))
}

async fn remove_video(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<ApiResponse<Playlist>> {
    let video_id = parse_id(&video_id, "video")?;
    let playlist_id = parse_id(&playlist_id, "playlist")?;

    let playlist = state
        .db
        .update_playlist(
            playlist_id,
            &auth.user_id,
            Patch::new().pull("videos", video_id),
        )
        .await?
        .ok_or_else(|| AppError::not_found("Playlist"))?;

    Ok(ApiResponse::ok(playlist, "Video removed from playlist"))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Channel subscription routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ChannelEntry, SubscriberEntry};
use crate::routes::extract::parse_id;
use crate::routes::response::ApiResponse;
use crate::services::read_model;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/subscriptions/c/{channel_id}",
            get(channel_subscribers).post(toggle_subscription),
        )
        .route("/subscriptions/u/{subscriber_id}", get(subscribed_channels))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub is_subscribed: bool,
}

async fn toggle_subscription(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<SubscriptionState>> {
    let channel_id = parse_id(&channel_id, "channel")?;
    if channel_id == auth.user_id {
        return Err(AppError::Validation(
            "You cannot subscribe to your own channel".to_string(),
        ));
    }
    if state.db.get_user(channel_id).await?.is_none() {
        return Err(AppError::not_found("Channel"));
    }

    let is_subscribed = state
        .db
        .toggle_subscription(&auth.user_id, channel_id)
        .await?;
    tracing::debug!(
        subscriber = %auth.user_id,
        channel = channel_id,
        is_subscribed,
        "Subscription toggled"
    );

    let message = if is_subscribed {
        "Subscribed successfully"
    } else {
        "Unsubscribed successfully"
    };
    Ok(ApiResponse::ok(SubscriptionState { is_subscribed }, message))
}

async fn channel_subscribers(
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> Result<ApiResponse<Vec<SubscriberEntry>>> {
    let channel_id = parse_id(&channel_id, "channel")?;
    let subscribers = read_model::channel_subscribers(&state.db, channel_id).await?;
    Ok(ApiResponse::ok(
        subscribers,
        "Subscribers fetched successfully",
    ))
}

async fn subscribed_channels(
    State(state): State<Arc<AppState>>,
    Path(subscriber_id): Path<String>,
) -> Result<ApiResponse<Vec<ChannelEntry>>> {
    let subscriber_id = parse_id(&subscriber_id, "subscriber")?;
    let channels = read_model::subscribed_channels(&state.db, subscriber_id).await?;
    Ok(ApiResponse::ok(
        channels,
        "Subscribed channels fetched successfully",
    ))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tweet routes.

use crate::db::new_object_id;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Tweet;
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
        .route("/tweets", post(create_tweet))
        .route("/tweets/user/{user_id}", get(user_tweets))
        .route("/tweets/{tweet_id}", patch(update_tweet).delete(delete_tweet))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TweetRequest {
    #[validate(
        custom(function = "non_blank", message = "content is required"),
        length(max = 280, message = "content must be at most 280 characters")
    )]
    pub content: String,
}

async fn create_tweet(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(body): ValidJson<TweetRequest>,
) -> Result<ApiResponse<Tweet>> {
    let now = now_rfc3339();
    let tweet = Tweet {
        id: new_object_id(),
        content: body.content.trim().to_string(),
        owner: auth.user_id,
        created_at: now.clone(),
        updated_at: now,
    };
    let tweet = state.db.create_tweet(&tweet).await?;

    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

/// A user's tweets, newest first. Unknown users simply have none.
async fn user_tweets(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<Vec<Tweet>>> {
    let user_id = parse_id(&user_id, "user")?;
    let tweets = state.db.tweets_by_owner(user_id).await?;
    Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

async fn update_tweet(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(tweet_id): Path<String>,
    ValidJson(body): ValidJson<TweetRequest>,
) -> Result<ApiResponse<Tweet>> {
    let tweet_id = parse_id(&tweet_id, "tweet")?;

    let tweet = state
        .db
        .update_tweet(tweet_id, &auth.user_id, body.content.trim())
        .await?
        .ok_or_else(|| AppError::not_found("Tweet"))?;

    Ok(ApiResponse::ok(tweet, "Tweet updated successfully"))
}

async fn delete_tweet(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(tweet_id): Path<String>,
) -> Result<ApiResponse<Value>> {
    let tweet_id = parse_id(&tweet_id, "tweet")?;

    state
        .db
        .delete_tweet(tweet_id, &auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Tweet"))?;

    Ok(ApiResponse::ok(json!({}), "Tweet deleted successfully"))
}

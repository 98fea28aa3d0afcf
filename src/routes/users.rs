// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account, session and channel routes.

use crate::db::repository::NewUser;
use crate::db::Patch;
use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::models::{ChannelProfile, PublicUser, VideoSummary};
use crate::routes::extract::{non_blank, ValidJson};
use crate::routes::response::ApiResponse;
use crate::services::{read_model, TokenPair};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, patch, post},
    Extension, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Routes reachable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/refresh-token", post(refresh_token))
}

/// Routes that require a session (auth applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/logout", post(logout))
        .route("/users/current-user", get(current_user))
        .route("/users/update-account", patch(update_account))
        .route("/users/change-password", post(change_password))
        .route("/users/avatar", patch(update_avatar))
        .route("/users/cover-image", patch(update_cover_image))
        .route("/users/c/{username}", get(channel_profile))
        .route("/users/history", get(watch_history))
}

// ─── Cookies ─────────────────────────────────────────────────

fn session_cookie(
    name: &'static str,
    value: String,
    ttl: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(ttl.as_secs() as i64))
        .build()
}

fn with_session_cookies(jar: CookieJar, state: &AppState, pair: &TokenPair) -> CookieJar {
    let secure = state.config.cookie_secure;
    jar.add(session_cookie(
        ACCESS_COOKIE,
        pair.access_token.clone(),
        state.tokens.access_ttl(),
        secure,
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        pair.refresh_token.clone(),
        state.tokens.refresh_ttl(),
        secure,
    ))
}

/// Overwrite both cookies with expired ones carrying the same attributes.
fn without_session_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, String::new(), Duration::ZERO, secure))
        .add(session_cookie(REFRESH_COOKIE, String::new(), Duration::ZERO, secure))
}

// ─── Registration & Login ────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(custom(function = "non_blank", message = "fullname is required"))]
    pub fullname: String,
    #[validate(email(message = "email is invalid"))]
    pub email: String,
    #[validate(custom(function = "username_rules"))]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "password must be 8-128 characters"))]
    pub password: String,
    #[validate(url(message = "avatar must be a URL"))]
    pub avatar: String,
    #[validate(url(message = "coverImage must be a URL"))]
    pub cover_image: Option<String>,
}

/// Length and charset of the username as it will be stored (trimmed).
fn username_rules(value: &str) -> std::result::Result<(), validator::ValidationError> {
    let username = value.trim();
    if !(3..=30).contains(&username.chars().count()) {
        return Err(validator::ValidationError::new("username_length")
            .with_message("username must be 3-30 characters".into()));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(validator::ValidationError::new("username_chars")
            .with_message("username may only contain letters, digits, '_' and '.'".into()));
    }
    Ok(())
}

async fn register(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> Result<ApiResponse<PublicUser>> {
    let password_hash = state.passwords.hash(&body.password).await?;

    let user = state
        .db
        .create_user(NewUser {
            username: body.username,
            email: body.email,
            fullname: body.fullname,
            password_hash,
            avatar: body.avatar,
            cover_image: body.cover_image.unwrap_or_default(),
        })
        .await?;

    Ok(ApiResponse::created(
        user.to_public(),
        "User registered successfully",
    ))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>)> {
    let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    if !has(&body.username) && !has(&body.email) {
        return Err(AppError::Validation(
            "username or email is required".to_string(),
        ));
    }

    let user = state
        .db
        .find_user_by_login(body.username.as_deref(), body.email.as_deref())
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    if !state.passwords.verify(&body.password, &user.password).await? {
        tracing::info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AppError::Unauthorized(
            "Invalid user credentials".to_string(),
        ));
    }

    let pair = state.tokens.issue_token_pair(&user.id).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    let jar = with_session_cookies(jar, &state, &pair);
    Ok((
        jar,
        ApiResponse::ok(
            LoginResponse {
                user: user.to_public(),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

/// Rotate the refresh token from the cookie or, failing that, the body.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<TokenPair>)> {
    let from_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?
            .refresh_token
    };

    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or(from_body)
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

    let pair = state.tokens.rotate_refresh_token(&presented).await?;

    let jar = with_session_cookies(jar, &state, &pair);
    Ok((jar, ApiResponse::ok(pair, "Access token refreshed")))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<Value>)> {
    state.tokens.revoke_session(&auth.user_id).await?;
    tracing::info!(user_id = %auth.user_id, "User logged out");

    let jar = without_session_cookies(jar, state.config.cookie_secure);
    Ok((jar, ApiResponse::ok(json!({}), "User logged out")))
}

// ─── Account ─────────────────────────────────────────────────

async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<PublicUser>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(ApiResponse::ok(
        user.to_public(),
        "Current user fetched successfully",
    ))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[validate(custom(function = "non_blank", message = "fullname cannot be blank"))]
    pub fullname: Option<String>,
    #[validate(email(message = "email is invalid"))]
    pub email: Option<String>,
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(body): ValidJson<UpdateAccountRequest>,
) -> Result<ApiResponse<PublicUser>> {
    if body.fullname.is_none() && body.email.is_none() {
        return Err(AppError::Validation(
            "fullname or email is required".to_string(),
        ));
    }

    let user = state
        .db
        .update_account(&auth.user_id, body.fullname.as_deref(), body.email.as_deref())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(ApiResponse::ok(
        user.to_public(),
        "Account details updated successfully",
    ))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "oldPassword is required"))]
    pub old_password: String,
    #[validate(length(min = 8, max = 128, message = "newPassword must be 8-128 characters"))]
    pub new_password: String,
}

/// Change the password. The refresh token is revoked, so other sessions
/// end once their access tokens expire.
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(body): ValidJson<ChangePasswordRequest>,
) -> Result<ApiResponse<Value>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    if !state.passwords.verify(&body.old_password, &user.password).await? {
        return Err(AppError::Validation("Invalid old password".to_string()));
    }

    let hash = state.passwords.hash(&body.new_password).await?;
    if !state.db.set_password(&user.id, &hash).await? {
        return Err(AppError::not_found("User"));
    }
    tracing::info!(user_id = %user.id, "Password changed");

    Ok(ApiResponse::ok(json!({}), "Password changed successfully"))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AvatarRequest {
    #[validate(url(message = "avatar must be a URL"))]
    pub avatar: String,
}

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(body): ValidJson<AvatarRequest>,
) -> Result<ApiResponse<PublicUser>> {
    let user = state
        .db
        .update_user(&auth.user_id, Patch::new().set("avatar", body.avatar))
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(ApiResponse::ok(user.to_public(), "Avatar updated successfully"))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CoverImageRequest {
    #[validate(url(message = "coverImage must be a URL"))]
    pub cover_image: String,
}

async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(body): ValidJson<CoverImageRequest>,
) -> Result<ApiResponse<PublicUser>> {
    let user = state
        .db
        .update_user(
            &auth.user_id,
            Patch::new().set("coverImage", body.cover_image),
        )
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(ApiResponse::ok(
        user.to_public(),
        "Cover image updated successfully",
    ))
}

// ─── Channel & History ───────────────────────────────────────

async fn channel_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(username): Path<String>,
) -> Result<ApiResponse<ChannelProfile>> {
    let profile = read_model::channel_profile(&state.db, &auth.user_id, &username).await?;
    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

async fn watch_history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<VideoSummary>>> {
    let videos: Vec<VideoSummary> = read_model::watch_history(&state.db, &auth.user_id)
        .await?
        .try_collect()
        .await?;

    Ok(ApiResponse::ok(
        videos,
        "Watch history fetched successfully",
    ))
}

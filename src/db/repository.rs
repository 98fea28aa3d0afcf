// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed operations over the document store.

use super::query::{Document, Filter, Patch, Pipeline, SortOrder, ID_FIELD};
use super::{collections, DocumentStore};
use crate::error::AppError;
use crate::models::{Comment, Like, LikeTarget, Playlist, Subscription, Tweet, User, Video};
use crate::time_utils::now_rfc3339;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Fields that only the owning user's own operations may touch.
pub const CREDENTIAL_FIELDS: [&str; 2] = ["password", "refreshToken"];

/// Store handle shared by handlers and services.
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn DocumentStore>,
}

/// Input for [`Db::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password_hash: String,
    pub avatar: String,
    pub cover_image: String,
}

fn encode<T: Serialize>(value: &T) -> Result<Document, AppError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Database("Record is not a document".to_string())),
        Err(e) => Err(AppError::Database(format!("Encode error: {}", e))),
    }
}

fn decode<T: DeserializeOwned>(document: Document) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| AppError::Database(format!("Decode error: {}", e)))
}

fn owned_by(id: &str, owner: &str) -> Filter {
    Filter::and([Filter::id(id), Filter::eq("owner", owner)])
}

/// Videos `viewer` may see: everything published plus their own drafts.
pub fn visible_to(viewer: &str) -> Filter {
    Filter::or([
        Filter::eq("isPublished", true),
        Filter::eq("owner", viewer),
    ])
}

impl Db {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create the unique indexes the user invariants depend on.
    pub async fn init_indexes(&self) -> Result<(), AppError> {
        self.store
            .ensure_unique_index(collections::USERS, "username")
            .await?;
        self.store
            .ensure_unique_index(collections::USERS, "email")
            .await?;
        tracing::info!("Indexes initialized");
        Ok(())
    }

    // ─── Generic Helpers ─────────────────────────────────────────

    async fn insert<T: Serialize + DeserializeOwned>(
        &self,
        collection: &str,
        record: &T,
    ) -> Result<T, AppError> {
        decode(self.store.create(collection, encode(record)?).await?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, AppError> {
        self.store
            .find_by_id(collection, id)
            .await?
            .map(decode)
            .transpose()
    }

    async fn find_all<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
        sort: &[(&str, SortOrder)],
    ) -> Result<Vec<T>, AppError> {
        self.store
            .find(collection, filter, sort)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn update_where<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Patch,
    ) -> Result<Option<T>, AppError> {
        self.store
            .find_one_and_update(collection, filter, &patch.touch())
            .await?
            .map(decode)
            .transpose()
    }

    async fn delete_where<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<T>, AppError> {
        self.store
            .find_one_and_delete(collection, filter)
            .await?
            .map(decode)
            .transpose()
    }

    /// Run a pipeline and decode every result.
    pub async fn aggregate_as<T: DeserializeOwned + Send + 'static>(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<T>, AppError> {
        self.aggregate_stream(collection, pipeline)
            .await?
            .try_collect()
            .await
    }

    /// Run a pipeline, decoding results lazily as they arrive.
    pub async fn aggregate_stream<T: DeserializeOwned + Send + 'static>(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<BoxStream<'static, Result<T, AppError>>, AppError> {
        Ok(self
            .store
            .aggregate(collection, pipeline)
            .await?
            .and_then(|document| async move { decode(document) })
            .boxed())
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Create a user. Username and email are stored lowercase.
    ///
    /// Fails with [`AppError::Conflict`] when either is taken.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let username = new_user.username.trim().to_lowercase();
        let email = new_user.email.trim().to_lowercase();

        let taken = Filter::or([
            Filter::eq("username", username.as_str()),
            Filter::eq("email", email.as_str()),
        ]);
        if self.store.find_one(collections::USERS, &taken).await?.is_some() {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let now = now_rfc3339();
        let user = User {
            id: super::new_object_id(),
            username,
            email,
            fullname: new_user.fullname.trim().to_string(),
            password: new_user.password_hash,
            avatar: new_user.avatar,
            cover_image: new_user.cover_image,
            watch_history: Vec::new(),
            refresh_token: None,
            created_at: now.clone(),
            updated_at: now,
        };

        let user = self.insert(collections::USERS, &user).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get(collections::USERS, user_id).await
    }

    /// Look a user up by username or email (either may be absent).
    pub async fn find_user_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let mut alternatives = Vec::new();
        if let Some(username) = username.map(str::trim).filter(|u| !u.is_empty()) {
            alternatives.push(Filter::eq("username", username.to_lowercase()));
        }
        if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
            alternatives.push(Filter::eq("email", email.to_lowercase()));
        }
        if alternatives.is_empty() {
            return Ok(None);
        }

        self.store
            .find_one(collections::USERS, &Filter::or(alternatives))
            .await?
            .map(decode)
            .transpose()
    }

    /// Patch a user, returning the updated record.
    pub async fn update_user(&self, user_id: &str, patch: Patch) -> Result<Option<User>, AppError> {
        self.update_where(collections::USERS, &Filter::id(user_id), patch)
            .await
    }

    /// Change a user's email and/or full name.
    ///
    /// An email already used by another account is a conflict.
    pub async fn update_account(
        &self,
        user_id: &str,
        fullname: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let mut patch = Patch::new();
        if let Some(fullname) = fullname {
            patch = patch.set("fullname", fullname.trim());
        }
        if let Some(email) = email {
            let email = email.trim().to_lowercase();
            let taken = Filter::and([
                Filter::eq("email", email.as_str()),
                Filter::ne(ID_FIELD, user_id),
            ]);
            if self.store.find_one(collections::USERS, &taken).await?.is_some() {
                return Err(AppError::Conflict("Email is already in use".to_string()));
            }
            patch = patch.set("email", email);
        }
        self.update_user(user_id, patch).await
    }

    /// Replace the password hash and end the current session.
    pub async fn set_password(&self, user_id: &str, password_hash: &str) -> Result<bool, AppError> {
        let patch = Patch::new()
            .set("password", password_hash)
            .unset("refreshToken");
        Ok(self.update_user(user_id, patch).await?.is_some())
    }

    /// Unconditionally store a refresh token digest.
    pub async fn set_refresh_token(&self, user_id: &str, digest: &str) -> Result<bool, AppError> {
        let patch = Patch::new().set("refreshToken", digest);
        Ok(self
            .store
            .update_by_id(collections::USERS, user_id, &patch)
            .await?
            .is_some())
    }

    /// Replace the refresh token digest only if it still equals `expected`.
    ///
    /// Returns `false` when the stored digest differs (superseded, revoked,
    /// or a concurrent rotation won).
    pub async fn swap_refresh_token(
        &self,
        user_id: &str,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, AppError> {
        let filter = Filter::and([Filter::id(user_id), Filter::eq("refreshToken", expected)]);
        let patch = Patch::new().set("refreshToken", replacement);
        Ok(self
            .store
            .find_one_and_update(collections::USERS, &filter, &patch)
            .await?
            .is_some())
    }

    /// Remove the stored refresh token. Returns `false` if the user is gone.
    pub async fn clear_refresh_token(&self, user_id: &str) -> Result<bool, AppError> {
        let patch = Patch::new().unset("refreshToken");
        Ok(self
            .store
            .update_by_id(collections::USERS, user_id, &patch)
            .await?
            .is_some())
    }

    /// Append a video to the watch history unless already present.
    pub async fn add_to_watch_history(
        &self,
        user_id: &str,
        video_id: &str,
    ) -> Result<(), AppError> {
        let patch = Patch::new().add_to_set("watchHistory", video_id);
        self.store
            .update_by_id(collections::USERS, user_id, &patch)
            .await?;
        Ok(())
    }

    // ─── Video Operations ────────────────────────────────────────

    pub async fn create_video(&self, video: &Video) -> Result<Video, AppError> {
        self.insert(collections::VIDEOS, video).await
    }

    pub async fn get_video(&self, video_id: &str) -> Result<Option<Video>, AppError> {
        self.get(collections::VIDEOS, video_id).await
    }

    /// The video if `viewer` may see it; `None` for a missing video or
    /// someone else's draft.
    pub async fn get_visible_video(
        &self,
        video_id: &str,
        viewer: &str,
    ) -> Result<Option<Video>, AppError> {
        let filter = Filter::and([Filter::id(video_id), visible_to(viewer)]);
        self.store
            .find_one(collections::VIDEOS, &filter)
            .await?
            .map(decode)
            .transpose()
    }

    /// Patch a video owned by `owner`; `None` if absent or not owned.
    pub async fn update_video(
        &self,
        video_id: &str,
        owner: &str,
        patch: Patch,
    ) -> Result<Option<Video>, AppError> {
        self.update_where(collections::VIDEOS, &owned_by(video_id, owner), patch)
            .await
    }

    pub async fn delete_video(
        &self,
        video_id: &str,
        owner: &str,
    ) -> Result<Option<Video>, AppError> {
        self.delete_where(collections::VIDEOS, &owned_by(video_id, owner))
            .await
    }

    pub async fn record_view(&self, video_id: &str) -> Result<(), AppError> {
        self.store
            .update_by_id(collections::VIDEOS, video_id, &Patch::new().inc("views", 1))
            .await?;
        Ok(())
    }

    // ─── Comment Operations ──────────────────────────────────────

    pub async fn create_comment(&self, comment: &Comment) -> Result<Comment, AppError> {
        self.insert(collections::COMMENTS, comment).await
    }

    pub async fn update_comment(
        &self,
        comment_id: &str,
        owner: &str,
        content: &str,
    ) -> Result<Option<Comment>, AppError> {
        self.update_where(
            collections::COMMENTS,
            &owned_by(comment_id, owner),
            Patch::new().set("content", content),
        )
        .await
    }

    pub async fn delete_comment(
        &self,
        comment_id: &str,
        owner: &str,
    ) -> Result<Option<Comment>, AppError> {
        self.delete_where(collections::COMMENTS, &owned_by(comment_id, owner))
            .await
    }

    // ─── Like Operations ─────────────────────────────────────────

    /// Whether a record of the given kind exists.
    pub async fn target_exists(&self, target: LikeTarget, id: &str) -> Result<bool, AppError> {
        Ok(self
            .store
            .find_by_id(target.collection(), id)
            .await?
            .is_some())
    }

    /// Like the target if not yet liked by `user_id`, otherwise unlike it.
    ///
    /// Returns whether the target is liked afterwards.
    pub async fn toggle_like(
        &self,
        user_id: &str,
        target: LikeTarget,
        target_id: &str,
    ) -> Result<bool, AppError> {
        let existing = Filter::and([
            Filter::eq("likedBy", user_id),
            Filter::eq(target.field(), target_id),
        ]);
        if self
            .store
            .find_one_and_delete(collections::LIKES, &existing)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let now = now_rfc3339();
        let mut like = Like {
            id: super::new_object_id(),
            liked_by: user_id.to_string(),
            video: None,
            comment: None,
            tweet: None,
            created_at: now.clone(),
            updated_at: now,
        };
        let slot = match target {
            LikeTarget::Video => &mut like.video,
            LikeTarget::Comment => &mut like.comment,
            LikeTarget::Tweet => &mut like.tweet,
        };
        *slot = Some(target_id.to_string());

        self.insert(collections::LIKES, &like).await?;
        Ok(true)
    }

    // ─── Subscription Operations ─────────────────────────────────

    /// Subscribe if not subscribed, otherwise unsubscribe.
    ///
    /// Returns whether `subscriber` follows `channel` afterwards.
    pub async fn toggle_subscription(
        &self,
        subscriber: &str,
        channel: &str,
    ) -> Result<bool, AppError> {
        let existing = Filter::and([
            Filter::eq("subscriber", subscriber),
            Filter::eq("channel", channel),
        ]);
        if self
            .store
            .find_one_and_delete(collections::SUBSCRIPTIONS, &existing)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let now = now_rfc3339();
        let subscription = Subscription {
            id: super::new_object_id(),
            subscriber: subscriber.to_string(),
            channel: channel.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.insert(collections::SUBSCRIPTIONS, &subscription)
            .await?;
        Ok(true)
    }

    // ─── Tweet Operations ────────────────────────────────────────

    pub async fn create_tweet(&self, tweet: &Tweet) -> Result<Tweet, AppError> {
        self.insert(collections::TWEETS, tweet).await
    }

    /// A user's tweets, newest first.
    pub async fn tweets_by_owner(&self, owner: &str) -> Result<Vec<Tweet>, AppError> {
        self.find_all(
            collections::TWEETS,
            &Filter::eq("owner", owner),
            &[("createdAt", SortOrder::Desc)],
        )
        .await
    }

    pub async fn update_tweet(
        &self,
        tweet_id: &str,
        owner: &str,
        content: &str,
    ) -> Result<Option<Tweet>, AppError> {
        self.update_where(
            collections::TWEETS,
            &owned_by(tweet_id, owner),
            Patch::new().set("content", content),
        )
        .await
    }

    pub async fn delete_tweet(
        &self,
        tweet_id: &str,
        owner: &str,
    ) -> Result<Option<Tweet>, AppError> {
        self.delete_where(collections::TWEETS, &owned_by(tweet_id, owner))
            .await
    }

    // ─── Playlist Operations ─────────────────────────────────────

    pub async fn create_playlist(&self, playlist: &Playlist) -> Result<Playlist, AppError> {
        self.insert(collections::PLAYLISTS, playlist).await
    }

    pub async fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>, AppError> {
        self.get(collections::PLAYLISTS, playlist_id).await
    }

    /// A user's playlists, newest first.
    pub async fn playlists_by_owner(&self, owner: &str) -> Result<Vec<Playlist>, AppError> {
        self.find_all(
            collections::PLAYLISTS,
            &Filter::eq("owner", owner),
            &[("createdAt", SortOrder::Desc)],
        )
        .await
    }

    /// Patch a playlist owned by `owner`. Also used for adding and removing
    /// videos (`add_to_set` / `pull` on `videos`).
    pub async fn update_playlist(
        &self,
        playlist_id: &str,
        owner: &str,
        patch: Patch,
    ) -> Result<Option<Playlist>, AppError> {
        self.update_where(collections::PLAYLISTS, &owned_by(playlist_id, owner), patch)
            .await
    }

    pub async fn delete_playlist(
        &self,
        playlist_id: &str,
        owner: &str,
    ) -> Result<Option<Playlist>, AppError> {
        self.delete_where(collections::PLAYLISTS, &owned_by(playlist_id, owner))
            .await
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`DocumentStore`] is the generic store interface (find, create, atomic
//! find-and-modify, aggregate). [`Db`] wraps it with typed operations per
//! collection.

pub mod memory;
pub mod mongo;
pub mod query;
pub mod repository;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use query::{Document, Filter, Patch, Pipeline, SortOrder};
pub use repository::Db;

use crate::config::Config;
use crate::error::AppError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::TryStreamExt;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const VIDEOS: &str = "videos";
    pub const COMMENTS: &str = "comments";
    pub const LIKES: &str = "likes";
    pub const PLAYLISTS: &str = "playlists";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const TWEETS: &str = "tweets";
}

/// Lazy, finite, non-restartable sequence of aggregation results.
pub type DocumentStream = BoxStream<'static, Result<Document, AppError>>;

/// Generic document store.
///
/// Single-document writes are atomic: `find_one_and_update` applies its
/// patch only if the filter still matches at write time, which is what
/// compare-and-set on the refresh token builds on.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Document>, AppError>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        self.find_one(collection, &Filter::id(id)).await
    }

    /// Every document matching `filter`, ordered by `sort`.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: &[(&str, SortOrder)],
    ) -> Result<Vec<Document>, AppError> {
        let mut pipeline = Pipeline::new().matching(filter.clone());
        if !sort.is_empty() {
            pipeline = pipeline.sort(sort);
        }
        self.aggregate(collection, &pipeline).await?.try_collect().await
    }

    /// Insert a document, assigning an `_id` when missing.
    ///
    /// Fails with [`AppError::Conflict`] on a unique index violation.
    async fn create(&self, collection: &str, document: Document) -> Result<Document, AppError>;

    /// Atomically patch the first document matching `filter` and return
    /// the updated document, or `None` when nothing matched.
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Patch,
    ) -> Result<Option<Document>, AppError>;

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: &Patch,
    ) -> Result<Option<Document>, AppError> {
        self.find_one_and_update(collection, &Filter::id(id), patch)
            .await
    }

    /// Delete the first document matching `filter`, returning it.
    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AppError>;

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        self.find_one_and_delete(collection, &Filter::id(id)).await
    }

    /// Evaluate a pipeline against a collection as one query.
    async fn aggregate(&self, collection: &str, pipeline: &Pipeline)
        -> Result<DocumentStream, AppError>;

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), AppError>;
}

/// Generate a new 24-hex-character object id.
pub fn new_object_id() -> String {
    mongodb::bson::oid::ObjectId::new().to_hex()
}

/// Whether a string is a well-formed object id.
pub fn is_object_id(id: &str) -> bool {
    mongodb::bson::oid::ObjectId::parse_str(id).is_ok()
}

/// Open the store selected by `MONGODB_URI`.
///
/// `memory://` selects the in-process store (local development only; data
/// is lost on restart).
pub async fn connect(config: &Config) -> Result<Arc<dyn DocumentStore>, AppError> {
    if config.mongodb_uri.starts_with("memory://") {
        tracing::warn!("Using in-memory document store; data will not persist");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = MongoStore::connect(&config.mongodb_uri, &config.db_name).await?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_validation() {
        let id = new_object_id();
        assert_eq!(id.len(), 24);
        assert!(is_object_id(&id));
        assert!(!is_object_id("not-an-id"));
        assert!(!is_object_id(""));
        assert!(!is_object_id("zzzzzzzzzzzzzzzzzzzzzzzz"));
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use super::UserSummary;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

fn default_published() -> bool {
    true
}

/// Video record as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: String,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    /// Seconds
    pub duration: f64,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub views: i64,
    #[serde(default = "default_published")]
    pub is_published: bool,
    /// Owning user id
    pub owner: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Video joined with its owner's summary.
///
/// `owner` is `None` when the owning user no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VideoSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub views: i64,
    #[serde(default = "default_published")]
    pub is_published: bool,
    #[serde(default)]
    pub owner: Option<UserSummary>,
    /// Present only on read models that join likes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(type = "number | null"))]
    pub likes_count: Option<i64>,
    /// Whether the viewer likes this video (detail view only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
    pub created_at: String,
    pub updated_at: String,
}

/// One page of a video listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VideoPage {
    pub videos: Vec<VideoSummary>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub page: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub limit: u64,
    pub has_next_page: bool,
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Channel read models built by aggregation.

use super::UserSummary;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Public channel page as seen by a particular viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChannelProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    #[serde(default)]
    pub cover_image: String,
    pub created_at: String,
    /// Users subscribed to this channel
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub subscribers_count: i64,
    /// Channels this user subscribes to
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub channels_subscribed_to_count: i64,
    /// Whether the viewer subscribes to this channel
    pub is_subscribed: bool,
}

/// Dashboard totals for a channel owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChannelStats {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub fullname: String,
    pub avatar: String,
    #[serde(default)]
    pub cover_image: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_videos: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_subscribers: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_likes: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_views: i64,
}

/// A user subscribed to a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SubscriberEntry {
    /// Subscription id
    #[serde(rename = "_id")]
    pub id: String,
    pub subscriber: UserSummary,
    pub created_at: String,
}

/// A channel a user subscribes to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChannelEntry {
    /// Subscription id
    #[serde(rename = "_id")]
    pub id: String,
    pub channel: UserSummary,
    pub created_at: String,
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde::{Deserialize, Serialize};

/// A like on exactly one of a video, comment or tweet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(rename = "_id")]
    pub id: String,
    pub liked_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Kind of record a like points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Video,
    Comment,
    Tweet,
}

impl LikeTarget {
    /// Field on the like record holding the target id.
    pub fn field(self) -> &'static str {
        match self {
            LikeTarget::Video => "video",
            LikeTarget::Comment => "comment",
            LikeTarget::Tweet => "tweet",
        }
    }

    /// Collection the target lives in.
    pub fn collection(self) -> &'static str {
        use crate::db::collections;
        match self {
            LikeTarget::Video => collections::VIDEOS,
            LikeTarget::Comment => collections::COMMENTS,
            LikeTarget::Tweet => collections::TWEETS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LikeTarget::Video => "Video",
            LikeTarget::Comment => "Comment",
            LikeTarget::Tweet => "Tweet",
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod channel;
pub mod comment;
pub mod like;
pub mod playlist;
pub mod subscription;
pub mod tweet;
pub mod user;
pub mod video;

pub use channel::{ChannelEntry, ChannelProfile, ChannelStats, SubscriberEntry};
pub use comment::{Comment, CommentView};
pub use like::{Like, LikeTarget};
pub use playlist::Playlist;
pub use subscription::Subscription;
pub use tweet::Tweet;
pub use user::{PublicUser, User, UserSummary};
pub use video::{Video, VideoPage, VideoSummary};

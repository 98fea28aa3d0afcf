// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aggregation read models.
//!
//! Each read model is one pipeline evaluated by the store as a single
//! query, decoded into a typed struct. Every projection of user documents
//! is an explicit allow-list, so credential fields never leave the store.

use crate::db::collections;
use crate::db::repository::visible_to;
use crate::db::query::{Expr, Filter, Lookup, Pipeline, Projection, SortOrder};
use crate::db::Db;
use crate::error::AppError;
use crate::models::{
    ChannelEntry, ChannelProfile, ChannelStats, CommentView, SubscriberEntry, VideoPage,
    VideoSummary,
};
use futures_util::stream::BoxStream;
use serde_json::Value;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Public user fields embedded in other read models.
const USER_SUMMARY_FIELDS: [&str; 3] = ["username", "fullname", "avatar"];

// ─── Shared Stages ───────────────────────────────────────────

/// Replace the user id at `field` with that user's summary, or remove the
/// field when the user no longer exists.
fn embed_user_summary(pipeline: Pipeline, field: &str) -> Pipeline {
    pipeline
        .lookup(
            Lookup::new(collections::USERS, field, "_id", field)
                .with_pipeline(Pipeline::new().project(Projection::include(&USER_SUMMARY_FIELDS))),
        )
        .add_fields(vec![(field, Expr::First(field.to_string()))])
}

/// Add `likesCount` for the likes pointing at each document through
/// `like_field`.
fn with_like_count(pipeline: Pipeline, like_field: &str) -> Pipeline {
    pipeline
        .lookup(
            Lookup::new(collections::LIKES, "_id", like_field, "likes")
                .with_pipeline(Pipeline::new().project(Projection::include(&["likedBy"]))),
        )
        .add_fields(vec![("likesCount", Expr::Size("likes".into()))])
}

fn drop_likes(pipeline: Pipeline) -> Pipeline {
    pipeline.project(Projection::exclude(&["likes"]))
}

fn page_window(page: u64, limit: u64) -> (u64, u64) {
    let page = page.max(1);
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    ((page - 1).saturating_mul(limit), limit)
}

async fn first_or_not_found<T>(
    db: &Db,
    collection: &str,
    pipeline: &Pipeline,
    what: &str,
) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned + Send + 'static,
{
    db.aggregate_as::<T>(collection, pipeline)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::not_found(what))
}

// ─── Channel Profile ─────────────────────────────────────────

pub fn channel_profile_pipeline(viewer_id: &str, username: &str) -> Pipeline {
    Pipeline::new()
        .matching(Filter::eq("username", username.trim().to_lowercase()))
        .lookup(Lookup::new(
            collections::SUBSCRIPTIONS,
            "_id",
            "channel",
            "subscribers",
        ))
        .lookup(Lookup::new(
            collections::SUBSCRIPTIONS,
            "_id",
            "subscriber",
            "subscribedTo",
        ))
        .add_fields(vec![
            ("subscribersCount", Expr::Size("subscribers".into())),
            (
                "channelsSubscribedToCount",
                Expr::Size("subscribedTo".into()),
            ),
            (
                "isSubscribed",
                Expr::In {
                    value: Value::String(viewer_id.to_string()),
                    array: "subscribers.subscriber".into(),
                },
            ),
        ])
        .project(Projection::include(&[
            "fullname",
            "username",
            "email",
            "avatar",
            "coverImage",
            "createdAt",
            "subscribersCount",
            "channelsSubscribedToCount",
            "isSubscribed",
        ]))
        .limit(1)
}

/// Public profile of the channel `username` as seen by `viewer_id`.
pub async fn channel_profile(
    db: &Db,
    viewer_id: &str,
    username: &str,
) -> Result<ChannelProfile, AppError> {
    if username.trim().is_empty() {
        return Err(AppError::Validation("username is missing".to_string()));
    }

    first_or_not_found(
        db,
        collections::USERS,
        &channel_profile_pipeline(viewer_id, username),
        "Channel",
    )
    .await
}

// ─── Watch History ───────────────────────────────────────────

pub fn watch_history_pipeline(user_id: &str) -> Pipeline {
    let video_details =
        embed_user_summary(Pipeline::new().matching(visible_to(user_id)), "owner");

    Pipeline::new()
        .matching(Filter::id(user_id))
        .project(Projection::include(&["watchHistory"]))
        .unwind_with_index("watchHistory", "position")
        .lookup(
            Lookup::new(collections::VIDEOS, "watchHistory", "_id", "video")
                .with_pipeline(video_details),
        )
        // Deleted videos and other channels' drafts join nothing and drop
        // out here.
        .unwind("video")
        .sort(&[("position", SortOrder::Asc)])
        .replace_root("video")
}

/// Videos the user has watched, in order of first watch.
///
/// The stream is lazy and can be consumed once.
pub async fn watch_history(
    db: &Db,
    user_id: &str,
) -> Result<BoxStream<'static, Result<VideoSummary, AppError>>, AppError> {
    if db.get_user(user_id).await?.is_none() {
        return Err(AppError::not_found("User"));
    }

    db.aggregate_stream(collections::USERS, &watch_history_pipeline(user_id))
        .await
}

// ─── Videos ──────────────────────────────────────────────────

/// Sortable video fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoSortField {
    #[default]
    CreatedAt,
    Views,
    Duration,
    Title,
}

impl VideoSortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "createdAt" => Some(Self::CreatedAt),
            "views" => Some(Self::Views),
            "duration" => Some(Self::Duration),
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    fn field(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Views => "views",
            Self::Duration => "duration",
            Self::Title => "title",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoListParams {
    pub page: u64,
    pub limit: u64,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    /// Restrict to one channel
    pub owner: Option<String>,
    pub sort_by: VideoSortField,
    pub sort_order: SortOrder,
}

impl Default for VideoListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            search: None,
            owner: None,
            sort_by: VideoSortField::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

/// Builds the listing pipeline. Fetches one extra row to detect a next page.
pub fn list_videos_pipeline(viewer_id: &str, params: &VideoListParams) -> Pipeline {
    let mut conditions = Vec::new();
    match params.owner.as_deref() {
        // Owners see their own unpublished videos.
        Some(owner) if owner == viewer_id => conditions.push(Filter::eq("owner", owner)),
        Some(owner) => {
            conditions.push(Filter::eq("owner", owner));
            conditions.push(Filter::eq("isPublished", true));
        }
        None => conditions.push(Filter::eq("isPublished", true)),
    }
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push(Filter::or([
            Filter::contains_ignore_case("title", search),
            Filter::contains_ignore_case("description", search),
        ]));
    }

    let (skip, limit) = page_window(params.page, params.limit);
    let pipeline = Pipeline::new()
        .matching(Filter::and(conditions))
        .sort(&[
            (params.sort_by.field(), params.sort_order),
            ("_id", params.sort_order),
        ])
        .skip(skip)
        .limit(limit + 1);

    drop_likes(with_like_count(
        embed_user_summary(pipeline, "owner"),
        "video",
    ))
}

pub async fn list_videos(
    db: &Db,
    viewer_id: &str,
    params: &VideoListParams,
) -> Result<VideoPage, AppError> {
    let (_, limit) = page_window(params.page, params.limit);
    let mut videos: Vec<VideoSummary> = db
        .aggregate_as(collections::VIDEOS, &list_videos_pipeline(viewer_id, params))
        .await?;

    let has_next_page = videos.len() as u64 > limit;
    videos.truncate(limit as usize);

    Ok(VideoPage {
        videos,
        page: params.page.max(1),
        limit,
        has_next_page,
    })
}

pub fn video_detail_pipeline(video_id: &str, viewer_id: &str) -> Pipeline {
    let visible = Filter::and([Filter::id(video_id), visible_to(viewer_id)]);

    let pipeline = with_like_count(
        embed_user_summary(Pipeline::new().matching(visible), "owner"),
        "video",
    )
    .add_fields(vec![(
        "isLiked",
        Expr::In {
            value: Value::String(viewer_id.to_string()),
            array: "likes.likedBy".into(),
        },
    )]);

    drop_likes(pipeline)
}

/// One video with owner summary, like count and the viewer's like state.
/// Unpublished videos are visible to their owner only.
pub async fn video_detail(
    db: &Db,
    video_id: &str,
    viewer_id: &str,
) -> Result<VideoSummary, AppError> {
    first_or_not_found(
        db,
        collections::VIDEOS,
        &video_detail_pipeline(video_id, viewer_id),
        "Video",
    )
    .await
}

pub fn liked_videos_pipeline(user_id: &str) -> Pipeline {
    Pipeline::new()
        .matching(Filter::and([
            Filter::eq("likedBy", user_id),
            Filter::exists("video", true),
        ]))
        .sort(&[("createdAt", SortOrder::Desc)])
        .lookup(
            Lookup::new(collections::VIDEOS, "video", "_id", "video").with_pipeline(
                embed_user_summary(Pipeline::new().matching(visible_to(user_id)), "owner"),
            ),
        )
        .unwind("video")
        .replace_root("video")
}

/// Videos liked by a user, most recently liked first.
pub async fn liked_videos(db: &Db, user_id: &str) -> Result<Vec<VideoSummary>, AppError> {
    db.aggregate_as(collections::LIKES, &liked_videos_pipeline(user_id))
        .await
}

// ─── Comments ────────────────────────────────────────────────

pub fn video_comments_pipeline(video_id: &str, page: u64, limit: u64) -> Pipeline {
    let (skip, limit) = page_window(page, limit);
    let pipeline = Pipeline::new()
        .matching(Filter::eq("video", video_id))
        .sort(&[("createdAt", SortOrder::Desc), ("_id", SortOrder::Desc)])
        .skip(skip)
        .limit(limit);

    drop_likes(with_like_count(
        embed_user_summary(pipeline, "owner"),
        "comment",
    ))
}

/// Comments on a video, newest first.
pub async fn video_comments(
    db: &Db,
    video_id: &str,
    page: u64,
    limit: u64,
) -> Result<Vec<CommentView>, AppError> {
    db.aggregate_as(
        collections::COMMENTS,
        &video_comments_pipeline(video_id, page, limit),
    )
    .await
}

// ─── Subscriptions ───────────────────────────────────────────

fn subscription_list_pipeline(match_field: &str, id: &str, other_side: &str) -> Pipeline {
    let pipeline = Pipeline::new()
        .matching(Filter::eq(match_field, id))
        .sort(&[("createdAt", SortOrder::Desc)]);

    embed_user_summary(pipeline, other_side)
        // Subscriptions of deleted users drop out.
        .matching(Filter::exists(other_side, true))
        .project(Projection::include(&[other_side, "createdAt"]))
}

pub fn channel_subscribers_pipeline(channel_id: &str) -> Pipeline {
    subscription_list_pipeline("channel", channel_id, "subscriber")
}

pub fn subscribed_channels_pipeline(subscriber_id: &str) -> Pipeline {
    subscription_list_pipeline("subscriber", subscriber_id, "channel")
}

/// Users subscribed to a channel, newest first.
pub async fn channel_subscribers(
    db: &Db,
    channel_id: &str,
) -> Result<Vec<SubscriberEntry>, AppError> {
    db.aggregate_as(
        collections::SUBSCRIPTIONS,
        &channel_subscribers_pipeline(channel_id),
    )
    .await
}

/// Channels a user subscribes to, newest first.
pub async fn subscribed_channels(
    db: &Db,
    subscriber_id: &str,
) -> Result<Vec<ChannelEntry>, AppError> {
    db.aggregate_as(
        collections::SUBSCRIPTIONS,
        &subscribed_channels_pipeline(subscriber_id),
    )
    .await
}

// ─── Dashboard ───────────────────────────────────────────────

pub fn channel_stats_pipeline(user_id: &str) -> Pipeline {
    let per_video = with_like_count(Pipeline::new(), "video")
        .project(Projection::include(&["views", "likesCount"]));

    Pipeline::new()
        .matching(Filter::id(user_id))
        .lookup(Lookup::new(collections::VIDEOS, "_id", "owner", "videos").with_pipeline(per_video))
        .lookup(
            Lookup::new(collections::SUBSCRIPTIONS, "_id", "channel", "subscribers")
                .with_pipeline(Pipeline::new().project(Projection::include(&["_id"]))),
        )
        .add_fields(vec![
            ("totalVideos", Expr::Size("videos".into())),
            ("totalSubscribers", Expr::Size("subscribers".into())),
            ("totalLikes", Expr::Sum("videos.likesCount".into())),
            ("totalViews", Expr::Sum("videos.views".into())),
        ])
        .project(Projection::include(&[
            "username",
            "fullname",
            "avatar",
            "coverImage",
            "totalVideos",
            "totalSubscribers",
            "totalLikes",
            "totalViews",
        ]))
}

/// Totals for a channel owner's dashboard.
pub async fn channel_stats(db: &Db, user_id: &str) -> Result<ChannelStats, AppError> {
    first_or_not_found(
        db,
        collections::USERS,
        &channel_stats_pipeline(user_id),
        "User",
    )
    .await
}

pub fn channel_videos_pipeline(user_id: &str) -> Pipeline {
    let pipeline = Pipeline::new()
        .matching(Filter::eq("owner", user_id))
        .sort(&[("createdAt", SortOrder::Desc)]);

    drop_likes(with_like_count(
        embed_user_summary(pipeline, "owner"),
        "video",
    ))
}

/// Every video of the channel, published or not, newest first.
pub async fn channel_videos(db: &Db, user_id: &str) -> Result<Vec<VideoSummary>, AppError> {
    db.aggregate_as(collections::VIDEOS, &channel_videos_pipeline(user_id))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::CREDENTIAL_FIELDS;

    fn all_pipelines() -> Vec<Pipeline> {
        vec![
            channel_profile_pipeline("v", "alice"),
            watch_history_pipeline("u"),
            list_videos_pipeline("v", &VideoListParams::default()),
            video_detail_pipeline("x", "v"),
            liked_videos_pipeline("u"),
            video_comments_pipeline("x", 1, 10),
            channel_subscribers_pipeline("c"),
            subscribed_channels_pipeline("s"),
            channel_stats_pipeline("u"),
            channel_videos_pipeline("u"),
        ]
    }

    #[test]
    fn test_pipelines_never_reference_credentials() {
        for pipeline in all_pipelines() {
            let rendered = format!("{:?}", pipeline);
            for field in CREDENTIAL_FIELDS {
                assert!(
                    !rendered.contains(field),
                    "pipeline mentions {field}: {rendered}"
                );
            }
        }
    }

    #[test]
    fn test_page_window_clamps() {
        assert_eq!(page_window(0, 10), (0, 10));
        assert_eq!(page_window(3, 10), (20, 10));
        assert_eq!(page_window(1, 0), (0, 1));
        assert_eq!(page_window(2, 1000), (100, MAX_PAGE_SIZE));
    }

    #[test]
    fn test_sort_field_allowlist() {
        assert_eq!(VideoSortField::parse("views"), Some(VideoSortField::Views));
        assert_eq!(VideoSortField::parse("password"), None);
        assert_eq!(VideoSortField::parse(""), None);
    }

    #[test]
    fn test_channel_profile_matches_lowercase_username() {
        let pipeline = channel_profile_pipeline("v", "  AliCe ");
        match &pipeline.stages()[0] {
            crate::db::query::Stage::Match(filter) => {
                assert_eq!(filter, &Filter::eq("username", "alice"))
            }
            other => panic!("unexpected first stage {other:?}"),
        }
    }
}

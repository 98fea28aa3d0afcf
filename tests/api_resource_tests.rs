// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration tests for videos, comments, likes, subscriptions, tweets,
//! playlists and the dashboard.

mod common;

use axum::http::{Method, StatusCode};
use common::{create_test_app, publish_video, register_and_login, request, send};
use serde_json::json;

#[tokio::test]
async fn test_video_lifecycle() {
    let (app, _state) = create_test_app().await;
    let owner = register_and_login(&app, "owner").await;
    let id = publish_video(&app, &owner, "My first video").await;

    let (status, body) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/videos/{id}"),
            Some(&owner.access_token),
            Some(json!({"title": "Renamed"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Renamed");
    assert_eq!(body["data"]["description"], "About My first video");

    let (status, body) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/videos/toggle/publish/{id}"),
            Some(&owner.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isPublished"], false);

    let (status, _) = send(
        &app,
        request(
            Method::DELETE,
            &format!("/api/v1/videos/{id}"),
            Some(&owner.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/v1/videos/{id}"),
            Some(&owner.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_owner_cannot_mutate_video() {
    let (app, _state) = create_test_app().await;
    let owner = register_and_login(&app, "owner").await;
    let intruder = register_and_login(&app, "intruder").await;
    let id = publish_video(&app, &owner, "Mine").await;

    for (method, uri, body) in [
        (
            Method::PATCH,
            format!("/api/v1/videos/{id}"),
            Some(json!({"title": "Hijacked"})),
        ),
        (Method::DELETE, format!("/api/v1/videos/{id}"), None),
        (
            Method::PATCH,
            format!("/api/v1/videos/toggle/publish/{id}"),
            None,
        ),
    ] {
        let (status, _) = send(
            &app,
            request(method, &uri, Some(&intruder.access_token), body),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_invalid_ids_are_bad_requests() {
    let (app, _state) = create_test_app().await;
    let user = register_and_login(&app, "user").await;

    for uri in [
        "/api/v1/videos/not-an-id",
        "/api/v1/comments/xyz",
        "/api/v1/playlist/123",
        "/api/v1/tweets/user/abc",
        "/api/v1/subscriptions/c/zzz",
    ] {
        let (status, body) = send(
            &app,
            request(Method::GET, uri, Some(&user.access_token), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["message"].as_str().unwrap().starts_with("Invalid"));
    }
}

#[tokio::test]
async fn test_watching_counts_views_and_history() {
    let (app, _state) = create_test_app().await;
    let owner = register_and_login(&app, "owner").await;
    let viewer = register_and_login(&app, "viewer").await;
    let first = publish_video(&app, &owner, "First").await;
    let second = publish_video(&app, &owner, "Second").await;

    for id in [&second, &first, &second] {
        let (status, _) = send(
            &app,
            request(
                Method::GET,
                &format!("/api/v1/videos/{id}"),
                Some(&viewer.access_token),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/v1/videos/{second}"),
            Some(&owner.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(body["data"]["views"], 3);
    assert_eq!(body["data"]["owner"]["username"], "owner");

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/users/history",
            Some(&viewer.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["_id"].as_str().unwrap())
        .collect();
    assert_eq!(history, vec![second.as_str(), first.as_str()]);
}

#[tokio::test]
async fn test_unpublished_video_hidden_from_others() {
    let (app, _state) = create_test_app().await;
    let owner = register_and_login(&app, "owner").await;
    let viewer = register_and_login(&app, "viewer").await;
    let id = publish_video(&app, &owner, "Secret").await;

    send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/videos/toggle/publish/{id}"),
            Some(&owner.access_token),
            None,
        ),
    )
    .await;

    let (status, _) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/v1/videos/{id}"),
            Some(&viewer.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(
        &app,
        request(Method::GET, "/api/v1/videos", Some(&viewer.access_token), None),
    )
    .await;
    assert_eq!(body["data"]["videos"].as_array().unwrap().len(), 0);
    assert_eq!(body["data"]["hasNextPage"], false);
}

#[tokio::test]
async fn test_unpublished_video_unreachable_through_side_paths() {
    let (app, _state) = create_test_app().await;
    let owner = register_and_login(&app, "owner").await;
    let viewer = register_and_login(&app, "viewer").await;
    let id = publish_video(&app, &owner, "Soon private").await;

    // Watch and like it while it is public.
    let (status, _) = send(
        &app,
        request(Method::GET, &format!("/api/v1/videos/{id}"), Some(&viewer.access_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/likes/toggle/v/{id}"),
            Some(&viewer.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/playlist",
            Some(&viewer.access_token),
            Some(json!({"name": "Later", "description": "Queue"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let playlist = body["data"]["_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/videos/toggle/publish/{id}"),
            Some(&owner.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app,
        request(Method::GET, "/api/v1/users/history", Some(&viewer.access_token), None),
    )
    .await;
    assert_eq!(body["data"], json!([]));
    let (_, body) = send(
        &app,
        request(Method::GET, "/api/v1/likes/videos", Some(&viewer.access_token), None),
    )
    .await;
    assert_eq!(body["data"], json!([]));

    let (status, _) = send(
        &app,
        request(Method::GET, &format!("/api/v1/comments/{id}"), Some(&viewer.access_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/comments/{id}"),
            Some(&viewer.access_token),
            Some(json!({"content": "hello?"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/likes/toggle/v/{id}"),
            Some(&viewer.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/playlist/add/{id}/{playlist}"),
            Some(&viewer.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The owner still reaches their draft.
    let (status, _) = send(
        &app,
        request(Method::GET, &format!("/api/v1/comments/{id}"), Some(&owner.access_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/likes/toggle/v/{id}"),
            Some(&owner.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_video_list_query_validation() {
    let (app, _state) = create_test_app().await;
    let user = register_and_login(&app, "user").await;

    for uri in [
        "/api/v1/videos?sortBy=password",
        "/api/v1/videos?sortType=up",
        "/api/v1/videos?limit=0",
        "/api/v1/videos?page=abc",
        "/api/v1/videos?page=18446744073709551615",
    ] {
        let (status, _) = send(
            &app,
            request(Method::GET, uri, Some(&user.access_token), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/videos?page=2&limit=5&sortBy=views&sortType=asc",
            Some(&user.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["page"], 2);
    assert_eq!(body["data"]["limit"], 5);
}

#[tokio::test]
async fn test_comments_flow() {
    let (app, _state) = create_test_app().await;
    let owner = register_and_login(&app, "owner").await;
    let other = register_and_login(&app, "other").await;
    let video = publish_video(&app, &owner, "Discuss").await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/comments/{video}"),
            Some(&other.access_token),
            Some(json!({"content": "Nice one"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment = body["data"]["_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/comments/{video}"),
            Some(&other.access_token),
            Some(json!({"content": "   "})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/comments/c/{comment}"),
            Some(&owner.access_token),
            Some(json!({"content": "Not yours"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/comments/c/{comment}"),
            Some(&other.access_token),
            Some(json!({"content": "Edited"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "Edited");

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/v1/comments/{video}?page=1&limit=10"),
            Some(&owner.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["owner"]["username"], "other");
    assert_eq!(body["data"][0]["likesCount"], 0);

    let (status, _) = send(
        &app,
        request(
            Method::DELETE,
            &format!("/api/v1/comments/c/{comment}"),
            Some(&other.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_comment_on_missing_video() {
    let (app, _state) = create_test_app().await;
    let user = register_and_login(&app, "user").await;

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/comments/64b7f0c2a1b2c3d4e5f60718",
            Some(&user.access_token),
            Some(json!({"content": "Hello?"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_like_toggle_twice() {
    let (app, _state) = create_test_app().await;
    let owner = register_and_login(&app, "owner").await;
    let fan = register_and_login(&app, "fan").await;
    let video = publish_video(&app, &owner, "Likeable").await;
    let uri = format!("/api/v1/likes/toggle/v/{video}");

    let (status, body) = send(&app, request(Method::POST, &uri, Some(&fan.access_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isLiked"], true);

    let (_, body) = send(
        &app,
        request(Method::GET, "/api/v1/likes/videos", Some(&fan.access_token), None),
    )
    .await;
    assert_eq!(body["data"][0]["_id"], video.as_str());

    let (_, body) = send(&app, request(Method::POST, &uri, Some(&fan.access_token), None)).await;
    assert_eq!(body["data"]["isLiked"], false);

    let (_, body) = send(
        &app,
        request(Method::GET, "/api/v1/likes/videos", Some(&fan.access_token), None),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/likes/toggle/t/64b7f0c2a1b2c3d4e5f60718",
            Some(&fan.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscriptions() {
    let (app, _state) = create_test_app().await;
    let creator = register_and_login(&app, "creator").await;
    let fan = register_and_login(&app, "fan").await;

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/subscriptions/c/{}", creator.id),
            Some(&creator.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/subscriptions/c/{}", creator.id),
            Some(&fan.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isSubscribed"], true);

    let (_, body) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/v1/subscriptions/c/{}", creator.id),
            Some(&creator.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(body["data"][0]["subscriber"]["username"], "fan");
    assert!(body["data"][0]["subscriber"].get("email").is_none());

    let (_, body) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/v1/subscriptions/u/{}", fan.id),
            Some(&fan.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(body["data"][0]["channel"]["username"], "creator");

    let (_, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/users/c/Creator",
            Some(&fan.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(body["data"]["subscribersCount"], 1);
    assert_eq!(body["data"]["isSubscribed"], true);
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn test_tweets() {
    let (app, _state) = create_test_app().await;
    let author = register_and_login(&app, "author").await;
    let other = register_and_login(&app, "other").await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/tweets",
            Some(&author.access_token),
            Some(json!({"content": "Hello world"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let tweet = body["data"]["_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/tweets",
            Some(&author.access_token),
            Some(json!({"content": "x".repeat(281)})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/tweets/{tweet}"),
            Some(&other.access_token),
            Some(json!({"content": "Mine now"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/v1/tweets/user/{}", author.id),
            Some(&other.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(body["data"][0]["content"], "Hello world");

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/tweets/user/64b7f0c2a1b2c3d4e5f60718",
            Some(&other.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, _) = send(
        &app,
        request(
            Method::DELETE,
            &format!("/api/v1/tweets/{tweet}"),
            Some(&author.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_playlists() {
    let (app, _state) = create_test_app().await;
    let owner = register_and_login(&app, "owner").await;
    let other = register_and_login(&app, "other").await;
    let video = publish_video(&app, &owner, "Track").await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/playlist",
            Some(&owner.access_token),
            Some(json!({"name": "Favourites", "description": "Best of"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let playlist = body["data"]["_id"].as_str().unwrap().to_string();
    let add = format!("/api/v1/playlist/add/{video}/{playlist}");

    // Adding twice keeps a single entry.
    for _ in 0..2 {
        let (status, body) = send(&app, request(Method::PATCH, &add, Some(&owner.access_token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["videos"], json!([video]));
    }

    let (status, _) = send(&app, request(Method::PATCH, &add, Some(&other.access_token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/playlist/add/64b7f0c2a1b2c3d4e5f60718/{playlist}"),
            Some(&owner.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/playlist/remove/{video}/{playlist}"),
            Some(&owner.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["videos"], json!([]));

    let (_, body) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/v1/playlist/user/{}", owner.id),
            Some(&other.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(body["data"][0]["name"], "Favourites");

    let (status, body) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/v1/playlist/{playlist}"),
            Some(&owner.access_token),
            Some(json!({"name": "Renamed"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Renamed");
    assert_eq!(body["data"]["description"], "Best of");

    let (status, _) = send(
        &app,
        request(
            Method::DELETE,
            &format!("/api/v1/playlist/{playlist}"),
            Some(&owner.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/v1/playlist/{playlist}"),
            Some(&owner.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard() {
    let (app, _state) = create_test_app().await;
    let creator = register_and_login(&app, "creator").await;
    let fan = register_and_login(&app, "fan").await;
    let video = publish_video(&app, &creator, "Hit").await;
    publish_video(&app, &creator, "Flop").await;

    send(
        &app,
        request(
            Method::GET,
            &format!("/api/v1/videos/{video}"),
            Some(&fan.access_token),
            None,
        ),
    )
    .await;
    send(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/likes/toggle/v/{video}"),
            Some(&fan.access_token),
            None,
        ),
    )
    .await;
    send(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/subscriptions/c/{}", creator.id),
            Some(&fan.access_token),
            None,
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/dashboard/stats",
            Some(&creator.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalVideos"], 2);
    assert_eq!(body["data"]["totalViews"], 1);
    assert_eq!(body["data"]["totalLikes"], 1);
    assert_eq!(body["data"]["totalSubscribers"], 1);

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/dashboard/videos",
            Some(&creator.access_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

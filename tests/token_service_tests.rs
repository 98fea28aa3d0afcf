// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token lifecycle under concurrency.

mod common;

use common::test_state;
use std::sync::Arc;
use vidtube::db::repository::NewUser;
use vidtube::error::AppError;
use vidtube::services::tokens::digest;
use vidtube::AppState;

async fn seed_user(state: &AppState, username: &str) -> String {
    let password_hash = state.passwords.hash("password123").await.unwrap();
    state
        .db
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            fullname: username.to_string(),
            password_hash,
            avatar: "https://cdn.example.com/a.png".to_string(),
            cover_image: String::new(),
        })
        .await
        .unwrap()
        .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotation_has_one_winner() {
    let state = test_state().await;
    let user_id = seed_user(&state, "racer").await;
    let pair = state.tokens.issue_token_pair(&user_id).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = Arc::clone(&state);
        let token = pair.refresh_token.clone();
        handles.push(tokio::spawn(async move {
            state.tokens.rotate_refresh_token(&token).await
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(new_pair) => winners.push(new_pair),
            Err(AppError::InvalidToken) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(winners.len(), 1, "exactly one rotation must succeed");

    // The stored digest belongs to the winner's token.
    let user = state.db.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(
        user.refresh_token.as_deref(),
        Some(digest(&winners[0].refresh_token).as_str())
    );
}

#[tokio::test]
async fn test_rotation_chain() {
    let state = test_state().await;
    let user_id = seed_user(&state, "chain").await;

    let mut current = state.tokens.issue_token_pair(&user_id).await.unwrap();
    for _ in 0..5 {
        let next = state
            .tokens
            .rotate_refresh_token(&current.refresh_token)
            .await
            .unwrap();
        assert!(matches!(
            state.tokens.rotate_refresh_token(&current.refresh_token).await,
            Err(AppError::InvalidToken)
        ));
        let claims = state.tokens.verify_access_token(&next.access_token).unwrap();
        assert_eq!(claims.sub, user_id);
        current = next;
    }
}

#[tokio::test]
async fn test_revoked_session_cannot_rotate() {
    let state = test_state().await;
    let user_id = seed_user(&state, "leaver").await;

    let pair = state.tokens.issue_token_pair(&user_id).await.unwrap();
    state.tokens.revoke_session(&user_id).await.unwrap();

    assert!(matches!(
        state.tokens.rotate_refresh_token(&pair.refresh_token).await,
        Err(AppError::InvalidToken)
    ));
    // Access tokens are self-contained and remain valid until expiry.
    assert!(state.tokens.verify_access_token(&pair.access_token).is_ok());
}

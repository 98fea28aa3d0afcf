// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access/refresh token lifecycle.
//!
//! Access tokens are short-lived and verified without touching the store.
//! Refresh tokens are long-lived, signed with a separate key, and only the
//! SHA-256 digest of the single valid one is kept on the user record.
//! Rotation swaps that digest with a compare-and-set, so a refresh token
//! can be redeemed at most once.

use crate::config::Config;
use crate::db::Db;
use crate::error::AppError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use subtle::ConstantTimeEq;

/// Which of the two token types a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims for both token types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub typ: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Random nonce; two tokens issued in the same second still differ
    pub jti: String,
    // Access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Hex SHA-256 of a token, as stored in the user's `refreshToken` field.
pub fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn digests_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Issues, verifies, rotates and revokes session tokens.
#[derive(Clone)]
pub struct TokenService {
    db: Db,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(db: Db, config: &Config) -> Self {
        Self {
            db,
            access_encoding: EncodingKey::from_secret(&config.access_token_secret),
            access_decoding: DecodingKey::from_secret(&config.access_token_secret),
            refresh_encoding: EncodingKey::from_secret(&config.refresh_token_secret),
            refresh_decoding: DecodingKey::from_secret(&config.refresh_token_secret),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue a fresh pair for a user and make its refresh token the only
    /// valid one (the most recent login wins).
    pub async fn issue_token_pair(&self, user_id: &str) -> Result<TokenPair, AppError> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let pair = self.sign_pair(&user)?;
        if !self
            .db
            .set_refresh_token(&user.id, &digest(&pair.refresh_token))
            .await?
        {
            return Err(AppError::not_found("User"));
        }

        tracing::debug!(user_id = %user.id, "Issued token pair");
        Ok(pair)
    }

    /// Check signature, expiry and type of an access token. Never touches
    /// the store.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AppError> {
        self.verify(token, &self.access_decoding, TokenKind::Access)
    }

    /// Redeem a refresh token for a new pair.
    ///
    /// The presented token must be the one currently stored for its user.
    /// A superseded, revoked or concurrently redeemed token fails with
    /// [`AppError::InvalidToken`].
    pub async fn rotate_refresh_token(&self, presented: &str) -> Result<TokenPair, AppError> {
        let claims = self.verify(presented, &self.refresh_decoding, TokenKind::Refresh)?;

        let user = self
            .db
            .get_user(&claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        let presented_digest = digest(presented);
        let current = user.refresh_token.as_deref().unwrap_or_default();
        if !digests_match(current, &presented_digest) {
            tracing::warn!(user_id = %user.id, "Rejected stale or revoked refresh token");
            return Err(AppError::InvalidToken);
        }

        let pair = self.sign_pair(&user)?;
        let swapped = self
            .db
            .swap_refresh_token(&user.id, &presented_digest, &digest(&pair.refresh_token))
            .await?;
        if !swapped {
            tracing::warn!(user_id = %user.id, "Refresh token redeemed concurrently");
            return Err(AppError::InvalidToken);
        }

        tracing::debug!(user_id = %user.id, "Rotated refresh token");
        Ok(pair)
    }

    /// End the user's session by forgetting the stored refresh token.
    /// Outstanding access tokens stay valid until they expire.
    pub async fn revoke_session(&self, user_id: &str) -> Result<(), AppError> {
        if !self.db.clear_refresh_token(user_id).await? {
            return Err(AppError::not_found("User"));
        }
        tracing::debug!(user_id, "Revoked session");
        Ok(())
    }

    fn sign_pair(&self, user: &crate::models::User) -> Result<TokenPair, AppError> {
        let now = chrono::Utc::now().timestamp();

        let access = Claims {
            sub: user.id.clone(),
            typ: TokenKind::Access,
            iat: now,
            exp: now + self.access_ttl.as_secs() as i64,
            jti: uuid::Uuid::new_v4().to_string(),
            username: Some(user.username.clone()),
            email: Some(user.email.clone()),
            fullname: Some(user.fullname.clone()),
        };
        let refresh = Claims {
            sub: user.id.clone(),
            typ: TokenKind::Refresh,
            iat: now,
            exp: now + self.refresh_ttl.as_secs() as i64,
            jti: uuid::Uuid::new_v4().to_string(),
            username: None,
            email: None,
            fullname: None,
        };

        Ok(TokenPair {
            access_token: sign(&access, &self.access_encoding)?,
            refresh_token: sign(&refresh, &self.refresh_encoding)?,
        })
    }

    fn verify(
        &self,
        token: &str,
        key: &DecodingKey,
        expected: TokenKind,
    ) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Token verification failed");
            AppError::InvalidToken
        })?;

        if data.claims.typ != expected {
            return Err(AppError::InvalidToken);
        }
        Ok(data.claims)
    }
}

fn sign(claims: &Claims, key: &EncodingKey) -> Result<String, AppError> {
    encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use std::env;
use std::time::Duration;

/// Longest accepted token lifetime.
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// MongoDB connection string (`memory://` for the in-process store)
    pub mongodb_uri: String,
    /// Database name
    pub db_name: String,
    /// Frontend origin allowed by CORS
    pub cors_origin: String,

    /// HS256 key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// HS256 key for refresh tokens; must differ from the access key
    pub refresh_token_secret: Vec<u8>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Mark auth cookies `Secure`
    pub cookie_secure: bool,

    /// Argon2 memory cost in KiB
    pub argon2_memory_kib: u32,
    /// Argon2 time cost
    pub argon2_iterations: u32,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8000,
            mongodb_uri: "memory://".to_string(),
            db_name: "vidtube_test".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            access_token_secret: b"test_access_secret_32_bytes_min!!".to_vec(),
            refresh_token_secret: b"test_refresh_secret_32_bytes_min!".to_vec(),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(10 * 24 * 60 * 60),
            cookie_secure: true,
            // Cheap hashing keeps tests fast.
            argon2_memory_kib: 8,
            argon2_iterations: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let or_default = |key: &'static str, default: &str| {
            lookup(key).unwrap_or_else(|| default.to_string())
        };

        let access_token_secret = required("ACCESS_TOKEN_SECRET")?.into_bytes();
        let refresh_token_secret = required("REFRESH_TOKEN_SECRET")?.into_bytes();
        if access_token_secret == refresh_token_secret {
            return Err(ConfigError::Invalid(
                "REFRESH_TOKEN_SECRET",
                "must differ from ACCESS_TOKEN_SECRET".to_string(),
            ));
        }

        Ok(Self {
            port: parse_number("PORT", &or_default("PORT", "8000"))?,
            mongodb_uri: required("MONGODB_URI")?,
            db_name: or_default("DB_NAME", "vidtube"),
            cors_origin: or_default("CORS_ORIGIN", "http://localhost:5173"),
            access_token_secret,
            refresh_token_secret,
            access_token_ttl: parse_ttl(
                "ACCESS_TOKEN_EXPIRY",
                &or_default("ACCESS_TOKEN_EXPIRY", "1d"),
            )?,
            refresh_token_ttl: parse_ttl(
                "REFRESH_TOKEN_EXPIRY",
                &or_default("REFRESH_TOKEN_EXPIRY", "10d"),
            )?,
            cookie_secure: parse_bool("COOKIE_SECURE", &or_default("COOKIE_SECURE", "true"))?,
            argon2_memory_kib: parse_number(
                "ARGON2_MEMORY_KIB",
                &or_default("ARGON2_MEMORY_KIB", "19456"),
            )?,
            argon2_iterations: parse_number(
                "ARGON2_ITERATIONS",
                &or_default("ARGON2_ITERATIONS", "2"),
            )?,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(key, format!("'{}' is not a valid number", value)))
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid(
            key,
            format!("'{}' is not a boolean", value),
        )),
    }
}

/// Parse a token lifetime such as `15m`, `1d` or `3600` (seconds), at
/// most [`MAX_TTL`].
pub fn parse_ttl(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let invalid = || ConfigError::Invalid(key, format!("'{}' is not a valid duration", value));

    let (digits, multiplier) = match value.char_indices().last() {
        Some((i, 's')) => (&value[..i], 1),
        Some((i, 'm')) => (&value[..i], 60),
        Some((i, 'h')) => (&value[..i], 60 * 60),
        Some((i, 'd')) => (&value[..i], 24 * 60 * 60),
        Some(_) => (value, 1),
        None => return Err(invalid()),
    };

    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    if amount == 0 {
        return Err(invalid());
    }
    amount
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .filter(|ttl| *ttl <= MAX_TTL)
        .ok_or_else(invalid)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request middleware: access token checks and API response headers.

pub mod auth;
pub mod security;

pub use auth::require_auth;
pub use security::add_security_headers;

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod password;
pub mod read_model;
pub mod tokens;

pub use password::PasswordHasher;
pub use tokens::{Claims, TokenKind, TokenPair, TokenService};

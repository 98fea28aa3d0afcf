// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Extractors that validate input and reject with [`AppError::Validation`].

use crate::db::is_object_id;
use crate::error::AppError;
use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

/// JSON body deserialized and checked with [`Validate`].
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        value
            .validate()
            .map_err(|e| AppError::Validation(describe(&e)))?;
        Ok(ValidJson(value))
    }
}

/// Query string deserialized and checked with [`Validate`].
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        value
            .validate()
            .map_err(|e| AppError::Validation(describe(&e)))?;
        Ok(ValidQuery(value))
    }
}

/// Flatten validation errors into one message, ordered by field name.
fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Check that a path id is a well-formed object id.
pub fn parse_id<'a>(id: &'a str, what: &str) -> Result<&'a str, AppError> {
    if is_object_id(id) {
        Ok(id)
    } else {
        Err(AppError::Validation(format!("Invalid {} id", what)))
    }
}

/// Reject a string that is empty after trimming.
pub fn non_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Body {
        #[validate(length(min = 1, message = "title is required"))]
        title: String,
        #[validate(email(message = "email is invalid"))]
        email: String,
    }

    #[test]
    fn test_describe_sorts_messages() {
        let body = Body {
            title: String::new(),
            email: "nope".into(),
        };
        let errors = body.validate().unwrap_err();
        assert_eq!(describe(&errors), "email is invalid; title is required");
    }

    #[test]
    fn test_parse_id() {
        assert!(parse_id("65a1b2c3d4e5f6a7b8c9d0e1", "video").is_ok());
        let err = parse_id("abc", "video").unwrap_err();
        assert_eq!(err.to_string(), "Invalid video id");
    }

    #[test]
    fn test_non_blank() {
        assert!(non_blank("  ").is_err());
        assert!(non_blank(" x ").is_ok());
    }
}

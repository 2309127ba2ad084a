//! Bearer token guard for the UI API.
//!
//! With `UI_TOKEN` set, every request must carry `Authorization: Bearer <UI_TOKEN>`.
//! Without it the API is open, which suits a host bound to localhost.
//! Browsers cannot set headers on a WebSocket upgrade, so `?access_token=`
//! is accepted in place of the header.

use axum::{
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts, Uri},
};
use serde::Deserialize;

use crate::error::AppError;
use crate::AppState;

/// A caller allowed to drive the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiUser {
    /// The presented bearer token, or "anonymous" on an open API
    #[allow(dead_code)]
    pub token: String,
}

impl FromRequestParts<AppState> for UiUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| query_token(&parts.uri).map(|token| format!("Bearer {token}")));

        authorize(auth_header.as_deref(), state.config.ui_token.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

/// The percent-decoded `access_token` query parameter, if any.
fn query_token(uri: &Uri) -> Option<String> {
    let Query(query) = Query::<TokenQuery>::try_from_uri(uri).ok()?;
    query.access_token
}

fn authorize(
    auth_header: Option<&str>,
    expected: Option<&str>,
) -> Result<UiUser, AppError> {
    match (auth_header, expected) {
        (Some(header), expected) => {
            let Some(token) = header.strip_prefix("Bearer ") else {
                return Err(AppError::Unauthorized(
                    "Invalid authorization header format",
                ));
            };
            if token.is_empty() {
                return Err(AppError::Unauthorized("Empty bearer token"));
            }
            match expected {
                Some(expected) if expected != token => {
                    tracing::warn!("UI request with wrong bearer token");
                    Err(AppError::Unauthorized("Invalid bearer token"))
                }
                _ => Ok(UiUser {
                    token: token.to_string(),
                }),
            }
        }
        (None, None) => Ok(UiUser {
            token: "anonymous".to_string(),
        }),
        (None, Some(_)) => Err(AppError::Unauthorized("Missing authorization header")),
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated callers.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity is AuthenticatedIdentity
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::info;

use super::{AuthError, AuthenticatedIdentity};
use crate::state::AppState;

/// Extractor for authenticated callers.
///
/// Reuses an identity the auth middleware already stored in the request
/// extensions; otherwise verifies the bearer token itself.
pub struct Auth(pub AuthenticatedIdentity);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<AuthenticatedIdentity>().cloned() {
            return Ok(Auth(identity));
        }

        let identity = authenticate(&parts.headers, state).await?;
        Ok(Auth(identity))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::InvalidAuthHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Verify the request's bearer token and log the reason on rejection.
pub async fn authenticate(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<AuthenticatedIdentity, AuthError> {
    let result = match bearer_token(headers) {
        Ok(token) => state.verifier.verify(token, state.clock.now()).await,
        Err(err) => Err(err),
    };

    if let Err(err) = &result {
        info!(reason = err.error_code(), error = %err, "Bearer authentication rejected");
    }
    result
}

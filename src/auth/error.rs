// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every variant is terminal for a single verification call. The reason is
//! kept for logs only: the HTTP response collapses all token rejections into
//! a single `unauthenticated` body so a caller cannot probe which check a
//! forged token tripped.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Authorization header is required")]
    MissingAuthHeader,
    /// Authorization header is not `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,
    /// Wrong segment count, bad base64url, or unparsable JSON
    #[error("Token is malformed")]
    MalformedToken,
    /// Header declares an algorithm outside the RSA allow-list
    #[error("Token algorithm is not supported")]
    UnsupportedAlgorithm,
    /// Header carries no `kid`
    #[error("Token header has no key id")]
    MissingKeyId,
    /// No snapshot, even a freshly fetched one, holds the key id
    #[error("No signing key with id '{0}'")]
    UnknownKeyId(String),
    /// The key set could not be fetched or parsed
    #[error("Identity provider key set unavailable: {0}")]
    KeyProviderUnavailable(String),
    /// A published key record could not be turned into a public key
    #[error("Malformed key material: {0}")]
    MalformedKeyMaterial(String),
    /// Token signature is invalid
    #[error("Token signature is invalid")]
    InvalidSignature,
    /// Token has expired
    #[error("Token has expired")]
    TokenExpired,
    /// Token is not yet valid
    #[error("Token is not yet valid")]
    TokenNotYetValid,
    /// Token issuer is invalid
    #[error("Token issuer is invalid")]
    InvalidIssuer,
    /// Token audience is invalid
    #[error("Token audience is invalid")]
    InvalidAudience,
    /// A required claim is absent
    #[error("Token is missing required claim '{0}'")]
    MissingRequiredClaim(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
}

impl AuthError {
    /// Stable reason code for logs and metrics.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnsupportedAlgorithm => "unsupported_algorithm",
            AuthError::MissingKeyId => "missing_key_id",
            AuthError::UnknownKeyId(_) => "unknown_key_id",
            AuthError::KeyProviderUnavailable(_) => "key_provider_unavailable",
            AuthError::MalformedKeyMaterial(_) => "malformed_key_material",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::MissingRequiredClaim(_) => "missing_required_claim",
        }
    }

    /// Only a key provider fault is worth retrying with the same token.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::KeyProviderUnavailable(_))
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::KeyProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            let body = Json(AuthErrorBody {
                error: "authentication_unavailable",
            });
            return (status, body).into_response();
        }

        let body = Json(AuthErrorBody {
            error: "unauthenticated",
        });
        let mut response = (status, body).into_response();
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::{Auth, AuthenticatedIdentity};

/// Response for GET /v1/users/me
#[derive(Debug, Serialize)]
pub struct UserMeResponse {
    /// Canonical user ID (`sub`)
    pub user_id: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<AuthenticatedIdentity> for UserMeResponse {
    fn from(identity: AuthenticatedIdentity) -> Self {
        Self {
            email: identity.claims.string("email").map(str::to_string),
            user_id: identity.subject,
            username: identity.username,
            expires_at: identity.expires_at,
        }
    }
}

/// Get the current authenticated user's information.
pub async fn get_current_user(Auth(identity): Auth) -> Json<UserMeResponse> {
    Json(identity.into())
}

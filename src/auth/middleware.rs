// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Applies bearer authentication to a whole router subtree. The verified
//! identity is stored in the request extensions, where the `Auth` extractor
//! picks it up without verifying the token a second time.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/me", get(me))
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::authenticate;
use crate::state::AppState;

/// Reject unauthenticated requests; attach the identity to the rest.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match authenticate(request.headers(), &state).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

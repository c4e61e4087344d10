// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! IdP Auth Server - bearer token verification against an identity provider
//!
//! Verifies RS256/RS384/RS512 access tokens issued by an OpenID Connect
//! identity provider, using signing keys fetched from its JWKS endpoint.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Key material decoding, key directory and token verification
//! - `config` - Environment configuration
//! - `state` - Shared application state

pub mod api;
pub mod auth;
pub mod config;
pub mod state;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token authentication against an external identity provider.
//!
//! ## Auth Flow
//!
//! 1. The caller obtains an RSA-signed token from the identity provider
//! 2. The caller sends `Authorization: Bearer <token>`
//! 3. This server:
//!    - Resolves the token's `kid` through the [`KeyDirectory`], which fetches
//!      and caches the provider's published key set
//!    - Verifies the signature, then `exp`, `nbf`, issuer and audience
//!    - Extracts:
//!      - `sub` → canonical subject id
//!      - `preferred_username` → username
//!
//! ## Security
//!
//! - Only RSA PKCS#1 v1.5 algorithms from the configured allow-list verify
//! - Claims are never inspected before the signature check passes
//! - Concurrent key lookups that miss share a single key set fetch
//! - Rejection reasons are logged but never returned to the caller

pub mod claims;
pub mod clock;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod key_material;
pub mod middleware;
pub mod source;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testutil;

pub use claims::{AuthenticatedIdentity, Claims};
pub use clock::{Clock, SystemClock};
pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::{KeyDirectory, KeyDirectorySettings, KeySnapshot};
pub use key_material::DecodedPublicKey;
pub use source::{HttpKeySetSource, KeySetSource};
pub use verifier::{TokenVerifier, VerifierSettings};

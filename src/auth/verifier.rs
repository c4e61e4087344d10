// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! ## Order of checks
//!
//! 1. Split into three base64url segments
//! 2. Decode the header: `alg` must be an allowed RSA algorithm, `kid` present
//! 3. Resolve `kid` through the [`KeyDirectory`]
//! 4. Verify the signature over the encoded `header.payload` text
//! 5. Decode the payload claims
//! 6. Check `exp`, `nbf`, issuer, audience, subject and username
//!
//! No claim is read before step 4 succeeds. Nothing is retained between calls.

use std::str::FromStr;
use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use jsonwebtoken::Algorithm;
use serde_json::{Map, Value};
use tracing::debug;

use super::claims::{AuthenticatedIdentity, Claims, EXPIRES_AT, SUBJECT};
use super::error::AuthError;
use super::jwks::KeyDirectory;
use super::key_material;

/// Default claim carrying the username.
pub const DEFAULT_USERNAME_CLAIM: &str = "preferred_username";

/// Token verification configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    /// Accepted `alg` values; only RSA PKCS#1 v1.5 entries can ever match
    pub allowed_algorithms: Vec<Algorithm>,
    /// Expected `iss`, if any
    pub issuer: Option<String>,
    /// Required member of `aud`, if any
    pub audience: Option<String>,
    /// Claim holding the username
    pub username_claim: String,
    /// Clock skew tolerance in seconds for `exp` and `nbf`
    pub leeway: u64,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            allowed_algorithms: vec![Algorithm::RS256],
            issuer: None,
            audience: None,
            username_claim: DEFAULT_USERNAME_CLAIM.to_string(),
            leeway: 0,
        }
    }
}

/// Verifies compact RSA-signed tokens against the provider's key set.
pub struct TokenVerifier {
    directory: Arc<KeyDirectory>,
    settings: VerifierSettings,
}

/// The three decoded segments plus the exact text the signature covers.
struct CompactToken<'a> {
    signing_input: &'a str,
    header: Vec<u8>,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

struct TokenHeader {
    alg: Algorithm,
    kid: String,
}

impl TokenVerifier {
    pub fn new(directory: Arc<KeyDirectory>, settings: VerifierSettings) -> Self {
        Self {
            directory,
            settings,
        }
    }

    pub fn directory(&self) -> &Arc<KeyDirectory> {
        &self.directory
    }

    /// Verify `token` as of `now`.
    pub async fn verify(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let compact = split(token)?;
        let header = self.parse_header(&compact.header)?;

        let key = self.directory.resolve(&header.kid).await?;
        if key.algorithm().is_some_and(|pinned| pinned != header.alg) {
            return Err(AuthError::UnsupportedAlgorithm);
        }
        key.verify(
            header.alg,
            compact.signing_input.as_bytes(),
            &compact.signature,
        )?;

        let claims = Claims::from_json(&compact.payload)?;
        let identity = self.validate_claims(claims, now)?;
        debug!(kid = %header.kid, sub = %identity.subject, "Token verified");
        Ok(identity)
    }

    fn parse_header(&self, bytes: &[u8]) -> Result<TokenHeader, AuthError> {
        let header: Map<String, Value> =
            serde_json::from_slice(bytes).map_err(|_| AuthError::MalformedToken)?;

        let alg = header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or(AuthError::MalformedToken)?;
        let alg = Algorithm::from_str(alg).map_err(|_| AuthError::UnsupportedAlgorithm)?;
        if !key_material::is_supported_algorithm(alg)
            || !self.settings.allowed_algorithms.contains(&alg)
        {
            return Err(AuthError::UnsupportedAlgorithm);
        }

        // No critical header extensions are understood.
        if header.contains_key("crit") {
            return Err(AuthError::MalformedToken);
        }

        let kid = header
            .get("kid")
            .and_then(Value::as_str)
            .filter(|kid| !kid.is_empty())
            .ok_or(AuthError::MissingKeyId)?;

        Ok(TokenHeader {
            alg,
            kid: kid.to_string(),
        })
    }

    fn validate_claims(
        &self,
        claims: Claims,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let now = now.timestamp();
        let leeway = i64::try_from(self.settings.leeway).unwrap_or(i64::MAX);

        let exp = claims
            .expires_at()?
            .ok_or_else(|| AuthError::MissingRequiredClaim(EXPIRES_AT.to_string()))?;
        if exp.saturating_add(leeway) <= now {
            return Err(AuthError::TokenExpired);
        }

        if let Some(nbf) = claims.not_before()? {
            if nbf.saturating_sub(leeway) > now {
                return Err(AuthError::TokenNotYetValid);
            }
        }

        if let Some(expected) = &self.settings.issuer {
            if claims.issuer() != Some(expected.as_str()) {
                return Err(AuthError::InvalidIssuer);
            }
        }

        if let Some(expected) = &self.settings.audience {
            if !claims.audiences().contains(&expected.as_str()) {
                return Err(AuthError::InvalidAudience);
            }
        }

        let subject = claims
            .subject()
            .ok_or_else(|| AuthError::MissingRequiredClaim(SUBJECT.to_string()))?
            .to_string();
        let username = claims
            .string(&self.settings.username_claim)
            .ok_or_else(|| AuthError::MissingRequiredClaim(self.settings.username_claim.clone()))?
            .to_string();
        let expires_at = DateTime::from_timestamp(exp, 0).ok_or(AuthError::MalformedToken)?;

        Ok(AuthenticatedIdentity {
            subject,
            username,
            expires_at,
            claims,
        })
    }
}

fn split(token: &str) -> Result<CompactToken<'_>, AuthError> {
    let (signing_input, signature) = token.rsplit_once('.').ok_or(AuthError::MalformedToken)?;
    let (header, payload) = signing_input
        .split_once('.')
        .ok_or(AuthError::MalformedToken)?;
    if payload.contains('.') {
        return Err(AuthError::MalformedToken);
    }

    Ok(CompactToken {
        signing_input,
        header: decode_segment(header)?,
        payload: decode_segment(payload)?,
        signature: decode_segment(signature)?,
    })
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, AuthError> {
    Base64UrlUnpadded::decode_vec(segment).map_err(|_| AuthError::MalformedToken)
}

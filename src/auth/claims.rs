// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the authenticated identity built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::AuthError;

pub const SUBJECT: &str = "sub";
pub const EXPIRES_AT: &str = "exp";
pub const NOT_BEFORE: &str = "nbf";
pub const ISSUED_AT: &str = "iat";
pub const ISSUER: &str = "iss";
pub const AUDIENCE: &str = "aud";

/// Decoded claim mapping from a token payload.
///
/// Typed accessors cover the registered claims; everything else passes
/// through untouched via [`Claims::get`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Parse a payload segment. Anything other than a JSON object is malformed.
    pub fn from_json(bytes: &[u8]) -> Result<Self, AuthError> {
        serde_json::from_slice::<Map<String, Value>>(bytes)
            .map(Claims)
            .map_err(|_| AuthError::MalformedToken)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A claim as a non-empty string.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// A NumericDate claim in whole seconds.
    ///
    /// Absent is `Ok(None)`. Present but not a number, or outside the range a
    /// `DateTime<Utc>` can hold, is `MalformedToken`.
    pub fn numeric_date(&self, name: &str) -> Result<Option<i64>, AuthError> {
        let value = match self.0.get(name) {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value,
        };

        let min = DateTime::<Utc>::MIN_UTC.timestamp();
        let max = DateTime::<Utc>::MAX_UTC.timestamp();
        let secs = match value.as_i64() {
            Some(secs) => secs,
            None => {
                let secs = value.as_f64().ok_or(AuthError::MalformedToken)?.floor();
                // NaN and infinities fall outside too
                if !(min as f64..=max as f64).contains(&secs) {
                    return Err(AuthError::MalformedToken);
                }
                secs as i64
            }
        };
        if !(min..=max).contains(&secs) {
            return Err(AuthError::MalformedToken);
        }
        Ok(Some(secs))
    }

    pub fn subject(&self) -> Option<&str> {
        self.string(SUBJECT)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.string(ISSUER)
    }

    /// `aud` as a list, whether it was sent as a string or an array.
    pub fn audiences(&self) -> Vec<&str> {
        match self.0.get(AUDIENCE) {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn expires_at(&self) -> Result<Option<i64>, AuthError> {
        self.numeric_date(EXPIRES_AT)
    }

    pub fn not_before(&self) -> Result<Option<i64>, AuthError> {
        self.numeric_date(NOT_BEFORE)
    }

    pub fn issued_at(&self) -> Result<Option<i64>, AuthError> {
        self.numeric_date(ISSUED_AT)
    }
}

/// Authenticated caller extracted from a verified token.
///
/// This is the type the rest of the application sees; it only exists after
/// the signature and every claim check passed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticatedIdentity {
    /// Canonical user ID (`sub` claim)
    pub subject: String,

    /// Username (`preferred_username` unless configured otherwise)
    pub username: String,

    /// Token expiration
    pub expires_at: DateTime<Utc>,

    /// Every decoded claim, for callers that need more than the above
    pub claims: Claims,
}

impl AuthenticatedIdentity {
    /// Look up any claim by name.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}

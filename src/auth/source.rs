// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider key set fetching.
//!
//! [`KeySetSource`] is the seam between the key directory and the network.
//! [`HttpKeySetSource`] is the production implementation: a plain GET of the
//! provider's JWKS document with a bounded timeout.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::error::AuthError;

/// Boxed future returned by [`KeySetSource::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<KeySetDocument, AuthError>> + Send + 'a>>;

/// Somewhere a key set document can be fetched from.
pub trait KeySetSource: Send + Sync {
    /// Fetch the current key set document.
    ///
    /// Unreachable endpoints, non-2xx responses and unparsable documents
    /// all fail with `KeyProviderUnavailable`.
    fn fetch(&self) -> FetchFuture<'_>;

    /// Human readable location for logs.
    fn location(&self) -> String;
}

/// A key set document (`{"keys": [...]}`).
///
/// Entries are kept as raw JSON so that one unparsable entry does not sink
/// the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeySetDocument {
    pub keys: Vec<serde_json::Value>,
}

/// One published key record.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishedKey {
    /// Key ID
    #[serde(default)]
    pub kid: Option<String>,
    /// Key type (`RSA`, `EC`, ...)
    pub kty: String,
    /// Algorithm the key is meant for, if declared
    #[serde(default)]
    pub alg: Option<String>,
    /// Intended use (`sig` or `enc`)
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    /// Base64url modulus
    #[serde(default)]
    pub n: Option<String>,
    /// Base64url exponent
    #[serde(default)]
    pub e: Option<String>,
}

/// Fetches the key set over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpKeySetSource {
    url: Url,
    client: reqwest::Client,
}

impl HttpKeySetSource {
    /// Create a source for `url` whose requests give up after `timeout`.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { url, client })
    }
}

fn unavailable(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::KeyProviderUnavailable("timed out fetching key set".to_string())
    } else {
        AuthError::KeyProviderUnavailable(err.to_string())
    }
}

impl KeySetSource for HttpKeySetSource {
    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url.clone())
                .send()
                .await
                .map_err(unavailable)?;

            if !response.status().is_success() {
                return Err(AuthError::KeyProviderUnavailable(format!(
                    "HTTP {} from key set endpoint",
                    response.status()
                )));
            }

            response.json::<KeySetDocument>().await.map_err(unavailable)
        })
    }

    fn location(&self) -> String {
        self.url.to_string()
    }
}

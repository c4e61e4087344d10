// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key directory: cached, single-flight access to the provider's signing keys.
//!
//! ## Caching
//!
//! - Keys live in an immutable [`KeySnapshot`]; a refresh swaps the whole
//!   snapshot, readers never see a half-built one
//! - A snapshot with zero usable keys is never published
//! - With a freshness window, an expired snapshot forces a refresh on the next
//!   `resolve`; if that refresh fails the stale snapshot still serves keys it
//!   already holds
//! - Concurrent misses share one in-flight fetch and its outcome
//!
//! Refreshes are demand driven. Nothing here spawns background tasks.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::Algorithm;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::key_material::{self, DecodedPublicKey};
use super::source::{KeySetDocument, KeySetSource, PublishedKey};

/// Default fetch timeout (10 seconds).
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default snapshot freshness window (5 minutes).
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(300);

/// Key directory configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDirectorySettings {
    /// Upper bound on a single key set fetch
    pub fetch_timeout: Duration,
    /// Snapshot age after which the next resolve refetches; `None` keeps a
    /// snapshot until a lookup misses
    pub freshness: Option<Duration>,
    /// Minimum snapshot age before an unknown key id may trigger another
    /// fetch; `None` refetches on every miss
    pub miss_cooldown: Option<Duration>,
}

impl Default for KeyDirectorySettings {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            freshness: Some(DEFAULT_FRESHNESS),
            miss_cooldown: None,
        }
    }
}

/// Immutable set of decoded keys from one fetch.
#[derive(Debug)]
pub struct KeySnapshot {
    keys: HashMap<String, Arc<DecodedPublicKey>>,
    fetched_at: Instant,
}

impl KeySnapshot {
    pub fn get(&self, kid: &str) -> Option<Arc<DecodedPublicKey>> {
        self.keys.get(kid).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key IDs in this snapshot, sorted.
    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keys.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

type RefreshOutcome = Result<Arc<KeySnapshot>, AuthError>;

/// One coalesced refresh. `epoch` is the refresh counter when it started.
struct Flight {
    epoch: u64,
    outcome: Arc<OnceCell<RefreshOutcome>>,
}

/// Resolves key IDs to public keys, fetching from the provider on demand.
pub struct KeyDirectory {
    source: Arc<dyn KeySetSource>,
    settings: KeyDirectorySettings,
    /// Current snapshot, replaced whole on refresh
    current: RwLock<Option<Arc<KeySnapshot>>>,
    /// Number of completed refresh attempts
    epoch: AtomicU64,
    /// Most recent refresh, running or finished
    flight: Mutex<Option<Flight>>,
}

impl KeyDirectory {
    /// Create an empty directory backed by `source`.
    pub fn new(source: Arc<dyn KeySetSource>, settings: KeyDirectorySettings) -> Self {
        Self {
            source,
            settings,
            current: RwLock::new(None),
            epoch: AtomicU64::new(0),
            flight: Mutex::new(None),
        }
    }

    /// The current snapshot, if one has been published.
    pub async fn snapshot(&self) -> Option<Arc<KeySnapshot>> {
        self.current.read().await.clone()
    }

    /// Check if a snapshot is published and still within its freshness window.
    pub async fn is_cached(&self) -> bool {
        match &*self.current.read().await {
            Some(snapshot) => !self.is_expired(snapshot),
            None => false,
        }
    }

    /// Look up the public key for `kid`.
    ///
    /// A fresh snapshot hit returns without I/O. A miss, or an expired
    /// snapshot, triggers one coalesced refresh; a key still absent after that
    /// is `UnknownKeyId`.
    pub async fn resolve(&self, kid: &str) -> Result<Arc<DecodedPublicKey>, AuthError> {
        // Read the epoch before the snapshot so a refresh that lands in between
        // is joined rather than repeated.
        let observed = self.epoch.load(Ordering::Acquire);
        let current = self.snapshot().await;

        if let Some(snapshot) = &current {
            if !self.is_expired(snapshot) {
                if let Some(key) = snapshot.get(kid) {
                    return Ok(key);
                }
                if let Some(cooldown) = self.settings.miss_cooldown {
                    if snapshot.age() < cooldown {
                        debug!(kid, "Unknown key id within refresh cooldown");
                        return Err(AuthError::UnknownKeyId(kid.to_string()));
                    }
                }
            }
        }

        match self.refresh_after(observed).await {
            Ok(snapshot) => snapshot
                .get(kid)
                .ok_or_else(|| AuthError::UnknownKeyId(kid.to_string())),
            Err(err) => {
                if let Some(key) = current.as_ref().and_then(|s| s.get(kid)) {
                    warn!(kid, error = %err, "Key set refresh failed, serving key from stale snapshot");
                    return Ok(key);
                }
                Err(err)
            }
        }
    }

    /// Force a refresh of the key set.
    ///
    /// Joins a refresh already in flight instead of starting a second one.
    pub async fn refresh(&self) -> Result<Arc<KeySnapshot>, AuthError> {
        let observed = self.epoch.load(Ordering::Acquire);
        self.refresh_after(observed).await
    }

    fn is_expired(&self, snapshot: &KeySnapshot) -> bool {
        self.settings
            .freshness
            .is_some_and(|window| snapshot.age() >= window)
    }

    /// Refresh unless one that started at or after `observed` can be reused.
    async fn refresh_after(&self, observed: u64) -> RefreshOutcome {
        let outcome = {
            let mut flight = self.flight.lock().await;
            match flight.as_ref() {
                Some(existing) if existing.epoch >= observed => Arc::clone(&existing.outcome),
                _ => {
                    let outcome = Arc::new(OnceCell::new());
                    *flight = Some(Flight {
                        epoch: self.epoch.load(Ordering::Acquire),
                        outcome: Arc::clone(&outcome),
                    });
                    outcome
                }
            }
        };

        outcome.get_or_init(|| self.fetch_and_publish()).await.clone()
    }

    async fn fetch_and_publish(&self) -> RefreshOutcome {
        let result = self.fetch_snapshot().await;
        if let Ok(snapshot) = &result {
            *self.current.write().await = Some(Arc::clone(snapshot));
        }
        self.epoch.fetch_add(1, Ordering::AcqRel);
        result
    }

    async fn fetch_snapshot(&self) -> RefreshOutcome {
        let location = self.source.location();
        debug!(url = %location, "Fetching key set");

        let document = tokio::time::timeout(self.settings.fetch_timeout, self.source.fetch())
            .await
            .map_err(|_| {
                AuthError::KeyProviderUnavailable(format!(
                    "key set fetch timed out after {:?}",
                    self.settings.fetch_timeout
                ))
            })
            .and_then(|fetched| fetched)
            .inspect_err(|err| warn!(url = %location, error = %err, "Key set fetch failed"))?;

        let snapshot = build_snapshot(document)?;
        info!(url = %location, keys = snapshot.len(), "Key set refreshed");
        Ok(Arc::new(snapshot))
    }
}

/// Decode every usable entry; skip the rest.
fn build_snapshot(document: KeySetDocument) -> Result<KeySnapshot, AuthError> {
    let total = document.keys.len();
    let mut keys = HashMap::with_capacity(total);

    for entry in document.keys {
        match decode_entry(entry) {
            Ok((kid, key)) => {
                keys.insert(kid, Arc::new(key));
            }
            Err(reason) => warn!(reason = %reason, "Skipping key set entry"),
        }
    }

    if keys.is_empty() {
        return Err(AuthError::KeyProviderUnavailable(format!(
            "key set had no usable signing keys ({total} entries)"
        )));
    }
    if keys.len() < total {
        debug!(usable = keys.len(), skipped = total - keys.len(), "Key set partially decoded");
    }

    Ok(KeySnapshot {
        keys,
        fetched_at: Instant::now(),
    })
}

fn decode_entry(entry: serde_json::Value) -> Result<(String, DecodedPublicKey), String> {
    let record: PublishedKey =
        serde_json::from_value(entry).map_err(|e| format!("unparsable entry: {e}"))?;

    let kid = match record.kid {
        Some(kid) if !kid.is_empty() => kid,
        _ => return Err("entry has no kid".to_string()),
    };
    if record.key_use.as_deref().is_some_and(|u| u != "sig") {
        return Err(format!("{kid}: not a signing key"));
    }
    if record.kty != "RSA" {
        return Err(format!("{kid}: unsupported key type {}", record.kty));
    }

    let (n, e) = match (record.n.as_deref(), record.e.as_deref()) {
        (Some(n), Some(e)) => (n, e),
        _ => return Err(format!("{kid}: missing modulus or exponent")),
    };
    let mut key = key_material::decode(n, e).map_err(|err| format!("{kid}: {err}"))?;

    if let Some(alg) = record.alg.as_deref() {
        let alg = Algorithm::from_str(alg)
            .ok()
            .filter(|alg| key_material::is_supported_algorithm(*alg))
            .ok_or_else(|| format!("{kid}: unsupported algorithm {alg}"))?;
        key = key.with_algorithm(alg);
    }

    Ok((kid, key))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cached RSA signing keys fetched from a JWKS endpoint.
//!
//! Shared by the Firebase ID token verifier and the scheduler OIDC verifier.

use anyhow::Context;
use jsonwebtoken::DecodingKey;
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Failure to obtain a signing key.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KeyLookupError {
    /// The token names a key the issuer does not publish.
    #[error("unknown signing key: {0}")]
    UnknownKid(String),
    /// The key endpoint could not be reached or parsed.
    #[error("JWKS unavailable: {0}")]
    Transient(String),
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// JWKS cache with single-flight refresh.
pub struct JwksCache {
    http_client: reqwest::Client,
    jwks_url: String,
    cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl JwksCache {
    pub fn new(jwks_url: impl Into<String>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building JWKS HTTP client")?;

        Ok(Self {
            http_client,
            jwks_url: jwks_url.into(),
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Find the key for `kid`, refreshing the cache (once forced) on a miss.
    pub async fn key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, KeyLookupError> {
        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(KeyLookupError::UnknownKid(kid.to_string()))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh(&self, force_refresh: bool) -> Result<(), KeyLookupError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(jwks_url = %self.jwks_url, "Refreshing JWKS cache");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| KeyLookupError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(KeyLookupError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| KeyLookupError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let keys_by_kid = usable_rsa_keys(jwks);
        if keys_by_kid.is_empty() {
            return Err(KeyLookupError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "JWKS cache refreshed");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

fn usable_rsa_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys_by_kid = HashMap::new();

    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            continue;
        }
        if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
            continue;
        }

        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys_by_kid.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
            }
        }
    }

    keys_by_kid
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|raw| raw.trim_matches('"').parse::<u64>().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cache_control_max_age_valid() {
        assert_eq!(
            parse_cache_control_max_age("public, max-age=19204, must-revalidate, no-transform"),
            Some(19204)
        );
        assert_eq!(parse_cache_control_max_age("max-age=\"120\""), Some(120));
    }

    #[test]
    fn parse_cache_control_max_age_invalid() {
        assert_eq!(parse_cache_control_max_age("public, immutable"), None);
        assert_eq!(parse_cache_control_max_age("max-age=abc"), None);
        assert_eq!(parse_cache_control_max_age(""), None);
    }

    #[test]
    fn usable_rsa_keys_filters_non_signing_keys() {
        let jwks: Jwks = serde_json::from_value(serde_json::json!({
            "keys": [
                {"kid": "enc", "kty": "RSA", "use": "enc", "n": "AQAB", "e": "AQAB"},
                {"kid": "ec", "kty": "EC", "n": "AQAB", "e": "AQAB"},
                {"kid": "ps", "kty": "RSA", "alg": "PS256", "n": "AQAB", "e": "AQAB"},
                {"kid": "sig", "kty": "RSA", "alg": "RS256", "use": "sig", "n": "AQAB", "e": "AQAB"}
            ]
        }))
        .unwrap();

        let keys = usable_rsa_keys(jwks);
        assert_eq!(keys.len(), 1);
        assert!(keys.contains_key("sig"));
    }
}

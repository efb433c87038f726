// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OIDC token verification for Cloud Scheduler triggers.

use crate::config::Config;
use crate::services::jwks::{JwksCache, KeyLookupError};
use axum::http::HeaderValue;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;

const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const CLOCK_SKEW_SECS: u64 = 60;

/// Verified scheduler principal extracted from a valid OIDC token.
#[derive(Debug, Clone)]
pub struct VerifiedSchedulerPrincipal {
    pub email: String,
    pub subject: String,
}

/// OIDC verification error categories.
#[derive(Debug, Clone)]
pub enum OidcError {
    /// The token is missing/invalid or claims do not match expectations.
    Forbidden(String),
    /// A transient infrastructure failure occurred (safe for scheduler retry).
    Transient(String),
}

impl From<KeyLookupError> for OidcError {
    fn from(err: KeyLookupError) -> Self {
        match err {
            KeyLookupError::UnknownKid(kid) => {
                OidcError::Forbidden(format!("JWT kid not found in JWKS after refresh: {kid}"))
            }
            KeyLookupError::Transient(msg) => OidcError::Transient(msg),
        }
    }
}

enum VerifierMode {
    Google(JwksCache),
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
}

#[derive(Debug, Deserialize)]
struct GoogleIdTokenClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
}

/// Verifier for Cloud Scheduler-issued OIDC ID tokens.
pub struct GoogleOidcVerifier {
    expected_audience: String,
    expected_service_account_email: String,
    mode: VerifierMode,
}

impl GoogleOidcVerifier {
    /// Create a production verifier backed by Google's JWKS.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let verifier = Self {
            expected_audience: canonicalize_audience(&config.api_url),
            expected_service_account_email: config.scheduler_service_account.clone(),
            mode: VerifierMode::Google(JwksCache::new(GOOGLE_JWKS_URL)?),
        };

        tracing::info!(
            expected_audience = %verifier.expected_audience,
            expected_service_account_email = %verifier.expected_service_account_email,
            "Initialized Cloud Scheduler OIDC verifier"
        );

        Ok(verifier)
    }

    /// Create a verifier with a static RSA public key.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static OIDC kid must not be empty");
        }

        Ok(Self {
            expected_audience: canonicalize_audience(&config.api_url),
            expected_service_account_email: config.scheduler_service_account.clone(),
            mode: VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
        })
    }

    /// Verify a scheduler OIDC bearer token from an Authorization header.
    pub async fn verify_scheduler_token(
        &self,
        auth_header: Option<&HeaderValue>,
    ) -> Result<VerifiedSchedulerPrincipal, OidcError> {
        let token = extract_bearer_token(auth_header)?;

        let header = decode_header(token)
            .map_err(|e| OidcError::Forbidden(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(OidcError::Forbidden(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| OidcError::Forbidden("missing JWT kid".to_string()))?;

        let decoding_key = match &self.mode {
            VerifierMode::StaticKey {
                kid: static_kid,
                decoding_key,
            } if *static_kid == kid => decoding_key.clone(),
            VerifierMode::StaticKey { .. } => {
                return Err(OidcError::Forbidden(format!(
                    "unknown JWT kid for static verifier: {kid}"
                )));
            }
            VerifierMode::Google(jwks) => jwks.key_for_kid(&kid).await?,
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&["https://accounts.google.com", "accounts.google.com"]);
        validation.set_audience(&[self.expected_audience.as_str()]);
        validation.validate_nbf = true;
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<GoogleIdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| OidcError::Forbidden(format!("JWT validation failed: {e}")))?
            .claims;

        let email = claims
            .email
            .ok_or_else(|| OidcError::Forbidden("missing email claim".to_string()))?;

        if email != self.expected_service_account_email {
            return Err(OidcError::Forbidden(format!(
                "unexpected service account email: {email}"
            )));
        }

        if claims.email_verified != Some(true) {
            return Err(OidcError::Forbidden(
                "email_verified claim is not true".to_string(),
            ));
        }

        Ok(VerifiedSchedulerPrincipal {
            email,
            subject: claims.sub,
        })
    }
}

fn extract_bearer_token(auth_header: Option<&HeaderValue>) -> Result<&str, OidcError> {
    let value = auth_header
        .ok_or_else(|| OidcError::Forbidden("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| OidcError::Forbidden("invalid Authorization header".to_string()))?;

    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        OidcError::Forbidden("Authorization header must be Bearer token".to_string())
    })?;

    if token.is_empty() {
        return Err(OidcError::Forbidden("Bearer token is empty".to_string()));
    }

    Ok(token)
}

fn canonicalize_audience(audience: &str) -> String {
    audience.trim_end_matches('/').to_string()
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token verification for callable requests.
//!
//! Production tokens are RS256 JWTs signed by the `securetoken` service
//! account. The Auth emulator issues unsigned tokens (`alg: none`), which are
//! accepted only when the verifier is built in emulator mode.

use crate::config::Config;
use crate::middleware::auth::IdentityClaim;
use crate::services::jwks::{JwksCache, KeyLookupError};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const CLOCK_SKEW_SECS: u64 = 60;
const MAX_SUBJECT_LEN: usize = 128;

/// ID token verification failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenError {
    /// The token is malformed, expired, or issued for another project.
    #[error("invalid ID token: {0}")]
    Invalid(String),
    /// Signing keys could not be fetched.
    #[error("ID token verification unavailable: {0}")]
    Transient(String),
}

impl From<KeyLookupError> for TokenError {
    fn from(err: KeyLookupError) -> Self {
        match err {
            KeyLookupError::UnknownKid(kid) => TokenError::Invalid(format!("unknown kid {kid}")),
            KeyLookupError::Transient(msg) => TokenError::Transient(msg),
        }
    }
}

enum VerifierMode {
    Firebase(JwksCache),
    Emulator,
    StaticKey {
        decoding_key: Arc<DecodingKey>,
        algorithm: Algorithm,
    },
}

#[derive(Debug, Deserialize)]
struct FirebaseIdTokenClaims {
    iss: String,
    aud: String,
    sub: String,
    exp: u64,
    iat: Option<u64>,
    email: Option<String>,
}

/// Verifier turning bearer tokens into identity claims.
pub struct IdTokenVerifier {
    project_id: String,
    expected_issuer: String,
    mode: VerifierMode,
}

impl IdTokenVerifier {
    /// Production or emulator verifier, chosen by `FIREBASE_AUTH_EMULATOR_HOST`.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mode = if config.uses_auth_emulator() {
            tracing::warn!("Accepting unsigned ID tokens from the Auth emulator");
            VerifierMode::Emulator
        } else {
            VerifierMode::Firebase(JwksCache::new(SECURETOKEN_JWKS_URL)?)
        };

        Ok(Self::with_mode(&config.gcp_project_id, mode))
    }

    /// Verifier for unsigned emulator tokens.
    pub fn new_emulator(project_id: &str) -> Self {
        Self::with_mode(project_id, VerifierMode::Emulator)
    }

    /// Verifier with a fixed key, for deterministic tests.
    pub fn new_with_static_key(
        project_id: &str,
        decoding_key: DecodingKey,
        algorithm: Algorithm,
    ) -> Self {
        Self::with_mode(
            project_id,
            VerifierMode::StaticKey {
                decoding_key: Arc::new(decoding_key),
                algorithm,
            },
        )
    }

    fn with_mode(project_id: &str, mode: VerifierMode) -> Self {
        Self {
            project_id: project_id.to_string(),
            expected_issuer: format!("https://securetoken.google.com/{project_id}"),
            mode,
        }
    }

    /// Verify a raw ID token and return the caller's claim.
    pub async fn verify(&self, token: &str) -> Result<IdentityClaim, TokenError> {
        let claims = match &self.mode {
            VerifierMode::Emulator => {
                let claims = decode_unsigned(token)?;
                if claims.exp.saturating_add(CLOCK_SKEW_SECS) < now_unix_secs() {
                    return Err(TokenError::Invalid("token expired".to_string()));
                }
                if claims.iss != self.expected_issuer || claims.aud != self.project_id {
                    return Err(TokenError::Invalid(
                        "token issued for another project".to_string(),
                    ));
                }
                claims
            }
            VerifierMode::StaticKey {
                decoding_key,
                algorithm,
            } => self.decode_signed(token, decoding_key, *algorithm)?,
            VerifierMode::Firebase(jwks) => {
                let header = decode_header(token)
                    .map_err(|e| TokenError::Invalid(format!("invalid JWT header: {e}")))?;
                if header.alg != Algorithm::RS256 {
                    return Err(TokenError::Invalid(format!(
                        "unexpected JWT alg: {:?}",
                        header.alg
                    )));
                }
                let kid = header
                    .kid
                    .ok_or_else(|| TokenError::Invalid("missing JWT kid".to_string()))?;
                let key = jwks.key_for_kid(&kid).await?;
                self.decode_signed(token, &key, Algorithm::RS256)?
            }
        };

        validate_subject_and_iat(&claims)?;

        Ok(IdentityClaim {
            subject_id: claims.sub,
            email: claims.email,
        })
    }

    fn decode_signed(
        &self,
        token: &str,
        key: &DecodingKey,
        algorithm: Algorithm,
    ) -> Result<FirebaseIdTokenClaims, TokenError> {
        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.expected_issuer.as_str()]);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        decode::<FirebaseIdTokenClaims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(format!("JWT validation failed: {e}")))
    }
}

fn decode_unsigned(token: &str) -> Result<FirebaseIdTokenClaims, TokenError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload)) = (parts.next(), parts.next()) else {
        return Err(TokenError::Invalid("malformed JWT".to_string()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TokenError::Invalid(format!("invalid JWT payload encoding: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Invalid(format!("invalid JWT payload: {e}")))
}

fn validate_subject_and_iat(claims: &FirebaseIdTokenClaims) -> Result<(), TokenError> {
    if claims.sub.is_empty() || claims.sub.len() > MAX_SUBJECT_LEN {
        return Err(TokenError::Invalid("invalid sub claim".to_string()));
    }

    if let Some(iat) = claims.iat {
        if iat > now_unix_secs() + CLOCK_SKEW_SECS {
            return Err(TokenError::Invalid("iat claim is in the future".to_string()));
        }
    }

    Ok(())
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

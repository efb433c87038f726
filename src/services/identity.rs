// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity service capability and its Identity Toolkit implementation.
//!
//! Accounts are created and deleted through the Identity Toolkit admin REST
//! API. Against the Auth emulator the special `owner` bearer token grants
//! admin access; in production a service-account token is minted by gcloud-sdk.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const IDENTITY_TOOLKIT_HOST: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Fields for a new identity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub email: String,
    pub display_name: String,
}

/// Identity record as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

/// Identity service errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity service request failed: {0}")]
    Request(String),

    #[error("Identity service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Identity service credentials unavailable: {0}")]
    Credentials(String),
}

/// Capabilities the handlers need from the identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_identity(&self, identity: NewIdentity) -> Result<IdentityRecord, IdentityError>;

    async fn delete_identity(&self, id: &str) -> Result<(), IdentityError>;
}

enum Credentials {
    EmulatorOwner,
    ServiceAccount(Arc<gcloud_sdk::GoogleAuthTokenGenerator>),
}

/// Identity Toolkit admin client.
pub struct IdentityToolkitClient {
    http_client: reqwest::Client,
    accounts_url: String,
    credentials: Credentials,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    email: &'a str,
    display_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteAccountRequest<'a> {
    local_id: &'a str,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl IdentityToolkitClient {
    /// Connect to the Auth emulator at `host:port`.
    pub fn new_emulator(project_id: &str, emulator_host: &str) -> Result<Self, IdentityError> {
        tracing::info!(host = emulator_host, "Using Firebase Auth emulator");
        let base = format!("http://{emulator_host}/identitytoolkit.googleapis.com");
        Ok(Self {
            http_client: build_http_client()?,
            accounts_url: accounts_url(&base, project_id),
            credentials: Credentials::EmulatorOwner,
        })
    }

    /// Connect to the production Identity Toolkit with default credentials.
    pub async fn new(project_id: &str) -> Result<Self, IdentityError> {
        let generator = gcloud_sdk::GoogleAuthTokenGenerator::new(
            gcloud_sdk::TokenSourceType::Default,
            vec![CLOUD_PLATFORM_SCOPE.to_string()],
        )
        .await
        .map_err(|e| IdentityError::Credentials(e.to_string()))?;

        tracing::info!(project = project_id, "Connected to Identity Toolkit");

        Ok(Self {
            http_client: build_http_client()?,
            accounts_url: accounts_url(IDENTITY_TOOLKIT_HOST, project_id),
            credentials: Credentials::ServiceAccount(Arc::new(generator)),
        })
    }

    async fn bearer_token(&self) -> Result<String, IdentityError> {
        match &self.credentials {
            Credentials::EmulatorOwner => Ok("owner".to_string()),
            Credentials::ServiceAccount(generator) => {
                let token = generator
                    .create_token()
                    .await
                    .map_err(|e| IdentityError::Credentials(e.to_string()))?;
                Ok(token.token.as_sensitive_str().to_string())
            }
        }
    }

    async fn post<B: Serialize>(&self, url: &str, body: &B) -> Result<reqwest::Response, IdentityError> {
        let token = self.bearer_token().await?;

        let response = self
            .http_client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(IdentityError::Rejected {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn create_identity(&self, identity: NewIdentity) -> Result<IdentityRecord, IdentityError> {
        let request = SignUpRequest {
            email: &identity.email,
            display_name: &identity.display_name,
        };

        let response: SignUpResponse = self
            .post(&self.accounts_url, &request)
            .await?
            .json()
            .await
            .map_err(|e| IdentityError::Request(format!("invalid signUp response: {e}")))?;

        tracing::debug!(uid = %response.local_id, "Identity created");

        Ok(IdentityRecord {
            id: response.local_id,
            email: response.email.unwrap_or(identity.email),
            display_name: response.display_name.unwrap_or(identity.display_name),
        })
    }

    async fn delete_identity(&self, id: &str) -> Result<(), IdentityError> {
        let url = format!("{}:delete", self.accounts_url);
        self.post(&url, &DeleteAccountRequest { local_id: id })
            .await?;
        tracing::debug!(uid = id, "Identity deleted");
        Ok(())
    }
}

fn build_http_client() -> Result<reqwest::Client, IdentityError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .build()
        .map_err(|e| IdentityError::Request(format!("failed building HTTP client: {e}")))
}

fn accounts_url(base: &str, project_id: &str) -> String {
    format!("{base}/v1/projects/{project_id}/accounts")
}

/// Pull `error.message` out of a Google API error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emulator_accounts_url() {
        let client = IdentityToolkitClient::new_emulator("demo", "localhost:9099").unwrap();
        assert_eq!(
            client.accounts_url,
            "http://localhost:9099/identitytoolkit.googleapis.com/v1/projects/demo/accounts"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_EXISTS","errors":[]}}"#;
        assert_eq!(error_message(body), "EMAIL_EXISTS");
        assert_eq!(error_message("upstream timeout"), "upstream timeout");
    }

    #[test]
    fn test_sign_up_request_uses_camel_case() {
        let json = serde_json::to_value(SignUpRequest {
            email: "test@example.com",
            display_name: "Test User",
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"email": "test@example.com", "displayName": "Test User"})
        );
    }
}

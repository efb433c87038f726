// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Read once at startup. The Firestore client additionally honours
//! `FIRESTORE_EMULATOR_HOST` on its own, so the value here only selects the
//! unauthenticated connection path.

use std::env;

/// Default cron cadence for the stale-user cleanup (daily at midnight UTC).
pub const DEFAULT_CLEANUP_SCHEDULE: &str = "0 0 * * *";

/// Users whose last login is older than this are purged.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP / Firebase project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Public URL of this service (audience of scheduler OIDC tokens)
    pub api_url: String,
    /// Service account Cloud Scheduler signs its OIDC tokens as
    pub scheduler_service_account: String,

    // --- Platform endpoints ---
    /// Firestore emulator `host:port`, if running locally
    pub firestore_emulator_host: Option<String>,
    /// Firebase Auth emulator `host:port`, if running locally
    pub auth_emulator_host: Option<String>,

    // --- Cleanup job ---
    /// Cron expression for the cleanup job
    pub cleanup_schedule: String,
    /// Inactivity threshold in days
    pub retention_days: i64,
    /// Run the cleanup on an in-process timer instead of waiting for Cloud Scheduler
    pub internal_scheduler: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id = env::var("GCP_PROJECT_ID")
            .or_else(|_| env::var("GCLOUD_PROJECT"))
            .unwrap_or_else(|_| "local-dev".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let retention_days = match env::var("INACTIVE_USER_RETENTION_DAYS") {
            Ok(v) => v
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or(ConfigError::Invalid("INACTIVE_USER_RETENTION_DAYS"))?,
            Err(_) => DEFAULT_RETENTION_DAYS,
        };

        let scheduler_service_account = env::var("SCHEDULER_SERVICE_ACCOUNT")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|_| default_scheduler_account(&gcp_project_id));

        Ok(Self {
            port,
            api_url: env::var("API_URL").unwrap_or_else(|_| format!("http://localhost:{port}")),
            scheduler_service_account,
            firestore_emulator_host: non_empty_var("FIRESTORE_EMULATOR_HOST"),
            auth_emulator_host: non_empty_var("FIREBASE_AUTH_EMULATOR_HOST"),
            cleanup_schedule: env::var("CLEANUP_SCHEDULE")
                .unwrap_or_else(|_| DEFAULT_CLEANUP_SCHEDULE.to_string()),
            retention_days,
            internal_scheduler: env::var("INTERNAL_SCHEDULER")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
            gcp_project_id,
        })
    }

    /// Config for tests: emulator endpoints, no secrets.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            api_url: "http://localhost:8080".to_string(),
            scheduler_service_account: default_scheduler_account("test-project"),
            firestore_emulator_host: Some("localhost:8080".to_string()),
            auth_emulator_host: Some("localhost:9099".to_string()),
            cleanup_schedule: DEFAULT_CLEANUP_SCHEDULE.to_string(),
            retention_days: DEFAULT_RETENTION_DAYS,
            internal_scheduler: false,
        }
    }

    /// Whether ID tokens come from the Auth emulator (unsigned).
    pub fn uses_auth_emulator(&self) -> bool {
        self.auth_emulator_host.is_some()
    }
}

fn default_scheduler_account(project_id: &str) -> String {
    format!("functions-scheduler@{project_id}.iam.gserviceaccount.com")
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so env mutations don't race between parallel tests.
    #[test]
    fn test_config_from_env() {
        env::set_var("GCP_PROJECT_ID", "demo-project");
        env::set_var("PORT", "9090");
        env::set_var("INACTIVE_USER_RETENTION_DAYS", "45");
        env::set_var("FIREBASE_AUTH_EMULATOR_HOST", "  ");
        env::remove_var("SCHEDULER_SERVICE_ACCOUNT");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.gcp_project_id, "demo-project");
        assert_eq!(config.port, 9090);
        assert_eq!(config.retention_days, 45);
        assert_eq!(config.api_url, "http://localhost:9090");
        assert_eq!(
            config.scheduler_service_account,
            "functions-scheduler@demo-project.iam.gserviceaccount.com"
        );
        assert!(config.auth_emulator_host.is_none());

        env::set_var("INACTIVE_USER_RETENTION_DAYS", "0");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("INACTIVE_USER_RETENTION_DAYS"))
        ));

        env::remove_var("INACTIVE_USER_RETENTION_DAYS");
        env::remove_var("PORT");
        env::remove_var("FIREBASE_AUTH_EMULATOR_HOST");
    }
}

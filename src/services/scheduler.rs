// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily trigger for the cleanup workflow.
//!
//! In production Cloud Scheduler calls `/tasks/cleanup-old-users`. For local
//! runs (or hosts without Cloud Scheduler) the same job can run on an
//! in-process timer. Only daily cron expressions (`M H * * *`, UTC) are
//! supported.

use crate::platform::Platform;
use crate::services::cleanup::{CleanupError, CleanupReport, CleanupWorkflow};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::sync::Arc;

/// Unsupported or malformed cron expression.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("expected 5 cron fields, got {0}")]
    FieldCount(usize),

    #[error("invalid {field} value: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("only daily schedules (`M H * * *`) are supported: {0}")]
    Unsupported(String),
}

/// A once-per-day UTC time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    /// Parse a five-field cron expression of the form `M H * * *`.
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = fields[..] else {
            return Err(ScheduleError::FieldCount(fields.len()));
        };

        if [dom, month, dow].iter().any(|f| *f != "*") {
            return Err(ScheduleError::Unsupported(expr.to_string()));
        }

        let minute = parse_field("minute", minute, 59)?;
        let hour = parse_field("hour", hour, 23)?;

        let at = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| ScheduleError::Unsupported(expr.to_string()))?;
        Ok(Self { at })
    }

    /// First occurrence strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.at).and_utc();
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

fn parse_field(field: &'static str, value: &str, max: u32) -> Result<u32, ScheduleError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|v| *v <= max)
        .ok_or_else(|| ScheduleError::InvalidField {
            field,
            value: value.to_string(),
        })
}

/// Connect (if needed) and run one cleanup pass.
pub async fn run_cleanup(
    platform: &Platform,
    retention_days: i64,
    now: DateTime<Utc>,
) -> Result<CleanupReport, CleanupError> {
    let handle = platform.ensure_initialized().await?;
    CleanupWorkflow::new(handle.store.clone(), handle.identity.clone(), retention_days)
        .run(now)
        .await
}

/// Run the cleanup on `schedule` until the task is aborted.
///
/// Runs are sequential; a failed run is logged and the next one still fires.
pub fn spawn_daily_cleanup(
    platform: Arc<Platform>,
    schedule: DailySchedule,
    retention_days: i64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = schedule.next_after(now);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(next_run = %next.to_rfc3339(), "Scheduled next cleanup run");

            tokio::time::sleep(wait).await;

            if let Err(e) = run_cleanup(&platform, retention_days, Utc::now()).await {
                tracing::error!(error = %e, "Scheduled cleanup failed");
            }
        }
    })
}

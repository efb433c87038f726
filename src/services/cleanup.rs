// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stale user cleanup.
//!
//! Flow:
//! 1. Query `users` where `lastLoginAt < now - retention`
//! 2. Delete every matching identity concurrently, staging the matching
//!    documents into one batch
//! 3. Commit the batch once all identity deletions have succeeded
//!
//! Errors are returned as-is. If an identity deletion fails the batch is
//! never committed: the documents survive while some identities may already
//! be gone. A re-run picks the survivors up again.

use crate::db::{collections, DocumentRef, DocumentStore, FieldValue, QueryOp, StoreError};
use crate::models::user::LAST_LOGIN_FIELD;
use crate::platform::ConnectionError;
use crate::services::identity::{IdentityError, IdentityProvider};
use crate::time_utils::{format_utc_rfc3339, retention_cutoff};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt, TryStreamExt};
use std::fmt;
use std::sync::Arc;

const MAX_CONCURRENT_IDENTITY_DELETES: usize = 50;

/// Cleanup run phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPhase {
    Idle,
    Querying,
    DeletingIdentities,
    CommittingBatch,
    Aborted,
}

impl fmt::Display for CleanupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CleanupPhase::Idle => "idle",
            CleanupPhase::Querying => "querying",
            CleanupPhase::DeletingIdentities => "deleting_identities",
            CleanupPhase::CommittingBatch => "committing_batch",
            CleanupPhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Downstream failure that aborted a run.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub cutoff: DateTime<Utc>,
    pub deleted_user_ids: Vec<String>,
}

/// Purges users who have not signed in within the retention window.
pub struct CleanupWorkflow {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    retention_days: i64,
}

impl CleanupWorkflow {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        retention_days: i64,
    ) -> Self {
        Self {
            store,
            identity,
            retention_days,
        }
    }

    /// Run one cleanup pass relative to `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<CleanupReport, CleanupError> {
        let cutoff = retention_cutoff(now, self.retention_days);
        let mut phase = CleanupPhase::Idle;

        let result = self.run_phases(cutoff, &mut phase).await;

        match &result {
            Ok(report) => tracing::info!(
                cutoff = %format_utc_rfc3339(cutoff),
                deleted = report.deleted_user_ids.len(),
                "Successfully cleaned up inactive users"
            ),
            Err(e) => tracing::error!(
                error = %e,
                aborted_in = %phase,
                phase = %CleanupPhase::Aborted,
                "Error cleaning up inactive users"
            ),
        }

        result
    }

    async fn run_phases(
        &self,
        cutoff: DateTime<Utc>,
        phase: &mut CleanupPhase,
    ) -> Result<CleanupReport, CleanupError> {
        *phase = CleanupPhase::Querying;
        tracing::info!(phase = %phase, cutoff = %format_utc_rfc3339(cutoff), "Querying stale users");

        let stale = self
            .store
            .query_where(
                collections::USERS,
                LAST_LOGIN_FIELD,
                QueryOp::LessThan,
                FieldValue::Timestamp(cutoff),
            )
            .await?;

        let ids: Vec<String> = stale.into_iter().map(|doc| doc.id).collect();

        *phase = CleanupPhase::DeletingIdentities;
        tracing::info!(phase = %phase, count = ids.len(), "Deleting stale identities");

        let mut batch = self.store.new_batch();
        for id in &ids {
            batch.stage_delete(DocumentRef::new(collections::USERS, id.as_str()));
        }

        stream::iter(ids.iter().cloned())
            .map(|id| {
                let identity = self.identity.clone();
                async move { identity.delete_identity(&id).await }
            })
            .buffer_unordered(MAX_CONCURRENT_IDENTITY_DELETES)
            .try_collect::<Vec<()>>()
            .await?;

        *phase = CleanupPhase::CommittingBatch;
        tracing::info!(phase = %phase, staged = batch.len(), "Committing document deletions");

        self.store.commit_batch(batch).await?;

        *phase = CleanupPhase::Idle;
        Ok(CleanupReport {
            cutoff,
            deleted_user_ids: ids,
        })
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request authorization guard.
//!
//! Pure decision functions over the caller's identity claim. No I/O.

use crate::error::AppError;
use crate::middleware::auth::IdentityClaim;

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No identity claim accompanied the call.
    Unauthenticated,
    /// The caller is authenticated but does not own the target.
    OwnershipMismatch,
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    /// Convert a denial into the caller-facing error.
    ///
    /// `action` completes "You can only ... for your own user account."
    pub fn into_result(self, action: &str) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::Unauthenticated) => Err(AppError::unauthenticated()),
            Decision::Deny(DenyReason::OwnershipMismatch) => Err(AppError::PermissionDenied(
                format!("You can only {action} for your own user account."),
            )),
        }
    }
}

/// Allow only an authenticated caller acting on their own user id.
pub fn authorize(claim: Option<&IdentityClaim>, target_user_id: &str) -> Decision {
    match claim {
        None => Decision::Deny(DenyReason::Unauthenticated),
        Some(claim) if claim.subject_id != target_user_id => {
            Decision::Deny(DenyReason::OwnershipMismatch)
        }
        Some(_) => Decision::Allow,
    }
}

/// Allow any authenticated caller (self-registration has no target to own).
pub fn authenticate(claim: Option<&IdentityClaim>) -> Decision {
    match claim {
        None => Decision::Deny(DenyReason::Unauthenticated),
        Some(_) => Decision::Allow,
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod authorization;
pub mod cleanup;
pub mod google_oidc;
pub mod id_token;
pub mod identity;
pub mod jwks;
pub mod products;
pub mod scheduler;
pub mod users;

pub use authorization::{authenticate, authorize, Decision, DenyReason};
pub use cleanup::{CleanupError, CleanupPhase, CleanupReport, CleanupWorkflow};
pub use google_oidc::{GoogleOidcVerifier, OidcError, VerifiedSchedulerPrincipal};
pub use id_token::{IdTokenVerifier, TokenError};
pub use identity::{IdentityProvider, IdentityRecord, IdentityToolkitClient, NewIdentity};
pub use products::ProductService;
pub use scheduler::{DailySchedule, ScheduleError};
pub use users::UserService;

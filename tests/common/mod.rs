// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use catalog_functions::config::Config;
use catalog_functions::db::{
    Document, DocumentRef, DocumentStore, FieldValue, Fields, QueryOp, StoreError, WriteBatch,
};
use catalog_functions::platform::{Platform, PlatformHandle};
use catalog_functions::routes::create_router;
use catalog_functions::services::identity::{
    IdentityError, IdentityProvider, IdentityRecord, NewIdentity,
};
use catalog_functions::services::{GoogleOidcVerifier, IdTokenVerifier};
use catalog_functions::AppState;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const TEST_PROJECT: &str = "test-project";
pub const SCHEDULER_KID: &str = "scheduler-test-kid";
const SCHEDULER_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/scheduler_test_key.pem");
const SCHEDULER_PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/scheduler_test_key.pub.pem");

/// Check if emulator is available via environment variable.
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Ordered record of remote calls shared by the fakes.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// A store call as observed by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Add {
        collection: String,
        fields: Fields,
    },
    Set {
        collection: String,
        id: String,
        fields: Fields,
    },
    Query {
        collection: String,
        field: String,
        op: QueryOp,
        value: FieldValue,
    },
    Commit {
        deletes: Vec<DocumentRef>,
    },
}

/// In-memory [`DocumentStore`] that records every call.
#[derive(Default)]
pub struct RecordingStore {
    pub calls: Mutex<Vec<StoreCall>>,
    pub query_results: Mutex<Vec<Document>>,
    pub fail_writes: AtomicBool,
    pub fail_query: AtomicBool,
    pub events: EventLog,
}

impl RecordingStore {
    pub fn with_events(events: EventLog) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_query_results(&self, ids: &[&str]) {
        *self.query_results.lock().unwrap() = ids
            .iter()
            .map(|id| Document {
                id: id.to_string(),
                fields: Fields::new(),
            })
            .collect();
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        self.record(StoreCall::Add {
            collection: collection.to_string(),
            fields,
        });
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write rejected".to_string()));
        }
        Ok("generated-doc-id".to_string())
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.record(StoreCall::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write rejected".to_string()));
        }
        Ok(())
    }

    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: FieldValue,
    ) -> Result<Vec<Document>, StoreError> {
        self.record(StoreCall::Query {
            collection: collection.to_string(),
            field: field.to_string(),
            op,
            value,
        });
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("Firestore error".to_string()));
        }
        Ok(self.query_results.lock().unwrap().clone())
    }

    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.events.lock().unwrap().push("commit".to_string());
        self.record(StoreCall::Commit {
            deletes: batch.deletes().to_vec(),
        });
        Ok(())
    }
}

/// In-memory [`IdentityProvider`] that records every call.
pub struct RecordingIdentity {
    pub created: Mutex<Vec<NewIdentity>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_create: AtomicBool,
    pub fail_delete_for: Mutex<HashSet<String>>,
    pub assigned_uid: String,
    pub delete_delay: Duration,
    pub events: EventLog,
}

impl Default for RecordingIdentity {
    fn default() -> Self {
        Self::with_events(EventLog::default())
    }
}

impl RecordingIdentity {
    pub fn with_events(events: EventLog) -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
            fail_delete_for: Mutex::new(HashSet::new()),
            assigned_uid: "test-uid".to_string(),
            delete_delay: Duration::from_millis(10),
            events,
        }
    }

    pub fn created(&self) -> Vec<NewIdentity> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fail_delete(&self, id: &str) {
        self.fail_delete_for.lock().unwrap().insert(id.to_string());
    }
}

#[async_trait]
impl IdentityProvider for RecordingIdentity {
    async fn create_identity(&self, identity: NewIdentity) -> Result<IdentityRecord, IdentityError> {
        self.created.lock().unwrap().push(identity.clone());
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(IdentityError::Rejected {
                status: 400,
                message: "EMAIL_EXISTS".to_string(),
            });
        }
        Ok(IdentityRecord {
            id: self.assigned_uid.clone(),
            email: identity.email,
            display_name: identity.display_name,
        })
    }

    async fn delete_identity(&self, id: &str) -> Result<(), IdentityError> {
        tokio::time::sleep(self.delete_delay).await;
        self.deleted.lock().unwrap().push(id.to_string());
        self.events
            .lock()
            .unwrap()
            .push(format!("identity_deleted:{id}"));
        if self.fail_delete_for.lock().unwrap().contains(id) {
            return Err(IdentityError::Rejected {
                status: 404,
                message: "USER_NOT_FOUND".to_string(),
            });
        }
        Ok(())
    }
}

/// Fakes sharing one event log.
pub fn recording_platform() -> (Arc<RecordingStore>, Arc<RecordingIdentity>, EventLog) {
    let events = EventLog::default();
    let store = Arc::new(RecordingStore::with_events(events.clone()));
    let identity = Arc::new(RecordingIdentity::with_events(events.clone()));
    (store, identity, events)
}

pub fn handle_for(store: &Arc<RecordingStore>, identity: &Arc<RecordingIdentity>) -> PlatformHandle {
    PlatformHandle {
        store: store.clone(),
        identity: identity.clone(),
    }
}

/// Test app wired to recording fakes.
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<RecordingStore>,
    pub identity: Arc<RecordingIdentity>,
    pub events: EventLog,
}

/// Create a test app: emulator-style ID tokens, static-key scheduler OIDC.
pub fn create_test_app() -> TestApp {
    let config = Config::test_default();
    let (store, identity, events) = recording_platform();

    let scheduler_verifier = GoogleOidcVerifier::new_with_static_key(
        &config,
        SCHEDULER_KID,
        DecodingKey::from_rsa_pem(SCHEDULER_PUBLIC_KEY).unwrap(),
    )
    .unwrap();

    let state = Arc::new(AppState {
        platform: Arc::new(Platform::from_handle(handle_for(&store, &identity))),
        id_token_verifier: IdTokenVerifier::new_emulator(&config.gcp_project_id),
        scheduler_verifier,
        config,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        identity,
        events,
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Unsigned ID token as issued by the Auth emulator.
pub fn create_test_id_token(uid: &str) -> String {
    let now = now_secs();
    let claims = serde_json::json!({
        "iss": format!("https://securetoken.google.com/{TEST_PROJECT}"),
        "aud": TEST_PROJECT,
        "sub": uid,
        "user_id": uid,
        "iat": now,
        "exp": now + 3600,
        "auth_time": now,
        "firebase": {"sign_in_provider": "custom", "identities": {}},
    });
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.")
}

/// Cloud Scheduler OIDC token signed with the fixture key.
pub fn create_test_scheduler_jwt(config: &Config, email: &str) -> String {
    let now = now_secs();
    let claims = serde_json::json!({
        "iss": "https://accounts.google.com",
        "aud": config.api_url,
        "sub": "110000000000000000000",
        "email": email,
        "email_verified": true,
        "iat": now,
        "exp": now + 3600,
    });

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(SCHEDULER_KID.to_string());

    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(SCHEDULER_PRIVATE_KEY).unwrap(),
    )
    .unwrap()
}

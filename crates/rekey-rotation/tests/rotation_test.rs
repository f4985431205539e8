//! Integration tests for RotationWorkflow against in-memory capabilities.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rekey_config::HashingConfig;
use rekey_rotation::{ResetRequest, RotationWorkflow, WorkflowResult, messages};
use rekey_secret::{
  Argon2Hasher, CredentialGenerator, GenerateError, HashError, SecretHasher, SecretString,
  UuidGenerator,
};
use rekey_store::{StoreError, UserId, UserRecord, UserStore};
use serde_json::json;
use tokio_util::sync::CancellationToken;

struct StoredUser {
  id: UserId,
  reset_digest: String,
  reset_expires: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryStore {
  users: Mutex<HashMap<String, StoredUser>>,
  credentials: Mutex<HashMap<UserId, String>>,
  lookups: AtomicUsize,
  updates: AtomicUsize,
  fail_lookup: bool,
  fail_update: bool,
  lookup_delay: Option<Duration>,
}

impl MemoryStore {
  fn add_user(&self, email: &str, id: i64, reset_digest: &str, reset_expires: DateTime<Utc>) {
    self.users.lock().unwrap().insert(
      email.to_string(),
      StoredUser {
        id: UserId(id),
        reset_digest: reset_digest.to_string(),
        reset_expires,
      },
    );
  }

  fn credential(&self, id: i64) -> Option<String> {
    self.credentials.lock().unwrap().get(&UserId(id)).cloned()
  }
}

#[async_trait]
impl UserStore for MemoryStore {
  async fn find_unexpired(
    &self,
    email: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<UserRecord>, StoreError> {
    self.lookups.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = self.lookup_delay {
      tokio::time::sleep(delay).await;
    }
    if self.fail_lookup {
      return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
    }

    let users = self.users.lock().unwrap();
    Ok(
      users
        .get(email)
        .filter(|user| user.reset_expires > now)
        .map(|user| UserRecord {
          id: user.id,
          reset_token_digest: user.reset_digest.clone(),
        }),
    )
  }

  async fn update_credential_digest(&self, user_id: &UserId, digest: &str) -> Result<(), StoreError> {
    self.updates.fetch_add(1, Ordering::SeqCst);
    if self.fail_update {
      return Err(StoreError::NotFound(format!("user {user_id}")));
    }
    self
      .credentials
      .lock()
      .unwrap()
      .insert(*user_id, digest.to_string());
    Ok(())
  }
}

struct CountingHasher {
  inner: Argon2Hasher,
  hashes: AtomicUsize,
  verifies: AtomicUsize,
  decoys: AtomicUsize,
}

#[async_trait]
impl SecretHasher for CountingHasher {
  async fn hash(&self, plaintext: &SecretString) -> Result<String, HashError> {
    self.hashes.fetch_add(1, Ordering::SeqCst);
    self.inner.hash(plaintext).await
  }

  async fn verify(&self, plaintext: &SecretString, digest: &str) -> Result<bool, HashError> {
    self.verifies.fetch_add(1, Ordering::SeqCst);
    self.inner.verify(plaintext, digest).await
  }

  async fn verify_decoy(&self, plaintext: &SecretString) {
    self.decoys.fetch_add(1, Ordering::SeqCst);
    self.inner.verify_decoy(plaintext).await
  }
}

struct ExhaustedGenerator;

impl CredentialGenerator for ExhaustedGenerator {
  fn generate(&self) -> Result<SecretString, GenerateError> {
    Err(GenerateError::Entropy("no entropy available".to_string()))
  }
}

struct Harness {
  store: Arc<MemoryStore>,
  hasher: Arc<CountingHasher>,
  workflow: RotationWorkflow,
}

impl Harness {
  fn new(store: MemoryStore) -> Self {
    Self::with_generator(store, Arc::new(UuidGenerator))
  }

  fn with_generator(store: MemoryStore, generator: Arc<dyn CredentialGenerator>) -> Self {
    let config = HashingConfig {
      memory_kib: 1024,
      iterations: 1,
      parallelism: 1,
    };
    let store = Arc::new(store);
    let hasher = Arc::new(CountingHasher {
      inner: Argon2Hasher::new(&config).unwrap(),
      hashes: AtomicUsize::new(0),
      verifies: AtomicUsize::new(0),
      decoys: AtomicUsize::new(0),
    });
    let workflow = RotationWorkflow::new(store.clone(), hasher.clone(), generator);
    Self {
      store,
      hasher,
      workflow,
    }
  }

  /// Register a user whose reset token `token` is valid for another hour.
  async fn seed(&self, email: &str, id: i64, token: &str) {
    let digest = self.digest(token).await;
    self
      .store
      .add_user(email, id, &digest, Utc::now() + chrono::Duration::hours(1));
  }

  async fn digest(&self, plaintext: &str) -> String {
    self
      .hasher
      .inner
      .hash(&SecretString::new(plaintext.to_string()))
      .await
      .unwrap()
  }

  async fn stored_credential_matches(&self, id: i64, key: &str) -> bool {
    let digest = self.store.credential(id).expect("no credential stored");
    self
      .hasher
      .inner
      .verify(&SecretString::new(key.to_string()), &digest)
      .await
      .unwrap()
  }
}

fn apikey(result: &WorkflowResult) -> String {
  result
    .apikey()
    .expect("no api key issued")
    .expose_secret()
    .to_string()
}

#[tokio::test]
async fn test_rotates_key_for_valid_token() {
  let harness = Harness::new(MemoryStore::default());
  harness.seed("a@x.com", 7, "t1").await;

  let result = harness.workflow.run(ResetRequest::new("a@x.com", "t1")).await;

  assert!(result.is_success());
  assert!(result.errors().is_empty());
  let key = apikey(&result);
  assert_eq!(key.len(), 36);
  assert!(harness.stored_credential_matches(7, &key).await);
  assert_eq!(harness.store.updates.load(Ordering::SeqCst), 1);

  let body = serde_json::to_value(&result).unwrap();
  assert_eq!(body, json!({ "success": true, "errors": [], "apikey": key }));
}

#[tokio::test]
async fn test_missing_email_touches_nothing() {
  let harness = Harness::new(MemoryStore::default());
  let request: ResetRequest = serde_json::from_value(json!({ "token": "t1" })).unwrap();

  let result = harness.workflow.run(request).await;

  assert_eq!(
    serde_json::to_value(&result).unwrap(),
    json!({ "success": false, "errors": ["`email` is required"], "apikey": null })
  );
  assert_eq!(harness.store.lookups.load(Ordering::SeqCst), 0);
  assert_eq!(harness.store.updates.load(Ordering::SeqCst), 0);
  assert_eq!(harness.hasher.hashes.load(Ordering::SeqCst), 0);
  assert_eq!(harness.hasher.verifies.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reports_every_validation_error() {
  let harness = Harness::new(MemoryStore::default());

  let result = harness.workflow.run(ResetRequest::default()).await;
  assert_eq!(
    result.errors(),
    [messages::EMAIL_REQUIRED, messages::TOKEN_REQUIRED]
  );

  let request: ResetRequest = serde_json::from_value(json!({ "email": "nope" })).unwrap();
  let result = harness.workflow.run(request).await;
  assert_eq!(
    result.errors(),
    [messages::EMAIL_INVALID, messages::TOKEN_REQUIRED]
  );
  assert!(result.apikey().is_none());
  assert_eq!(harness.store.lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
  let harness = Harness::new(MemoryStore::default());
  harness.seed("a@x.com", 7, "t1").await;

  let result = harness
    .workflow
    .run(ResetRequest::new("a@x.com", "wrong"))
    .await;

  assert!(!result.is_success());
  assert_eq!(result.errors(), [messages::CREDENTIALS_MISMATCH]);
  assert!(result.apikey().is_none());
  assert_eq!(harness.hasher.verifies.load(Ordering::SeqCst), 1);
  assert_eq!(harness.hasher.hashes.load(Ordering::SeqCst), 0);
  assert_eq!(harness.store.updates.load(Ordering::SeqCst), 0);
  assert!(harness.store.credential(7).is_none());
}

#[tokio::test]
async fn test_unknown_email_indistinguishable_from_wrong_token() {
  let harness = Harness::new(MemoryStore::default());
  harness.seed("a@x.com", 7, "t1").await;

  let wrong_token = harness
    .workflow
    .run(ResetRequest::new("a@x.com", "wrong"))
    .await;
  let unknown_email = harness
    .workflow
    .run(ResetRequest::new("nobody@x.com", "t1"))
    .await;

  assert_eq!(
    serde_json::to_string(&wrong_token).unwrap(),
    serde_json::to_string(&unknown_email).unwrap()
  );
  // The unknown email still paid for one verification.
  assert_eq!(harness.hasher.decoys.load(Ordering::SeqCst), 1);
  assert_eq!(harness.store.updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
  let harness = Harness::new(MemoryStore::default());
  let digest = harness.digest("t1").await;
  harness
    .store
    .add_user("a@x.com", 7, &digest, Utc::now() - chrono::Duration::seconds(1));

  let result = harness.workflow.run(ResetRequest::new("a@x.com", "t1")).await;

  assert_eq!(result.errors(), [messages::CREDENTIALS_MISMATCH]);
  assert_eq!(harness.store.updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_digest_looks_like_wrong_token() {
  let harness = Harness::new(MemoryStore::default());
  harness.store.add_user(
    "a@x.com",
    7,
    "not-a-digest",
    Utc::now() + chrono::Duration::hours(1),
  );

  let result = harness.workflow.run(ResetRequest::new("a@x.com", "t1")).await;

  assert_eq!(result.errors(), [messages::CREDENTIALS_MISMATCH]);
  assert_eq!(harness.store.updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_lookup_failure() {
  let harness = Harness::new(MemoryStore {
    fail_lookup: true,
    ..Default::default()
  });

  let result = harness.workflow.run(ResetRequest::new("a@x.com", "t1")).await;

  assert_eq!(result.errors(), [messages::LOOKUP_FAILED]);
  assert_eq!(harness.hasher.verifies.load(Ordering::SeqCst), 0);
  assert_eq!(harness.store.updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_generation_failure_skips_persist() {
  let harness = Harness::with_generator(MemoryStore::default(), Arc::new(ExhaustedGenerator));
  harness.seed("a@x.com", 7, "t1").await;

  let result = harness.workflow.run(ResetRequest::new("a@x.com", "t1")).await;

  assert_eq!(result.errors(), [messages::ISSUE_FAILED]);
  assert_eq!(harness.store.updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_persist_failure_withholds_key() {
  let harness = Harness::new(MemoryStore {
    fail_update: true,
    ..Default::default()
  });
  harness.seed("a@x.com", 7, "t1").await;

  let result = harness.workflow.run(ResetRequest::new("a@x.com", "t1")).await;

  assert!(!result.is_success());
  assert_eq!(result.errors(), [messages::UPDATE_FAILED]);
  assert!(result.apikey().is_none());
  assert_eq!(harness.store.updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_rotation_replaces_first_key() {
  let harness = Harness::new(MemoryStore::default());
  harness.seed("a@x.com", 7, "t1").await;

  let first = apikey(&harness.workflow.run(ResetRequest::new("a@x.com", "t1")).await);
  let second = apikey(&harness.workflow.run(ResetRequest::new("a@x.com", "t1")).await);

  assert_ne!(first, second);
  assert!(harness.stored_credential_matches(7, &second).await);
  assert!(!harness.stored_credential_matches(7, &first).await);
}

#[tokio::test]
async fn test_concurrent_rotations_for_different_users() {
  let harness = Harness::new(MemoryStore::default());
  harness.seed("a@x.com", 1, "ta").await;
  harness.seed("b@x.com", 2, "tb").await;

  let (a, b) = tokio::join!(
    harness.workflow.run(ResetRequest::new("a@x.com", "ta")),
    harness.workflow.run(ResetRequest::new("b@x.com", "tb")),
  );

  assert!(harness.stored_credential_matches(1, &apikey(&a)).await);
  assert!(harness.stored_credential_matches(2, &apikey(&b)).await);
}

#[tokio::test]
async fn test_step_timeout_reports_internal_error() {
  let store = MemoryStore {
    lookup_delay: Some(Duration::from_millis(500)),
    ..Default::default()
  };
  let harness = Harness::new(store);
  harness.seed("a@x.com", 7, "t1").await;
  let workflow = harness
    .workflow
    .clone()
    .with_step_timeout(Some(Duration::from_millis(20)));

  let result = workflow.run(ResetRequest::new("a@x.com", "t1")).await;

  assert_eq!(result.errors(), [messages::INTERNAL]);
  assert_eq!(harness.store.updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancelled_run_issues_nothing() {
  let harness = Harness::new(MemoryStore::default());
  harness.seed("a@x.com", 7, "t1").await;
  let cancel = CancellationToken::new();
  cancel.cancel();

  let result = harness
    .workflow
    .run_with_cancel(ResetRequest::new("a@x.com", "t1"), cancel)
    .await;

  assert_eq!(result.errors(), [messages::INTERNAL]);
  assert!(result.apikey().is_none());
  assert!(harness.store.credential(7).is_none());
}

#[tokio::test]
async fn test_debug_never_shows_plaintext() {
  let harness = Harness::new(MemoryStore::default());
  harness.seed("a@x.com", 7, "reset-token-value").await;

  let request = ResetRequest::new("a@x.com", "reset-token-value");
  assert!(!format!("{request:?}").contains("reset-token-value"));

  let result = harness.workflow.run(request).await;
  let key = apikey(&result);
  assert!(!format!("{result:?}").contains(&key));
}

#[tokio::test]
async fn test_non_string_email_reports_invalid_format() {
  let harness = Harness::new(MemoryStore::default());

  for body in [r#"{"email": 5, "token": "t1"}"#, r#"{"email": null, "token": "t1"}"#] {
    let request = ResetRequest::from_json(body).unwrap();
    let result = harness.workflow.run(request).await;

    assert_eq!(
      serde_json::to_value(&result).unwrap(),
      json!({ "success": false, "errors": ["`email` has an invalid format"], "apikey": null })
    );
  }
  assert_eq!(harness.store.lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_string_token_rejected_like_wrong_token() {
  let harness = Harness::new(MemoryStore::default());
  harness.seed("a@x.com", 7, "t1").await;

  let wrong_type = harness
    .workflow
    .run(ResetRequest::from_json(r#"{"email": "a@x.com", "token": 123}"#).unwrap())
    .await;
  let wrong_token = harness
    .workflow
    .run(ResetRequest::new("a@x.com", "wrong"))
    .await;

  assert_eq!(
    serde_json::to_string(&wrong_type).unwrap(),
    serde_json::to_string(&wrong_token).unwrap()
  );
  assert_eq!(harness.hasher.decoys.load(Ordering::SeqCst), 1);
  assert_eq!(harness.hasher.verifies.load(Ordering::SeqCst), 1);
  assert_eq!(harness.store.updates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_undecodable_body_keeps_response_shape() {
  for body in ["not json", r#"["a@x.com", "t1"]"#] {
    let err = ResetRequest::from_json(body).unwrap_err();
    let result = WorkflowResult::failure(err.public_messages());

    assert_eq!(
      serde_json::to_value(&result).unwrap(),
      json!({ "success": false, "errors": ["request body must be a JSON object"], "apikey": null })
    );
  }
}

#[tokio::test]
async fn test_single_label_domain_rejected() {
  let harness = Harness::new(MemoryStore::default());

  let result = harness
    .workflow
    .run(ResetRequest::new("a@localhost", "t1"))
    .await;

  assert_eq!(result.errors(), [messages::EMAIL_INVALID]);
  assert_eq!(harness.store.lookups.load(Ordering::SeqCst), 0);
}

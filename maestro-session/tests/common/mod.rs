//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

use maestro_session::auth::{AuthGrant, Credentials, IdentityService, Registration, User, UserRole};
use maestro_session::{AuthError, KeyValuePort, MemoryStorage, Result};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("maestro_session=debug".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

pub fn user(id: &str, email: &str, role: UserRole) -> User {
    User {
        id: id.into(),
        name: format!("User {id}"),
        email: email.into(),
        role,
    }
}

pub fn grant(id: &str, email: &str, role: UserRole) -> AuthGrant {
    AuthGrant {
        user: user(id, email, role),
        access_token: format!("server-token-{id}"),
    }
}

// ─── Identity service double ───

/// Identity service answering from a table keyed by email.
///
/// With a gate, every call parks until a permit is released, which lets a
/// test interleave logouts with in-flight logins.
#[derive(Default)]
pub struct ScriptedIdentity {
    responses: Mutex<HashMap<String, Result<AuthGrant>>>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
}

impl ScriptedIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls block until `release` is called on the returned semaphore
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let identity = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (identity, gate)
    }

    pub fn respond(self, email: &str, response: Result<AuthGrant>) -> Self {
        self.responses.lock().insert(email.to_string(), response);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Yield until `n` calls have started
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }

    async fn answer(&self, email: &str) -> Result<AuthGrant> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .responses
            .lock()
            .get(email)
            .cloned()
            .unwrap_or_else(|| Err(AuthError::Rejected("Unknown account".into())));

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }
        response
    }
}

#[async_trait]
impl IdentityService for ScriptedIdentity {
    async fn login(&self, credentials: Credentials) -> Result<AuthGrant> {
        self.answer(&credentials.email).await
    }

    async fn register(&self, registration: Registration) -> Result<AuthGrant> {
        self.answer(&registration.email).await
    }
}

// ─── Storage doubles ───

/// Memory storage that counts writes
#[derive(Default)]
pub struct CountingStorage {
    inner: MemoryStorage,
    sets: AtomicUsize,
    removes: AtomicUsize,
}

impl CountingStorage {
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }
}

impl KeyValuePort for CountingStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key)
    }
}

/// Memory storage whose writes to one key always fail
pub struct FailingStorage {
    pub inner: MemoryStorage,
    failing_key: String,
}

impl FailingStorage {
    pub fn on_key(key: &str) -> Self {
        Self {
            inner: MemoryStorage::new(),
            failing_key: key.to_string(),
        }
    }
}

impl KeyValuePort for FailingStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if key == self.failing_key {
            return Err(AuthError::Storage(format!("quota exceeded writing {key}")));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }
}

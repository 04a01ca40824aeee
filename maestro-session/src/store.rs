//! TokenStore — persisted bearer token and user snapshot
//!
//! Two independent entries live behind a [`KeyValuePort`]: the opaque token
//! string and the JSON user profile. Either may exist without the other;
//! deciding what that means is left to [`crate::derive::SessionReader`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use maestro_session::{MemoryStorage, SessionConfig, TokenStore};
//!
//! let store = TokenStore::new(Arc::new(MemoryStorage::new()), &SessionConfig::new());
//! store.set("abc.def.ghi").unwrap();
//! assert_eq!(store.authorization_header().as_deref(), Some("Bearer abc.def.ghi"));
//!
//! store.clear();
//! assert!(store.get().is_none());
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::auth::types::User;
use crate::config::SessionConfig;
use crate::error::{AuthError, Result};
use crate::storage::KeyValuePort;

/// Raw view of both persisted entries, read under one guard
#[derive(Debug, Clone, Default)]
pub struct PersistedRecord {
    pub token: Option<String>,
    /// `None` if absent; `Some(Err)` if present but unparsable
    pub user: Option<Result<User>>,
}

impl PersistedRecord {
    /// The parsed user, treating malformed data as absent
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref().and_then(|u| u.as_ref().ok())
    }
}

/// Persisted session entries — shared by the session actor, the session
/// reader, and the fallback minter.
///
/// Cheap to clone; clones share the same backend and transaction guard.
#[derive(Clone)]
pub struct TokenStore {
    port: Arc<dyn KeyValuePort>,
    token_key: Arc<str>,
    user_key: Arc<str>,
    // Multi-key writes hold this exclusively; snapshot reads hold it shared.
    txn: Arc<RwLock<()>>,
}

impl TokenStore {
    pub fn new(port: Arc<dyn KeyValuePort>, config: &SessionConfig) -> Self {
        Self {
            port,
            token_key: Arc::from(config.token_key.as_str()),
            user_key: Arc::from(config.user_key.as_str()),
            txn: Arc::new(RwLock::new(())),
        }
    }

    // ─── Token ───

    pub fn set(&self, token: &str) -> Result<()> {
        let _guard = self.txn.write();
        self.port.set(&self.token_key, token)
    }

    /// Stored token; unreadable storage reads as absent
    pub fn get(&self) -> Option<String> {
        let _guard = self.txn.read();
        self.read_token()
    }

    /// Store the token produced by `mint` unless one is already stored.
    ///
    /// The check and the write happen under one exclusive guard, so a
    /// concurrent [`write_session`](Self::write_session) is never overwritten.
    /// Returns `Ok(true)` if a token was written, `Ok(false)` if one existed.
    pub fn set_if_absent<F>(&self, mint: F) -> Result<bool>
    where
        F: FnOnce() -> Result<String>,
    {
        let _guard = self.txn.write();
        if self.read_token().is_some() {
            return Ok(false);
        }
        self.port.set(&self.token_key, &mint()?)?;
        Ok(true)
    }

    /// Remove the token. Never fails.
    pub fn clear(&self) {
        let _guard = self.txn.write();
        self.remove_logged(&self.token_key);
    }

    /// `Bearer <token>` for outbound requests
    pub fn authorization_header(&self) -> Option<String> {
        self.get().map(|token| format!("Bearer {token}"))
    }

    // ─── User ───

    pub fn set_user(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        let _guard = self.txn.write();
        self.port.set(&self.user_key, &raw)
    }

    /// Stored user.
    ///
    /// `Err(MalformedPersistedData)` when the entry exists but does not parse.
    pub fn get_user(&self) -> Result<Option<User>> {
        let _guard = self.txn.read();
        self.read_user().transpose()
    }

    /// Remove the user profile. Never fails.
    pub fn clear_user(&self) {
        let _guard = self.txn.write();
        self.remove_logged(&self.user_key);
    }

    // ─── Transactions ───

    /// Write token and user as one unit.
    ///
    /// If the second write fails, the previous values of both entries are
    /// restored before the error is returned. Unreadable previous values
    /// count as absent.
    pub fn write_session(&self, token: &str, user: &User) -> Result<()> {
        let raw_user = serde_json::to_string(user)?;
        let _guard = self.txn.write();

        let prev_token = self.read_raw(&self.token_key);
        let prev_user = self.read_raw(&self.user_key);

        self.port.set(&self.token_key, token)?;
        if let Err(e) = self.port.set(&self.user_key, &raw_user) {
            warn!(error = %e, "User write failed, rolling back session write");
            self.restore(&self.token_key, prev_token.as_deref());
            self.restore(&self.user_key, prev_user.as_deref());
            return Err(e);
        }
        Ok(())
    }

    /// Remove both entries. Never fails.
    pub fn clear_session(&self) {
        let _guard = self.txn.write();
        self.remove_logged(&self.token_key);
        self.remove_logged(&self.user_key);
    }

    /// Read both entries under one shared guard
    pub fn snapshot(&self) -> PersistedRecord {
        let _guard = self.txn.read();
        PersistedRecord {
            token: self.read_token(),
            user: self.read_user(),
        }
    }

    // ─── Helpers ───

    fn read_token(&self) -> Option<String> {
        match self.port.get(&self.token_key) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, key = %self.token_key, "Token read failed, treating as absent");
                None
            }
        }
    }

    fn read_user(&self) -> Option<Result<User>> {
        let raw = match self.port.get(&self.user_key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, key = %self.user_key, "User read failed, treating as absent");
                return None;
            }
        };
        Some(
            serde_json::from_str::<User>(&raw)
                .map_err(|e| AuthError::MalformedPersistedData(e.to_string())),
        )
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        self.port.get(key).unwrap_or_else(|e| {
            warn!(error = %e, key, "Previous entry unreadable, treating as absent");
            None
        })
    }

    fn remove_logged(&self, key: &str) {
        if let Err(e) = self.port.remove(key) {
            warn!(error = %e, key, "Failed to remove session entry");
        }
    }

    fn restore(&self, key: &str, previous: Option<&str>) {
        let outcome = match previous {
            Some(value) => self.port.set(key, value),
            None => self.port.remove(key),
        };
        if let Err(e) = outcome {
            warn!(error = %e, key, "Rollback failed");
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("token_key", &self.token_key)
            .field("user_key", &self.user_key)
            .finish_non_exhaustive()
    }
}

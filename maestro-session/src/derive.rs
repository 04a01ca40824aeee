//! Session derivation — read-only answers over the TokenStore
//!
//! Policy for partially populated storage: a session exists only when both
//! the token and a parsable user are present and the token has not expired.
//! Anything less reads as unauthenticated.

use std::sync::Arc;

use tracing::warn;

use crate::auth::types::{Session, User};
use crate::clock::Clock;
use crate::store::TokenStore;
use crate::token;

/// Side-effect-free view of the persisted session
#[derive(Debug, Clone)]
pub struct SessionReader {
    store: TokenStore,
    clock: Arc<dyn Clock>,
}

impl SessionReader {
    pub fn new(store: TokenStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Stored user, or `None` if absent or unparsable
    pub fn current_user(&self) -> Option<User> {
        match self.store.get_user() {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Stored user unreadable, treating as signed out");
                None
            }
        }
    }

    /// Both entries present and the token not expired
    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// The derived session, if one is valid right now
    pub fn session(&self) -> Option<Session> {
        let record = self.store.snapshot();
        let access_token = record.token.clone()?;
        let user = match record.user {
            Some(Ok(user)) => user,
            Some(Err(e)) => {
                warn!(error = %e, "Stored user unreadable, treating as signed out");
                return None;
            }
            None => return None,
        };

        if token::is_expired(&access_token, self.clock.now()) {
            return None;
        }
        Some(Session { access_token, user })
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::UserRole;
    use crate::clock::FixedClock;
    use crate::config::SessionConfig;
    use crate::storage::{KeyValuePort, MemoryStorage};
    use chrono::Duration;

    fn fixture() -> (Arc<MemoryStorage>, SessionReader, Arc<FixedClock>) {
        let port = Arc::new(MemoryStorage::new());
        let store = TokenStore::new(port.clone(), &SessionConfig::new());
        let clock = Arc::new(FixedClock::at_secs(1_700_000_000));
        (port, SessionReader::new(store, clock.clone()), clock)
    }

    fn admin() -> User {
        User {
            id: "a-1".into(),
            name: "Root".into(),
            email: "root@school.edu".into(),
            role: UserRole::Admin,
        }
    }

    #[test]
    fn test_empty_store() {
        let (_, reader, _) = fixture();
        assert!(reader.current_user().is_none());
        assert!(!reader.is_authenticated());
    }

    #[test]
    fn test_partial_store_is_unauthenticated() {
        let (_, reader, _) = fixture();
        reader.store().set("opaque").unwrap();
        assert!(!reader.is_authenticated());

        reader.store().clear();
        reader.store().set_user(&admin()).unwrap();
        assert_eq!(reader.current_user(), Some(admin()));
        assert!(!reader.is_authenticated());
    }

    #[test]
    fn test_malformed_user_reads_absent() {
        let (port, reader, _) = fixture();
        port.set("token", "opaque").unwrap();
        port.set("user", "{\"id\":").unwrap();
        assert!(reader.current_user().is_none());
        assert!(!reader.is_authenticated());
    }

    #[test]
    fn test_expiry_follows_clock() {
        let (_, reader, clock) = fixture();
        let token = token::mint_fallback(&admin(), clock.now(), Duration::minutes(5), "k").unwrap();
        reader.store().write_session(&token, &admin()).unwrap();
        assert!(reader.is_authenticated());

        clock.advance(Duration::minutes(5));
        assert!(!reader.is_authenticated());
        assert_eq!(reader.current_user(), Some(admin()));
    }
}

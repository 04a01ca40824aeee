//! Fallback token minter
//!
//! Lets a caller that is already authenticated by other means (for example
//! an elevated session acting as another role) carry *some* bearer value to
//! downstream requests. The minted token is a usability shim and must never
//! be treated as a credential.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::types::User;
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::store::TokenStore;
use crate::token;

/// Writes a locally minted token when none is stored
#[derive(Debug, Clone)]
pub struct FallbackMinter {
    store: TokenStore,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl FallbackMinter {
    pub fn new(store: TokenStore, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        Self { store, clock, config }
    }

    /// Make sure a bearer token is stored.
    ///
    /// - token already stored: no write, `true`
    /// - no token, `user` given: mint, store, `true`
    /// - no token, no user (or minting disabled or failing): no write, `false`
    pub fn ensure_token(&self, user: Option<&User>) -> bool {
        if self.store.get().is_some() {
            return true;
        }

        let Some(user) = user else {
            return false;
        };
        if !self.config.fallback_tokens_enabled {
            warn!(user_id = %user.id, "No stored token and fallback minting is disabled");
            return false;
        }

        let minted = self.store.set_if_absent(|| {
            token::mint_fallback(
                user,
                self.clock.now(),
                self.config.fallback_token_validity,
                &self.config.fallback_secret,
            )
        });

        match minted {
            Ok(true) => {
                info!(user_id = %user.id, role = %user.role, "Fallback token minted");
                true
            }
            Ok(false) => {
                debug!(user_id = %user.id, "Token stored concurrently, nothing minted");
                true
            }
            Err(e) => {
                warn!(error = %e, user_id = %user.id, "Fallback token could not be stored");
                false
            }
        }
    }
}

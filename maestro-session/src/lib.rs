//! # Maestro Session
//!
//! Client-side session core for the Maestro educational platform — login,
//! registration, persisted bearer tokens, and role-based landing routes.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                 SessionHandle                 │
//! │   state · subscribe · login · register ·      │
//! │   logout · refresh_user · ensure_token        │
//! ├───────────────────────┬───────────────────────┤
//! │     SessionActor      │    FallbackMinter     │
//! │  (single writer,      │  (local stand-in      │
//! │   epoch-guarded)      │   tokens)             │
//! ├───────────────────────┴───────────────────────┤
//! │       SessionReader (pure derivation)         │
//! ├───────────────────────────────────────────────┤
//! │      TokenStore (token + user snapshot)       │
//! ├───────────────────────────────────────────────┤
//! │   KeyValuePort: MemoryStorage · FileStorage   │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Role routing ([`destination_for`]) sits outside the actor: callers
//! decide where to navigate after a successful login.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use maestro_session::auth::{Credentials, IdentityService, SessionActor};
//! use maestro_session::{destination_for, FileStorage, SessionConfig};
//!
//! async fn run(identity: Arc<dyn IdentityService>) -> maestro_session::Result<()> {
//!     let storage = Arc::new(FileStorage::new("/var/lib/maestro/session.json"));
//!     let handle = SessionActor::spawn(identity, storage, SessionConfig::new()).await;
//!
//!     // Hydrated from disk
//!     let state = handle.wait_until_loaded().await;
//!     if !state.is_authenticated() {
//!         let session = handle.login(Credentials::new("ana@school.edu", "secret")).await?;
//!         println!("landing: {}", destination_for(Some(session.user.role)));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! - **Single writer**: only the actor publishes session state
//! - **Atomic writes**: token and user are persisted as one unit
//! - **No resurrection**: responses that arrive after a logout are discarded
//! - **Total derivation**: partial or corrupt storage reads as signed out
//! - **Railway Programming**: fallible operations return `Result<T, AuthError>`

pub mod auth;
pub mod clock;
pub mod config;
pub mod derive;
pub mod error;
pub mod minter;
pub mod routes;
pub mod storage;
pub mod store;
pub mod token;

// Re-exports for convenience
pub use auth::{
    Credentials, IdentityService, Registration, Session, SessionActor, SessionHandle,
    SessionState, User, UserRole,
};
pub use clock::{Clock, SystemClock};
pub use config::SessionConfig;
pub use derive::SessionReader;
pub use error::{AuthError, Result};
pub use minter::FallbackMinter;
pub use routes::{destination_for, Destination};
pub use storage::{FileStorage, KeyValuePort, MemoryStorage};
pub use store::{PersistedRecord, TokenStore};

#[cfg(feature = "http")]
pub use auth::HttpIdentityService;

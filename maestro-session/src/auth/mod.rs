//! Authentication module — identity port, session actor, and domain types

pub mod types;
pub mod identity;
pub mod actor;

pub use actor::{SessionActor, SessionHandle};
pub use identity::IdentityService;
#[cfg(feature = "http")]
pub use identity::HttpIdentityService;
pub use types::{AuthGrant, Credentials, Registration, Session, SessionState, User, UserRole};

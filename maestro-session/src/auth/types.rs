//! Auth domain types — UserRole, User, Credentials, Session
//!
//! Serializable, cloneable, and cheap to pass around.

use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Platform roles
///
/// Wire form is SCREAMING_SNAKE_CASE. Unrecognized strings read as
/// `Teacher`, the least privileged landing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserRole {
    Teacher,
    Admin,
    SuperAdmin,
    AiMaestro,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [Self::Teacher, Self::Admin, Self::SuperAdmin, Self::AiMaestro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Teacher => "TEACHER",
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::AiMaestro => "AI_MAESTRO",
        }
    }

    /// Parse a role string, case-insensitively; unknown values become `Teacher`
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ADMIN" => Self::Admin,
            "SUPER_ADMIN" => Self::SuperAdmin,
            "AI_MAESTRO" => Self::AiMaestro,
            _ => Self::Teacher,
        }
    }
}

impl FromStr for UserRole {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse_lossy(s))
    }
}

impl From<String> for UserRole {
    fn from(s: String) -> Self {
        Self::parse_lossy(&s)
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity snapshot — replaced wholesale, never patched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

/// Login input. Never persisted.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Client-side checks run before any network call
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AuthError::InvalidInput("Password is required".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration input. Never persisted.
#[derive(Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

impl Registration {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AuthError::InvalidInput("Name is required".into()));
        }
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AuthError::InvalidInput("Password is required".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::InvalidInput("Email is required".into()));
    }
    if !email.contains('@') {
        return Err(AuthError::InvalidInput("Invalid email address".into()));
    }
    Ok(())
}

/// What the identity service hands back on login or registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub user: User,
    pub access_token: String,
}

/// An authenticated session: both halves always present together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: User,
}

/// Published session state
///
/// `Loading` only exists between actor spawn and the end of hydration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Loading,
    Authenticated(Session),
    Unauthenticated,
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(session) => Some(&session.user),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Authenticated(_) => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

impl From<Option<Session>> for SessionState {
    fn from(session: Option<Session>) -> Self {
        session.map_or(Self::Unauthenticated, Self::Authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&UserRole::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER_ADMIN\"");
        let parsed: UserRole = serde_json::from_str("\"AI_MAESTRO\"").unwrap();
        assert_eq!(parsed, UserRole::AiMaestro);
    }

    #[test]
    fn test_unknown_role_reads_as_teacher() {
        let parsed: UserRole = serde_json::from_str("\"JANITOR\"").unwrap();
        assert_eq!(parsed, UserRole::Teacher);
        assert_eq!(UserRole::parse_lossy("admin"), UserRole::Admin);
        assert_eq!(" super_admin ".parse::<UserRole>(), Ok(UserRole::SuperAdmin));
        assert_eq!("".parse::<UserRole>(), Ok(UserRole::Teacher));
    }

    #[test]
    fn test_user_json_shape() {
        let user: User = serde_json::from_str(
            r#"{"id":"u1","name":"Ana","email":"ana@x.com","role":"ADMIN"}"#,
        )
        .unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.name, "Ana");
    }

    #[test]
    fn test_credentials_validation() {
        assert!(Credentials::new("a@x.com", "p").validate().is_ok());
        assert!(matches!(
            Credentials::new("", "p").validate(),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(Credentials::new("ax.com", "p").validate().is_err());
        assert!(Credentials::new("a@x.com", "").validate().is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let printed = format!("{:?}", Credentials::new("a@x.com", "hunter2"));
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("a@x.com"));
    }

    #[test]
    fn test_registration_validation() {
        assert!(Registration::new("Ana", "a@x.com", "p").validate().is_ok());
        assert!(Registration::new(" ", "a@x.com", "p").validate().is_err());
    }

    #[test]
    fn test_state_accessors() {
        let state = SessionState::default();
        assert!(state.is_loading());
        assert!(state.user().is_none());

        let state = SessionState::from(None);
        assert_eq!(state, SessionState::Unauthenticated);
        assert_eq!(state.as_str(), "unauthenticated");
    }
}

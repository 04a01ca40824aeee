//! Role router — post-login landing destinations
//!
//! Static and versionless: nothing persisted depends on this table.

use serde::Serialize;

use crate::auth::types::UserRole;

/// Landing area for an authenticated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    SuperAdmin,
    Admin,
    MaestroDashboard,
    Dashboard,
}

impl Destination {
    pub fn path(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "/super-admin",
            Self::Admin => "/admin",
            Self::MaestroDashboard => "/maestro/dashboard",
            Self::Dashboard => "/dashboard",
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Where a user with `role` lands. Absent roles land like teachers.
pub fn destination_for(role: Option<UserRole>) -> Destination {
    match role {
        Some(UserRole::SuperAdmin) => Destination::SuperAdmin,
        Some(UserRole::Admin) => Destination::Admin,
        Some(UserRole::AiMaestro) => Destination::MaestroDashboard,
        Some(UserRole::Teacher) | None => Destination::Dashboard,
    }
}

/// Same as [`destination_for`] for a raw role string
pub fn destination_for_str(role: &str) -> Destination {
    destination_for(Some(UserRole::parse_lossy(role)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_role_has_destination() {
        assert_eq!(destination_for(Some(UserRole::SuperAdmin)).path(), "/super-admin");
        assert_eq!(destination_for(Some(UserRole::Admin)).path(), "/admin");
        assert_eq!(destination_for(Some(UserRole::AiMaestro)).path(), "/maestro/dashboard");
        assert_eq!(destination_for(Some(UserRole::Teacher)).path(), "/dashboard");
    }

    #[test]
    fn test_absent_and_unknown_default_to_teacher() {
        let teacher = destination_for(Some(UserRole::Teacher));
        assert_eq!(destination_for(None), teacher);
        assert_eq!(destination_for_str("PRINCIPAL"), teacher);
        assert_eq!(destination_for_str(""), teacher);
        assert_eq!(destination_for_str("ADMIN"), Destination::Admin);
    }
}

//! The fixed role set.
//!
//! Roles carry no implicit hierarchy. Every permission is an explicit
//! allow-list of roles, see [`crate::access::policy`].

use serde::{Deserialize, Serialize};

/// Role of a user across the whole platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// A resident.
    #[default]
    User,
    /// On-site staff handling issue reports.
    Caretaker,
    /// Property manager.
    Manager,
    /// Platform administrator.
    Admin,
    /// Platform owner.
    SuperAdmin,
}

impl Role {
    /// All roles, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::User,
        Self::Caretaker,
        Self::Manager,
        Self::Admin,
        Self::SuperAdmin,
    ];

    /// Roles that see every residence in list endpoints.
    pub const ELEVATED: &'static [Self] =
        &[Self::Caretaker, Self::Manager, Self::Admin, Self::SuperAdmin];

    /// Roles allowed to delete resources and override ownership rules.
    pub const ADMIN_TIER: &'static [Self] = &[Self::Admin, Self::SuperAdmin];

    /// Returns true if the role is in the given allow-list.
    #[must_use]
    pub fn is_one_of(self, allowed: &[Self]) -> bool {
        allowed.contains(&self)
    }

    /// Returns true if list endpoints are unrestricted for this role.
    #[must_use]
    pub fn is_elevated(self) -> bool {
        self.is_one_of(Self::ELEVATED)
    }

    /// Returns the wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Caretaker => "CARETAKER",
            Self::Manager => "MANAGER",
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("invalid role: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
        }
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("super_admin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!("Caretaker".parse::<Role>().unwrap(), Role::Caretaker);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_elevated_excludes_plain_users() {
        assert!(!Role::User.is_elevated());
        assert!(Role::Caretaker.is_elevated());
        assert!(Role::SuperAdmin.is_elevated());
    }
}

// Authentication data models and DTOs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::accounts::AccountView;

/// Closed set of roles an account can hold
///
/// There is no implicit hierarchy: a route that accepts `Admin` does not
/// accept `SuperAdmin` unless it lists both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    SuperAdmin,
    Admin,
    User,
}

impl Role {
    /// All roles, in display order
    pub const ALL: [Role; 3] = [Role::SuperAdmin, Role::Admin, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SuperAdmin",
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Role::SuperAdmin => 0b001,
            Role::Admin => 0b010,
            Role::User => 0b100,
        }
    }

    /// Comma-separated list of every valid role name
    pub fn valid_names() -> String {
        Role::ALL
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Parse a role name (case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Invalid role. Valid roles: {}", Role::valid_names()))
    }
}

/// Set of roles accepted by a role gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSet {
    bits: u8,
}

impl RoleSet {
    pub fn of(roles: &[Role]) -> Self {
        Self {
            bits: roles.iter().fold(0, |acc, r| acc | r.bit()),
        }
    }

    /// SuperAdmin and Admin
    pub fn administrators() -> Self {
        Self::of(&[Role::SuperAdmin, Role::Admin])
    }

    /// Every role
    pub fn any() -> Self {
        Self::of(&Role::ALL)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.bits & role.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|r| self.contains(*r))
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|r| r.as_str()).collect();
        write!(f, "{}", names.join(", "))
    }
}

/// Registration request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Login request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Query string of the verification link
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyEmailQuery {
    /// Verification token from the emailed link
    pub token: Option<String>,
}

/// Response to a successful registration
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: AccountView,
}

/// Response to a successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    pub user: AccountView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("SUPERADMIN".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!(" User ".parse::<Role>().unwrap(), Role::User);
    }

    #[test]
    fn test_unknown_role_lists_valid_roles() {
        let err = "root".parse::<Role>().unwrap_err();
        assert_eq!(err, "Invalid role. Valid roles: SuperAdmin, Admin, User");
    }

    #[test]
    fn test_role_serializes_by_name() {
        assert_eq!(serde_json::to_string(&Role::SuperAdmin).unwrap(), "\"SuperAdmin\"");
        let role: Role = serde_json::from_str("\"Admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_role_set_membership_has_no_hierarchy() {
        let admins_only = RoleSet::of(&[Role::Admin]);
        assert!(admins_only.contains(Role::Admin));
        assert!(!admins_only.contains(Role::SuperAdmin));
        assert!(!admins_only.contains(Role::User));

        let administrators = RoleSet::administrators();
        assert!(administrators.contains(Role::SuperAdmin));
        assert!(administrators.contains(Role::Admin));
        assert!(!administrators.contains(Role::User));
    }

    #[test]
    fn test_role_set_display() {
        assert_eq!(RoleSet::administrators().to_string(), "SuperAdmin, Admin");
        assert_eq!(RoleSet::any().to_string(), "SuperAdmin, Admin, User");
        assert_eq!(RoleSet::of(&[]).to_string(), "");
    }

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            email: "a@x.com".to_string(),
            password: "secret1".to_string(),
        };
        assert!(ok.validate().is_ok());

        let short = RegisterRequest {
            email: "a@x.com".to_string(),
            password: "12345".to_string(),
        };
        assert!(short.validate().is_err());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
        };
        assert!(bad_email.validate().is_err());
    }
}

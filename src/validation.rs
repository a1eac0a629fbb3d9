// Validation utilities module
// Provides custom validation functions for identity-specific rules

use std::borrow::Cow;
use validator::ValidationError;

use crate::accounts::AccountStatus;
use crate::auth::models::Role;

/// Validates that a role name is one of SuperAdmin, Admin, User (case-insensitive)
pub fn validate_role_name(role: &str) -> Result<(), ValidationError> {
    role.parse::<Role>().map(|_| ()).map_err(|msg| {
        let mut err = ValidationError::new("invalid_role");
        err.message = Some(Cow::Owned(msg));
        err
    })
}

/// Validates that a status name is Pending or Active (case-insensitive)
pub fn validate_status_name(status: &str) -> Result<(), ValidationError> {
    status.parse::<AccountStatus>().map(|_| ()).map_err(|msg| {
        let mut err = ValidationError::new("invalid_status");
        err.message = Some(Cow::Owned(msg));
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_role_name() {
        assert!(validate_role_name("Admin").is_ok());
        assert!(validate_role_name("superadmin").is_ok());

        let err = validate_role_name("Owner").unwrap_err();
        assert_eq!(err.code, "invalid_role");
        assert!(err.message.unwrap().contains("Valid roles: SuperAdmin, Admin, User"));
    }

    #[test]
    fn test_validate_status_name() {
        assert!(validate_status_name("active").is_ok());
        assert!(validate_status_name("frozen").is_err());
    }
}

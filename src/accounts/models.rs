// Account data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::models::Role;
use crate::validation::{validate_role_name, validate_status_name};

/// Activation state of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AccountStatus {
    /// Self-registered, waiting for email verification
    Pending,
    Active,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "Pending",
            AccountStatus::Active => "Active",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AccountStatus::Pending),
            "active" => Ok(AccountStatus::Active),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

/// Normalize an email for storage and comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Stored account record
///
/// `password_hash` and `verification_token` never leave the service; use
/// [`AccountView`] for anything serialized outward.
#[derive(Clone, PartialEq)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub status: AccountStatus,
    pub verification_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("status", &self.status)
            .field("has_verification_token", &self.verification_token.is_some())
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Input to `AccountStore::create`; the store assigns id and timestamps
#[derive(Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub status: AccountStatus,
    pub verification_token: Option<String>,
}

/// Partial update; `None` keeps the stored value
///
/// Email is not part of the patch: it is immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

impl AccountPatch {
    /// Apply the patch to an existing account
    ///
    /// An empty password hash counts as absent. Moving to `Active` clears the
    /// verification token.
    pub fn apply_to(self, account: &mut Account) {
        if let Some(hash) = self.password_hash.filter(|h| !h.is_empty()) {
            account.password_hash = hash;
        }
        if let Some(role) = self.role {
            account.role = role;
        }
        if let Some(status) = self.status {
            account.status = status;
        }
        if account.status == AccountStatus::Active {
            account.verification_token = None;
        }
        account.updated_at = Utc::now();
    }
}

/// Account response model (excludes password hash and verification token)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            role: account.role,
            status: account.status,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Admin account creation request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAccountRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    /// Defaults to `User` when omitted
    #[validate(custom = "validate_role_name")]
    pub role: Option<String>,
}

/// Admin account update request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    #[validate(custom = "validate_role_name")]
    pub role: Option<String>,
    #[validate(custom = "validate_status_name")]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_account() -> Account {
        let now = Utc::now();
        Account {
            id: "1".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
            status: AccountStatus::Pending,
            verification_token: Some("tok".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
    }

    #[test]
    fn test_empty_patch_keeps_fields() {
        let mut account = pending_account();
        AccountPatch {
            password_hash: Some(String::new()),
            ..Default::default()
        }
        .apply_to(&mut account);

        assert_eq!(account.password_hash, "hash");
        assert_eq!(account.role, Role::User);
        assert_eq!(account.status, AccountStatus::Pending);
        assert_eq!(account.verification_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_activation_clears_verification_token() {
        let mut account = pending_account();
        AccountPatch {
            status: Some(AccountStatus::Active),
            ..Default::default()
        }
        .apply_to(&mut account);

        assert_eq!(account.status, AccountStatus::Active);
        assert!(account.verification_token.is_none());
    }

    #[test]
    fn test_view_omits_secrets() {
        let view = AccountView::from(pending_account());
        let json = serde_json::to_value(&view).unwrap();

        assert!(json.get("password_hash").is_none());
        assert!(json.get("verification_token").is_none());
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["role"], "User");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", pending_account());
        assert!(!rendered.contains("hash\""));
        assert!(!rendered.contains("tok\""));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("active".parse::<AccountStatus>().unwrap(), AccountStatus::Active);
        assert_eq!("Pending".parse::<AccountStatus>().unwrap(), AccountStatus::Pending);
        assert!("deleted".parse::<AccountStatus>().is_err());
    }
}

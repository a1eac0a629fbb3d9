// Authentication service - business logic layer
// Registration, email verification, login and administrator account management

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::accounts::{
    normalize_email, Account, AccountPatch, AccountStatus, AccountStore, AccountView, NewAccount,
    StoreError,
};
use crate::auth::{
    models::{Role, TokenResponse},
    password::PasswordHasher,
    token::TokenService,
    verification::VerificationTokenGenerator,
};
use crate::error::ApiError;
use crate::notify::{verification_message, Notifier};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Changes an administrator may apply to an account
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub password: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

/// Authentication service coordinating all identity operations
///
/// Accounts are only ever reached through the `AccountStore`; the service
/// keeps no account state of its own.
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    hasher: PasswordHasher,
    tokens: TokenService,
    verification: VerificationTokenGenerator,
    notifier: Arc<dyn Notifier>,
    base_url: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        tokens: TokenService,
        notifier: Arc<dyn Notifier>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            hasher: PasswordHasher::new(),
            tokens,
            verification: VerificationTokenGenerator,
            notifier,
            base_url: base_url.into(),
        }
    }

    pub fn token_service(&self) -> &TokenService {
        &self.tokens
    }

    /// Hash on the blocking pool; Argon2 is deliberately slow
    async fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        let hasher = self.hasher;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ApiError::Internal(format!("hashing task failed: {}", e)))?
            .map_err(ApiError::from)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        let hasher = self.hasher;
        let password = password.to_string();
        let hash = hash.to_string();
        match tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await {
            Ok(matches) => matches,
            Err(e) => {
                error!("Password verification task failed: {}", e);
                false
            }
        }
    }

    /// Send the verification email without holding up the caller
    fn dispatch_verification(&self, account: &Account, token: &str) {
        let message = verification_message(&account.email, &self.base_url, token);
        let notifier = self.notifier.clone();
        let account_id = account.id.clone();

        tokio::spawn(async move {
            match notifier.send(message).await {
                Ok(()) => debug!("Verification email dispatched for account {}", account_id),
                Err(e) => warn!(
                    "Failed to send verification email for account {}: {}",
                    account_id, e
                ),
            }
        });
    }

    /// Register a new account
    ///
    /// The account starts `Pending` with role `User` and a fresh verification
    /// token. No bearer token is issued.
    ///
    /// # Errors
    /// * `DuplicateEmail` - the email is already registered
    pub async fn register(&self, email: &str, password: &str) -> Result<AccountView, ApiError> {
        let email = normalize_email(email);

        if self.store.get_by_email(&email).await?.is_some() {
            debug!("Registration rejected for existing email");
            return Err(ApiError::DuplicateEmail);
        }

        let password_hash = self.hash_password(password).await?;
        let token = self.verification.generate()?;

        // The store re-checks the email atomically; a concurrent registration
        // that slipped past the lookup above fails here
        let account = self
            .store
            .create(NewAccount {
                email,
                password_hash,
                role: Role::User,
                status: AccountStatus::Pending,
                verification_token: Some(token.clone()),
            })
            .await?;

        info!("Registered account {} (pending verification)", account.id);
        self.dispatch_verification(&account, &token);

        Ok(account.into())
    }

    /// Activate the account holding this verification token
    ///
    /// # Errors
    /// * `Validation` - empty token
    /// * `NotFound` - no pending account holds the token
    pub async fn verify_email(&self, token: &str) -> Result<AccountView, ApiError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::Validation(
                "Verification token is required".to_string(),
            ));
        }

        let account = self
            .store
            .get_by_verification_token(token)
            .await?
            .ok_or_else(|| {
                debug!("Unknown verification token presented");
                ApiError::NotFound("Invalid or expired verification token".to_string())
            })?;

        let updated = self
            .store
            .update(
                &account.id,
                AccountPatch {
                    status: Some(AccountStatus::Active),
                    ..Default::default()
                },
            )
            .await?;

        info!("Account {} verified its email", updated.id);
        Ok(updated.into())
    }

    /// Authenticate with email and password and issue a bearer token
    ///
    /// # Errors
    /// * `Unauthorized` - unknown email or wrong password (same message for both)
    /// * `Forbidden` - the account has not verified its email
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let email = normalize_email(email);

        let account = match self.store.get_by_email(&email).await? {
            Some(account) => account,
            None => {
                warn!("Login failed: unknown email");
                return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !self.verify_password(password, &account.password_hash).await {
            warn!("Login failed: wrong password for account {}", account.id);
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if account.status == AccountStatus::Pending {
            debug!("Login refused for unverified account {}", account.id);
            return Err(ApiError::Forbidden(
                "Please verify your email before logging in".to_string(),
            ));
        }

        let access_token = self.tokens.issue(&account.id, &account.email, account.role)?;
        info!("Account {} logged in", account.id);

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.ttl_seconds(),
            user: account.into(),
        })
    }

    /// Create an already-active account on behalf of an administrator
    ///
    /// No verification token is assigned and no notification is sent. The
    /// caller's role is checked by the route's role gate, not here.
    ///
    /// # Errors
    /// * `DuplicateEmail` - the email is already registered
    pub async fn create_account_as_admin(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<AccountView, ApiError> {
        let email = normalize_email(email);

        if self.store.get_by_email(&email).await?.is_some() {
            return Err(ApiError::DuplicateEmail);
        }

        let password_hash = self.hash_password(password).await?;
        let account = self
            .store
            .create(NewAccount {
                email,
                password_hash,
                role,
                status: AccountStatus::Active,
                verification_token: None,
            })
            .await?;

        info!("Administrator created account {} with role {}", account.id, account.role);
        Ok(account.into())
    }

    /// Create the bootstrap SuperAdmin unless the email is already taken
    pub async fn seed_super_admin(&self, email: &str, password: &str) -> Result<(), ApiError> {
        match self
            .create_account_as_admin(email, password, Role::SuperAdmin)
            .await
        {
            Ok(account) => {
                info!("Seeded SuperAdmin account {}", account.id);
                Ok(())
            }
            Err(ApiError::DuplicateEmail) => {
                debug!("Seed SuperAdmin already present");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_accounts(&self) -> Result<Vec<AccountView>, ApiError> {
        let accounts = self.store.list().await?;
        Ok(accounts.into_iter().map(AccountView::from).collect())
    }

    pub async fn get_account(&self, id: &str) -> Result<AccountView, ApiError> {
        self.store
            .get_by_id(id)
            .await?
            .map(AccountView::from)
            .ok_or_else(|| ApiError::from(StoreError::NotFound(id.to_string())))
    }

    /// Apply administrator changes to an account
    ///
    /// Status may only move to `Active`; an active account never returns to
    /// `Pending` because it would have no verification token.
    ///
    /// # Errors
    /// * `Validation` - status change to `Pending`
    /// * `NotFound` - no account with this id
    pub async fn update_account(
        &self,
        id: &str,
        changes: AccountChanges,
    ) -> Result<AccountView, ApiError> {
        if changes.status == Some(AccountStatus::Pending) {
            return Err(ApiError::Validation(
                "Status can only be changed to Active".to_string(),
            ));
        }

        let password_hash = match changes.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => Some(self.hash_password(password).await?),
            None => None,
        };

        let updated = self
            .store
            .update(
                id,
                AccountPatch {
                    password_hash,
                    role: changes.role,
                    status: changes.status,
                },
            )
            .await?;

        info!("Account {} updated", updated.id);
        Ok(updated.into())
    }

    pub async fn delete_account(&self, id: &str) -> Result<(), ApiError> {
        self.store.delete(id).await?;
        info!("Account {} deleted", id);
        Ok(())
    }
}

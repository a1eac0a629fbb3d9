// Account persistence contract and the in-memory implementation

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::accounts::{
    error::StoreError,
    models::{normalize_email, Account, AccountPatch, NewAccount},
};

/// Persistence operations for accounts
///
/// Every component other than the store itself reaches accounts through this
/// trait; nothing holds references into a store's internal state.
#[async_trait]
pub trait AccountStore: Send + Sync + 'static {
    /// All accounts
    async fn list(&self) -> Result<Vec<Account>, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Account>, StoreError>;

    /// Case-insensitive email lookup
    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Lookup by pending verification token; an empty token matches nothing
    async fn get_by_verification_token(&self, token: &str)
        -> Result<Option<Account>, StoreError>;

    /// Persist a new account and assign its id
    ///
    /// # Errors
    /// * `DuplicateEmail` - the normalized email is already taken
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Merge a partial update into an existing account
    ///
    /// # Errors
    /// * `NotFound` - no account with this id
    async fn update(&self, id: &str, patch: AccountPatch) -> Result<Account, StoreError>;

    /// # Errors
    /// * `NotFound` - no account with this id
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Accounts {
    by_id: HashMap<String, Account>,
    next_id: u64,
}

impl Accounts {
    fn find_by_email(&self, email: &str) -> Option<&Account> {
        let email = normalize_email(email);
        self.by_id
            .values()
            .find(|a| normalize_email(&a.email) == email)
    }

    fn bump_next_id(&mut self, id: &str) {
        if let Ok(n) = id.parse::<u64>() {
            if n >= self.next_id {
                self.next_id = n + 1;
            }
        }
    }
}

/// Account store kept in process memory
///
/// Reads share the lock; writes take it exclusively, so the duplicate-email
/// check and the insert in `create` happen atomically.
#[derive(Debug)]
pub struct InMemoryAccountStore {
    inner: RwLock<Accounts>,
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Accounts {
                by_id: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Create a store pre-populated with existing accounts
    pub fn with_accounts(seed: Vec<Account>) -> Self {
        let mut accounts = Accounts {
            by_id: HashMap::new(),
            next_id: 1,
        };
        for account in seed {
            accounts.bump_next_id(&account.id);
            accounts.by_id.insert(account.id.clone(), account);
        }
        Self {
            inner: RwLock::new(accounts),
        }
    }

    /// Insert or replace an account under its own id
    ///
    /// Any other entry holding the same normalized email is dropped, so a
    /// record mirrored from a remote store replaces a stale local copy.
    pub async fn upsert(&self, account: Account) {
        let mut inner = self.inner.write().await;
        let email = normalize_email(&account.email);
        inner
            .by_id
            .retain(|id, a| id == &account.id || normalize_email(&a.email) != email);
        inner.bump_next_id(&account.id);
        inner.by_id.insert(account.id.clone(), account);
    }

    /// Move an account to a new id, returning the re-keyed account
    pub async fn rekey(&self, old_id: &str, new_id: &str) -> Option<Account> {
        let mut inner = self.inner.write().await;
        let mut account = inner.by_id.remove(old_id)?;
        account.id = new_id.to_string();
        inner.by_id.insert(account.id.clone(), account.clone());
        Some(account)
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        let inner = self.inner.read().await;
        let mut accounts: Vec<Account> = inner.by_id.values().cloned().collect();
        accounts.sort_by(|a, b| {
            let key = |id: &str| id.parse::<u64>().unwrap_or(u64::MAX);
            key(&a.id).cmp(&key(&b.id)).then_with(|| a.id.cmp(&b.id))
        });
        Ok(accounts)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.inner.read().await.by_id.get(id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.inner.read().await.find_by_email(email).cloned())
    }

    async fn get_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, StoreError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }

        let inner = self.inner.read().await;
        Ok(inner
            .by_id
            .values()
            .find(|a| a.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut inner = self.inner.write().await;

        let email = normalize_email(&new.email);
        if inner.find_by_email(&email).is_some() {
            return Err(StoreError::DuplicateEmail(email));
        }

        let id = inner.next_id.to_string();
        inner.next_id += 1;

        let now = Utc::now();
        let account = Account {
            id: id.clone(),
            email,
            password_hash: new.password_hash,
            role: new.role,
            status: new.status,
            verification_token: new.verification_token.filter(|t| !t.is_empty()),
            created_at: now,
            updated_at: now,
        };
        inner.by_id.insert(id, account.clone());

        Ok(account)
    }

    async fn update(&self, id: &str, patch: AccountPatch) -> Result<Account, StoreError> {
        let mut inner = self.inner.write().await;
        let account = inner
            .by_id
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        patch.apply_to(account);
        Ok(account.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .by_id
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

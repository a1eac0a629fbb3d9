// Two-tier account store: remote record store in front of a local mirror
//
// Consistency contract:
// - Reads prefer the remote store. A remote error, a timeout, or an empty
//   answer falls back to the local mirror. Accounts read from the remote are
//   written through to the mirror.
// - Writes go to the mirror first; the mirror's result is authoritative. The
//   remote write is best-effort: failures are logged and the local result is
//   returned anyway.
// The two tiers are therefore only eventually consistent.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::accounts::{
    error::StoreError,
    models::{normalize_email, Account, AccountPatch, NewAccount},
    record_store::{
        account_from_record, accounts_from_records, email_formula, record_fields_for_create,
        record_fields_for_update, verification_token_formula, ListParams, RecordStore,
        RecordStoreError,
    },
    repository::{AccountStore, InMemoryAccountStore},
};

pub struct TieredAccountStore {
    local: InMemoryAccountStore,
    remote: Arc<dyn RecordStore>,
    deadline: Duration,
}

impl TieredAccountStore {
    /// Create a tiered store; `deadline` bounds every remote call
    pub fn new(remote: Arc<dyn RecordStore>, deadline: Duration) -> Self {
        Self::with_mirror(InMemoryAccountStore::new(), remote, deadline)
    }

    pub fn with_mirror(
        local: InMemoryAccountStore,
        remote: Arc<dyn RecordStore>,
        deadline: Duration,
    ) -> Self {
        Self {
            local,
            remote,
            deadline,
        }
    }

    /// Run a remote call under the deadline
    async fn remote_call<T, F>(&self, op: &str, call: F) -> Result<T, RecordStoreError>
    where
        F: Future<Output = Result<T, RecordStoreError>>,
    {
        let result = match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(RecordStoreError::Timeout(self.deadline)),
        };
        if let Err(e) = &result {
            warn!("Remote account store {} failed: {}", op, e);
        }
        result
    }

    /// First remote record matching a formula, mirrored locally
    async fn remote_find(
        &self,
        op: &str,
        formula: String,
    ) -> Result<Option<Account>, RecordStoreError> {
        let params = ListParams {
            filter_by_formula: Some(formula),
            page_size: Some(1),
        };
        let records = self
            .remote_call(op, self.remote.list_records(params))
            .await?;

        match records.first().map(account_from_record) {
            Some(Ok(account)) => {
                self.local.upsert(account.clone()).await;
                Ok(Some(account))
            }
            Some(Err(e)) => {
                warn!("Remote account record could not be mapped: {}", e);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AccountStore for TieredAccountStore {
    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        match self
            .remote_call("list", self.remote.list_records(ListParams::default()))
            .await
        {
            Ok(records) => {
                let accounts = accounts_from_records(&records);
                if accounts.is_empty() {
                    debug!("Remote account store returned no accounts, using local mirror");
                    return self.local.list().await;
                }
                for account in &accounts {
                    self.local.upsert(account.clone()).await;
                }
                Ok(accounts)
            }
            Err(_) => self.local.list().await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        let record = match self.remote_call("get", self.remote.get_record(id)).await {
            Ok(record) => record,
            Err(_) => return self.local.get_by_id(id).await,
        };

        match account_from_record(&record) {
            Ok(account) => {
                self.local.upsert(account.clone()).await;
                Ok(Some(account))
            }
            Err(e) => {
                warn!("Remote account record could not be mapped: {}", e);
                self.local.get_by_id(id).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(None);
        }

        match self.remote_find("find by email", email_formula(&email)).await {
            Ok(Some(account)) => Ok(Some(account)),
            Ok(None) | Err(_) => self.local.get_by_email(&email).await,
        }
    }

    async fn get_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, StoreError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }

        match self
            .remote_find("find by verification token", verification_token_formula(token))
            .await
        {
            Ok(Some(account)) => Ok(Some(account)),
            Ok(None) | Err(_) => self.local.get_by_verification_token(token).await,
        }
    }

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        // An account that so far exists only remotely still blocks the email
        if let Ok(Some(existing)) = self
            .remote_find("find by email", email_formula(&new.email))
            .await
        {
            return Err(StoreError::DuplicateEmail(existing.email));
        }

        let created = self.local.create(new).await?;

        let fields = record_fields_for_create(&created);
        match self
            .remote_call("create", self.remote.create_record(fields))
            .await
        {
            Ok(record) => {
                info!("Account {} saved to remote store as {}", created.id, record.id);
                Ok(self
                    .local
                    .rekey(&created.id, &record.id)
                    .await
                    .unwrap_or(created))
            }
            Err(_) => Ok(created),
        }
    }

    async fn update(&self, id: &str, patch: AccountPatch) -> Result<Account, StoreError> {
        let updated = match self.local.update(id, patch.clone()).await {
            Ok(updated) => updated,
            Err(StoreError::NotFound(_)) => {
                // Pull the account into the mirror, then retry locally
                if self.get_by_id(id).await?.is_none() {
                    return Err(StoreError::NotFound(id.to_string()));
                }
                self.local.update(id, patch).await?
            }
            Err(e) => return Err(e),
        };

        let fields = record_fields_for_update(&updated);
        if self
            .remote_call("update", self.remote.update_record(id, fields))
            .await
            .is_ok()
        {
            debug!("Account {} updated in remote store", id);
        }

        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let local = self.local.delete(id).await;
        let remote = self
            .remote_call("delete", self.remote.delete_record(id))
            .await;

        match (local, remote) {
            (Ok(()), _) | (Err(StoreError::NotFound(_)), Ok(())) => Ok(()),
            (Err(e), _) => Err(e),
        }
    }
}

// Remote record store client
//
// The backing store is a hosted table service addressed as
// {api_url}/{base_id}/{table}. Records carry a store-assigned id and a free-form
// field map; filters are formula strings evaluated server-side.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::accounts::models::{normalize_email, Account, AccountStatus};
use crate::auth::models::Role;

pub const FIELD_EMAIL: &str = "Email";
pub const FIELD_PASSWORD: &str = "Password";
pub const FIELD_ROLE: &str = "Role";
pub const FIELD_STATUS: &str = "Status";
pub const FIELD_VERIFICATION_TOKEN: &str = "EmailVerificationToken";
pub const FIELD_CREATED_AT: &str = "CreatedAt";
pub const FIELD_UPDATED_AT: &str = "UpdatedAt";

pub type RecordFields = Map<String, Value>;

/// A single remote record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: RecordFields,
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

/// Query options for `RecordStore::list_records`
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub filter_by_formula: Option<String>,
    pub page_size: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    #[error("record store request failed: {0}")]
    Request(String),

    #[error("record store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("record store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("record store response could not be decoded: {0}")]
    Decode(String),

    #[error("invalid record id '{0}'")]
    InvalidId(String),
}

impl From<reqwest::Error> for RecordStoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RecordStoreError::Decode(err.to_string())
        } else {
            RecordStoreError::Request(err.to_string())
        }
    }
}

/// Operations the two-tier account store needs from the remote side
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    async fn list_records(&self, params: ListParams) -> Result<Vec<Record>, RecordStoreError>;

    async fn get_record(&self, id: &str) -> Result<Record, RecordStoreError>;

    async fn create_record(&self, fields: RecordFields) -> Result<Record, RecordStoreError>;

    /// Partial update: only the supplied fields change
    async fn update_record(&self, id: &str, fields: RecordFields)
        -> Result<Record, RecordStoreError>;

    async fn delete_record(&self, id: &str) -> Result<(), RecordStoreError>;
}

/// Connection settings for [`HttpRecordStore`]
#[derive(Debug, Clone)]
pub struct RecordStoreSettings {
    pub api_url: String,
    pub api_key: String,
    pub base_id: String,
    pub table: String,
    pub timeout: Duration,
}

#[derive(Deserialize)]
struct RecordPage {
    records: Vec<Record>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Serialize)]
struct FieldsBody {
    fields: RecordFields,
}

/// HTTP client for the hosted record store
pub struct HttpRecordStore {
    client: reqwest::Client,
    settings: RecordStoreSettings,
}

impl HttpRecordStore {
    pub fn new(settings: RecordStoreSettings) -> Result<Self, RecordStoreError> {
        if settings.api_key.is_empty() {
            return Err(RecordStoreError::Request("api key is required".to_string()));
        }
        if settings.base_id.is_empty() {
            return Err(RecordStoreError::Request("base id is required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self { client, settings })
    }

    fn table_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.settings.api_url.trim_end_matches('/'),
            self.settings.base_id,
            self.settings.table
        )
    }

    /// Record ids are a single alphanumeric path segment
    fn record_url(&self, id: &str) -> Result<reqwest::Url, RecordStoreError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RecordStoreError::InvalidId(id.to_string()));
        }

        let mut url = reqwest::Url::parse(&self.table_url())
            .map_err(|e| RecordStoreError::Request(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| RecordStoreError::Request("record store url cannot have a path".to_string()))?
            .push(id);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RecordStoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RecordStoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn list_records(&self, params: ListParams) -> Result<Vec<Record>, RecordStoreError> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(formula) = &params.filter_by_formula {
                query.push(("filterByFormula", formula.clone()));
            }
            if let Some(size) = params.page_size {
                query.push(("pageSize", size.to_string()));
            }
            if let Some(offset) = &offset {
                query.push(("offset", offset.clone()));
            }

            let response = self
                .client
                .get(self.table_url())
                .bearer_auth(&self.settings.api_key)
                .query(&query)
                .send()
                .await?;
            let page: RecordPage = Self::check(response).await?.json().await?;
            records.extend(page.records);

            // A page size caps the result to a single page
            match page.offset {
                Some(next) if params.page_size.is_none() => offset = Some(next),
                _ => break,
            }
        }

        debug!("Listed {} records from {}", records.len(), self.settings.table);
        Ok(records)
    }

    async fn get_record(&self, id: &str) -> Result<Record, RecordStoreError> {
        let response = self
            .client
            .get(self.record_url(id)?)
            .bearer_auth(&self.settings.api_key)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn create_record(&self, fields: RecordFields) -> Result<Record, RecordStoreError> {
        let response = self
            .client
            .post(self.table_url())
            .bearer_auth(&self.settings.api_key)
            .json(&FieldsBody { fields })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_record(
        &self,
        id: &str,
        fields: RecordFields,
    ) -> Result<Record, RecordStoreError> {
        let response = self
            .client
            .patch(self.record_url(id)?)
            .bearer_auth(&self.settings.api_key)
            .json(&FieldsBody { fields })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete_record(&self, id: &str) -> Result<(), RecordStoreError> {
        let response = self
            .client
            .delete(self.record_url(id)?)
            .bearer_auth(&self.settings.api_key)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Escape a value for use inside a single-quoted formula string
pub fn escape_formula_value(value: &str) -> String {
    value.replace('\'', "''")
}

/// Formula matching an email case-insensitively
pub fn email_formula(email: &str) -> String {
    format!(
        "LOWER({{{}}}) = '{}'",
        FIELD_EMAIL,
        escape_formula_value(&normalize_email(email))
    )
}

/// Formula matching a verification token exactly
pub fn verification_token_formula(token: &str) -> String {
    format!(
        "{{{}}} = '{}'",
        FIELD_VERIFICATION_TOKEN,
        escape_formula_value(token)
    )
}

fn string_field<'a>(fields: &'a RecordFields, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn time_field(fields: &RecordFields, name: &str) -> Option<DateTime<Utc>> {
    string_field(fields, name)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Map a remote record to an account
///
/// Missing role means User and missing status means Pending. Records without
/// an email, or with an unknown role or status, are rejected.
pub fn account_from_record(record: &Record) -> Result<Account, String> {
    let fields = &record.fields;

    let email = string_field(fields, FIELD_EMAIL)
        .map(normalize_email)
        .ok_or_else(|| format!("record {} has no email", record.id))?;
    let role = match string_field(fields, FIELD_ROLE) {
        Some(role) => role.parse::<Role>()?,
        None => Role::User,
    };
    let status = match string_field(fields, FIELD_STATUS) {
        Some(status) => status.parse::<AccountStatus>()?,
        None => AccountStatus::Pending,
    };

    let created_at = time_field(fields, FIELD_CREATED_AT)
        .or_else(|| {
            record
                .created_time
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
        })
        .unwrap_or_else(Utc::now);
    let updated_at = time_field(fields, FIELD_UPDATED_AT).unwrap_or(created_at);

    Ok(Account {
        id: record.id.clone(),
        email,
        password_hash: string_field(fields, FIELD_PASSWORD).unwrap_or_default().to_string(),
        role,
        status,
        verification_token: string_field(fields, FIELD_VERIFICATION_TOKEN).map(str::to_string),
        created_at,
        updated_at,
    })
}

/// Map a batch of records, skipping the ones that do not describe an account
pub fn accounts_from_records(records: &[Record]) -> Vec<Account> {
    records
        .iter()
        .filter_map(|record| match account_from_record(record) {
            Ok(account) => Some(account),
            Err(e) => {
                warn!("Skipping unmappable account record: {}", e);
                None
            }
        })
        .collect()
}

/// Field map for creating a record from an account
pub fn record_fields_for_create(account: &Account) -> RecordFields {
    let mut fields = RecordFields::new();
    fields.insert(FIELD_EMAIL.into(), Value::from(account.email.clone()));
    fields.insert(FIELD_PASSWORD.into(), Value::from(account.password_hash.clone()));
    fields.insert(FIELD_ROLE.into(), Value::from(account.role.as_str()));
    fields.insert(FIELD_STATUS.into(), Value::from(account.status.as_str()));
    if let Some(token) = &account.verification_token {
        fields.insert(FIELD_VERIFICATION_TOKEN.into(), Value::from(token.clone()));
    }
    fields.insert(FIELD_CREATED_AT.into(), Value::from(account.created_at.to_rfc3339()));
    fields.insert(FIELD_UPDATED_AT.into(), Value::from(account.updated_at.to_rfc3339()));
    fields
}

/// Field map for a partial update; the email field is never sent
pub fn record_fields_for_update(account: &Account) -> RecordFields {
    let mut fields = RecordFields::new();
    if !account.password_hash.is_empty() {
        fields.insert(FIELD_PASSWORD.into(), Value::from(account.password_hash.clone()));
    }
    fields.insert(FIELD_ROLE.into(), Value::from(account.role.as_str()));
    fields.insert(FIELD_STATUS.into(), Value::from(account.status.as_str()));
    fields.insert(
        FIELD_VERIFICATION_TOKEN.into(),
        Value::from(account.verification_token.clone().unwrap_or_default()),
    );
    fields.insert(FIELD_UPDATED_AT.into(), Value::from(account.updated_at.to_rfc3339()));
    fields
}

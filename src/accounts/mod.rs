// Account persistence and administration
// In-memory store, remote record store client, two-tier store and /users handlers

pub mod error;
pub mod handlers;
pub mod models;
pub mod record_store;
pub mod remote;
pub mod repository;

pub use error::StoreError;
pub use models::{
    normalize_email, Account, AccountPatch, AccountStatus, AccountView, CreateAccountRequest,
    NewAccount, UpdateAccountRequest,
};
pub use record_store::{HttpRecordStore, RecordStore, RecordStoreSettings};
pub use remote::TieredAccountStore;
pub use repository::{AccountStore, InMemoryAccountStore};

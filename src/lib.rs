// Cashfocus - Core Library
// Transactional ledger over SQLite, shared by the CLI and tests

pub mod config;
pub mod entities;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod provision;
pub mod schema;
pub mod store;

// Re-export commonly used types
pub use config::{LedgerConfig, RetryPolicy};
pub use entities::{Account, AccountStatus, AccountType, Tags, Transaction};
pub use error::{LedgerError, StoreError};
pub use ledger::LedgerStore;
pub use money::{Amount, AmountError};
pub use provision::{
    default_accounts, load_accounts_csv, parse_accounts_csv, reset_collections,
    seed_accounts, seed_default_accounts,
};
pub use schema::{SchemaValidator, ValidationError, ValidationResult};
pub use store::{DocumentStore, SqliteStore, UnitOfWork};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Error taxonomy for the ledger and its storage layer

use crate::entities::AccountStatus;
use crate::money::Amount;
use crate::schema::ValidationError;
use crate::store::TRANSACTIONS_COLLECTION;
use thiserror::Error;

/// Failures raised by a [`crate::store::DocumentStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer holds the database; safe to retry
    #[error("database is busy: {0}")]
    Busy(String),

    #[error("database error: {0}")]
    Database(rusqlite::Error),

    /// A document could not be encoded for storage
    #[error("cannot encode document for {collection}: {message}")]
    Codec {
        collection: &'static str,
        message: String,
    },

    /// An update targeted a key that does not exist
    #[error("no document with key {key} in {collection}")]
    Missing {
        collection: &'static str,
        key: String,
    },
}

impl StoreError {
    /// Whether the whole unit of work may be retried from scratch
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Busy(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref code, _)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                StoreError::Busy(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Codec {
            collection: TRANSACTIONS_COLLECTION,
            message: err.to_string(),
        }
    }
}

/// Errors returned by [`crate::ledger::LedgerStore`]
///
/// The first five variants are caller-input errors: reported at once, never
/// retried, never leave a partial mutation behind.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("cannot transfer from account {0} to itself")]
    SameAccountTransfer(String),

    #[error("invalid amount {0}: must be strictly positive")]
    InvalidAmount(Amount),

    #[error("insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: String,
        balance: Amount,
        requested: Amount,
    },

    #[error("account {account_id} is {status}, not active")]
    AccountNotActive {
        account_id: String,
        status: AccountStatus,
    },

    /// Infrastructure failure after the retry budget or the caller's
    /// deadline ran out. Nothing was persisted; the caller may try again.
    #[error("transfer aborted after {attempts} attempt(s): {reason}")]
    TransferAborted {
        attempts: u32,
        reason: String,
        #[source]
        source: Option<StoreError>,
    },

    #[error("schema validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("account already exists: {0}")]
    DuplicateAccount(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// True for the caller-input variants
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::AccountNotFound(_)
                | LedgerError::SameAccountTransfer(_)
                | LedgerError::InvalidAmount(_)
                | LedgerError::InsufficientFunds { .. }
                | LedgerError::AccountNotActive { .. }
                | LedgerError::Validation(_)
        )
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

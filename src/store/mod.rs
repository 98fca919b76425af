// Storage - document collections with multi-document atomic commit
//
// The ledger needs four primitives from whatever engine sits underneath:
// point lookup by key, update by key, append, and grouping those into one
// atomic isolated unit of work.

mod sqlite;

pub use sqlite::{setup_database, SqliteStore, ACCOUNTS_COLLECTION, TRANSACTIONS_COLLECTION};

use crate::entities::{Account, Transaction};
use crate::error::{LedgerError, StoreError};
use crate::money::Amount;

/// Operations available inside one unit of work.
///
/// Reads see every write made earlier in the same unit and nothing
/// uncommitted from other units.
pub trait UnitOfWork {
    /// Point lookup of an account by key
    fn find_account(&mut self, account_id: &str) -> Result<Option<Account>, StoreError>;

    /// Overwrite the balance of an existing account
    fn update_balance(&mut self, account_id: &str, balance: Amount) -> Result<(), StoreError>;

    /// Append a new account document
    fn insert_account(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Append a new transaction document
    fn append_transaction(&mut self, tx: &Transaction) -> Result<(), StoreError>;
}

/// A document store able to run atomic units of work
pub trait DocumentStore: Send + Sync {
    /// Run `work` as one atomic, isolated unit.
    ///
    /// `Ok` commits every write the closure made; `Err` rolls all of them
    /// back. A failed commit is reported as [`LedgerError::Storage`].
    fn atomically<T, F>(&self, work: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, LedgerError>;

    /// Committed state of one account, outside any unit of work
    fn get_account(&self, account_id: &str) -> Result<Option<Account>, StoreError>;

    /// All accounts in insertion order
    fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// All transaction records, oldest first
    fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError>;

    /// Drop both collections and recreate them empty
    fn reset(&self) -> Result<(), StoreError>;
}

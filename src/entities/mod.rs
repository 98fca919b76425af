// Entity Models
//
// The two document kinds kept by the ledger:
// - Account: keyed by account_id, mutable balance
// - Transaction: append-only transfer record

pub mod account;
pub mod transaction;

pub use account::{Account, AccountStatus, AccountType, UnknownVariant};
pub use transaction::{Tags, Transaction, TRANSACTION_ID_PREFIX};

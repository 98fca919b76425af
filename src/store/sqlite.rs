use super::{DocumentStore, UnitOfWork};
use crate::entities::{Account, Tags, Transaction};
use crate::error::{LedgerError, StoreError};
use crate::money::Amount;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const ACCOUNTS_COLLECTION: &str = "accounts";
pub const TRANSACTIONS_COLLECTION: &str = "transactions";

const ACCOUNT_COLUMNS: &str =
    "account_id, name, balance_minor, account_type, creation_date, status";

const TRANSACTION_COLUMNS: &str = "transaction_id, from_account, to_account, amount_minor,
     transaction_date, description, category, tags";

/// Configure the connection and create both collections if missing
pub fn setup_database(conn: &Connection) -> rusqlite::Result<()> {
    // WAL lets readers proceed while a transfer holds the write lock.
    // In-memory databases answer "memory" and stay as they are.
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", true)?;

    create_collections(conn)
}

fn create_collections(conn: &Connection) -> rusqlite::Result<()> {
    // ==========================================================================
    // Accounts (schema-validated: mirrors the account validator)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            account_id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            balance_minor INTEGER NOT NULL CHECK (balance_minor >= 0),
            account_type TEXT NOT NULL
                CHECK (account_type IN ('checking', 'savings', 'investment', 'credit')),
            creation_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'closed', 'suspended'))
        )",
        [],
    )?;

    // ==========================================================================
    // Transactions (append-only transfer history)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT UNIQUE NOT NULL,
            from_account TEXT NOT NULL REFERENCES accounts(account_id),
            to_account TEXT NOT NULL REFERENCES accounts(account_id),
            amount_minor INTEGER NOT NULL CHECK (amount_minor > 0),
            transaction_date TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '{}'
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_from ON transactions(from_account)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_to ON transactions(to_account)",
        [],
    )?;

    Ok(())
}

fn drop_collections(conn: &Connection) -> rusqlite::Result<()> {
    // transactions first: it references accounts
    conn.execute_batch(
        "DROP TABLE IF EXISTS transactions;
         DROP TABLE IF EXISTS accounts;",
    )
}

fn timestamp_to_sql(ts: &DateTime<Utc>) -> String {
    // Fixed width so stored timestamps also sort as text
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let account_type: String = row.get(3)?;
    let creation_date: String = row.get(4)?;
    let status: String = row.get(5)?;

    Ok(Account {
        account_id: row.get(0)?,
        name: row.get(1)?,
        balance: Amount::from_minor_units(row.get(2)?),
        account_type: account_type.parse().map_err(|e| conversion_error(3, e))?,
        creation_date: parse_timestamp(4, &creation_date)?,
        status: status.parse().map_err(|e| conversion_error(5, e))?,
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let transaction_date: String = row.get(4)?;
    let tags_json: String = row.get(7)?;
    let tags: Tags = serde_json::from_str(&tags_json).map_err(|e| conversion_error(7, e))?;

    Ok(Transaction {
        transaction_id: row.get(0)?,
        from_account: row.get(1)?,
        to_account: row.get(2)?,
        amount: Amount::from_minor_units(row.get(3)?),
        transaction_date: parse_timestamp(4, &transaction_date)?,
        description: row.get(5)?,
        category: row.get(6)?,
        tags,
    })
}

fn select_account(conn: &Connection, account_id: &str) -> Result<Option<Account>, StoreError> {
    let sql = format!("SELECT {} FROM accounts WHERE account_id = ?1", ACCOUNT_COLUMNS);
    let account = conn
        .prepare_cached(&sql)?
        .query_row(params![account_id], account_from_row)
        .optional()?;
    Ok(account)
}

// ============================================================================
// UNIT OF WORK
// ============================================================================

/// One open SQLite transaction. Dropping it without commit rolls back.
struct SqliteUnit<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl UnitOfWork for SqliteUnit<'_> {
    fn find_account(&mut self, account_id: &str) -> Result<Option<Account>, StoreError> {
        select_account(&self.tx, account_id)
    }

    fn update_balance(&mut self, account_id: &str, balance: Amount) -> Result<(), StoreError> {
        let changed = self.tx.execute(
            "UPDATE accounts SET balance_minor = ?1 WHERE account_id = ?2",
            params![balance.minor_units(), account_id],
        )?;

        if changed == 0 {
            return Err(StoreError::Missing {
                collection: ACCOUNTS_COLLECTION,
                key: account_id.to_string(),
            });
        }
        Ok(())
    }

    fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        self.tx.execute(
            "INSERT INTO accounts (
                account_id, name, balance_minor, account_type, creation_date, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                account.account_id,
                account.name,
                account.balance.minor_units(),
                account.account_type.as_str(),
                timestamp_to_sql(&account.creation_date),
                account.status.as_str(),
            ],
        )?;
        Ok(())
    }

    fn append_transaction(&mut self, tx: &Transaction) -> Result<(), StoreError> {
        let tags_json = serde_json::to_string(&tx.tags)?;

        self.tx.execute(
            "INSERT INTO transactions (
                transaction_id, from_account, to_account, amount_minor,
                transaction_date, description, category, tags
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tx.transaction_id,
                tx.from_account,
                tx.to_account,
                tx.amount.minor_units(),
                timestamp_to_sql(&tx.transaction_date),
                tx.description,
                tx.category,
                tags_json,
            ],
        )?;
        Ok(())
    }
}

// ============================================================================
// STORE
// ============================================================================

/// SQLite-backed document store: one table per collection.
///
/// Units of work run as `BEGIN IMMEDIATE` transactions, so the write lock is
/// taken before the first read and every unit sees the latest committed
/// balances. Handles on the same file are serialized by SQLite; threads
/// sharing one handle are serialized by the connection mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database file
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        setup_database(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database, gone when the store is dropped
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Close the connection, reporting anything SQLite could not flush
    pub fn close(self) -> Result<(), StoreError> {
        let conn = self.conn.into_inner().unwrap_or_else(PoisonError::into_inner);
        conn.close().map_err(|(_, err)| StoreError::from(err))
    }

    /// A panic inside a unit of work poisons the mutex, but the open SQLite
    /// transaction was already rolled back when it unwound, so the
    /// connection is still consistent.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentStore for SqliteStore {
    fn atomically<T, F>(&self, work: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, LedgerError>,
    {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        let mut unit = SqliteUnit { tx };
        let value = work(&mut unit)?;
        unit.tx.commit().map_err(StoreError::from)?;

        Ok(value)
    }

    fn get_account(&self, account_id: &str) -> Result<Option<Account>, StoreError> {
        let conn = self.lock();
        select_account(&conn, account_id)
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let conn = self.lock();
        let sql = format!("SELECT {} FROM accounts ORDER BY rowid", ACCOUNT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let accounts = stmt
            .query_map([], account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        let conn = self.lock();
        let sql = format!("SELECT {} FROM transactions ORDER BY id", TRANSACTION_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let transactions = stmt
            .query_map([], transaction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    fn reset(&self) -> Result<(), StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        drop_collections(&tx)?;
        create_collections(&tx)?;
        tx.commit()?;
        Ok(())
    }
}

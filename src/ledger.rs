// 🏦 Ledger Store - atomic transfers between accounts
//
// Every transfer is one unit of work: re-read both accounts, validate,
// debit, credit, append the record, commit. Transient storage conflicts
// restart the whole unit; anything else is reported as-is.

use crate::config::{LedgerConfig, RetryPolicy};
use crate::entities::{Account, Tags, Transaction};
use crate::error::LedgerError;
use crate::money::Amount;
use crate::schema::SchemaValidator;
use crate::store::{DocumentStore, SqliteStore, UnitOfWork};
use chrono::Utc;
use rust_decimal::Decimal;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Borrowed view of one transfer's inputs, reused across attempts
struct TransferRequest<'a> {
    from: &'a str,
    to: &'a str,
    amount: Amount,
    description: &'a str,
    category: &'a str,
    tags: &'a Tags,
}

/// Handle over the `accounts` and `transactions` collections.
///
/// Constructed explicitly and passed to callers; safe to share across
/// threads behind an `Arc`.
pub struct LedgerStore<S: DocumentStore = SqliteStore> {
    store: S,
    retry: RetryPolicy,
    validator: SchemaValidator,
}

impl LedgerStore<SqliteStore> {
    /// Open (or create) the database file named by `config`
    pub fn open(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let store = SqliteStore::open(&config.database_path, config.busy_timeout)?;
        info!(path = %config.database_path.display(), "opened ledger database");
        Ok(Self::new(store, config.retry))
    }

    /// Throwaway ledger backed by a private in-memory database
    pub fn open_in_memory(retry: RetryPolicy) -> Result<Self, LedgerError> {
        Ok(Self::new(SqliteStore::open_in_memory()?, retry))
    }

    /// Release the underlying connection
    pub fn close(self) -> Result<(), LedgerError> {
        self.store.close()?;
        debug!("closed ledger database");
        Ok(())
    }
}

impl<S: DocumentStore> LedgerStore<S> {
    pub fn new(store: S, retry: RetryPolicy) -> Self {
        LedgerStore {
            store,
            retry,
            validator: SchemaValidator::new(),
        }
    }

    // ========================================================================
    // TRANSFERS
    // ========================================================================

    /// Move `amount` from one active account to another.
    ///
    /// On success both balances and the new record are committed together.
    /// On any error nothing is changed.
    pub fn transfer(
        &self,
        from_account_id: &str,
        to_account_id: &str,
        amount: Amount,
        description: &str,
        category: &str,
        tags: Tags,
    ) -> Result<Transaction, LedgerError> {
        let request = TransferRequest {
            from: from_account_id,
            to: to_account_id,
            amount,
            description,
            category,
            tags: &tags,
        };
        self.execute_transfer(&request, None)
    }

    /// [`LedgerStore::transfer`] bounded by a caller deadline.
    ///
    /// When the deadline passes before commit the transfer is abandoned with
    /// [`LedgerError::TransferAborted`] and leaves no trace.
    #[allow(clippy::too_many_arguments)]
    pub fn transfer_with_timeout(
        &self,
        from_account_id: &str,
        to_account_id: &str,
        amount: Amount,
        description: &str,
        category: &str,
        tags: Tags,
        timeout: Duration,
    ) -> Result<Transaction, LedgerError> {
        let request = TransferRequest {
            from: from_account_id,
            to: to_account_id,
            amount,
            description,
            category,
            tags: &tags,
        };
        self.execute_transfer(&request, Some(Instant::now() + timeout))
    }

    #[tracing::instrument(
        name = "transfer",
        skip_all,
        fields(from = request.from, to = request.to, amount = %request.amount)
    )]
    fn execute_transfer(
        &self,
        request: &TransferRequest<'_>,
        deadline: Option<Instant>,
    ) -> Result<Transaction, LedgerError> {
        // Pure input checks first: no storage access needed
        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(request.amount));
        }
        if request.from == request.to {
            return Err(LedgerError::SameAccountTransfer(request.from.to_string()));
        }

        let mut attempts_made = 0;
        let result = self.with_retry(deadline, |attempt| {
            attempts_made = attempt;
            debug!(attempt, "starting unit of work");
            self.store
                .atomically(|unit| self.apply_transfer(unit, request, deadline, attempt))
        });

        // Whatever storage failure survives the retry loop is an abort
        let result = result.map_err(|err| match err {
            LedgerError::Storage(source) => LedgerError::TransferAborted {
                attempts: attempts_made,
                reason: source.to_string(),
                source: Some(source),
            },
            other => other,
        });

        match &result {
            Ok(tx) => info!(transaction_id = %tx.transaction_id, "transfer committed"),
            Err(err) if err.is_rejection() => info!(error = %err, "transfer rejected"),
            Err(err) => warn!(error = %err, "transfer aborted"),
        }
        result
    }

    /// Body of one attempt, run inside the unit of work
    fn apply_transfer(
        &self,
        unit: &mut dyn UnitOfWork,
        request: &TransferRequest<'_>,
        deadline: Option<Instant>,
        attempt: u32,
    ) -> Result<Transaction, LedgerError> {
        // Fresh reads: never trust a balance fetched outside this unit
        let source = unit
            .find_account(request.from)?
            .ok_or_else(|| LedgerError::AccountNotFound(request.from.to_string()))?;
        let destination = unit
            .find_account(request.to)?
            .ok_or_else(|| LedgerError::AccountNotFound(request.to.to_string()))?;

        ensure_active(&source)?;
        ensure_active(&destination)?;

        if !source.can_cover(request.amount) {
            return Err(LedgerError::InsufficientFunds {
                account_id: source.account_id,
                balance: source.balance,
                requested: request.amount,
            });
        }

        let debited = source
            .balance
            .checked_sub(request.amount)
            .ok_or(LedgerError::InvalidAmount(request.amount))?;
        let credited = destination
            .balance
            .checked_add(request.amount)
            .ok_or(LedgerError::InvalidAmount(request.amount))?;

        let record = Transaction::new(
            request.from,
            request.to,
            request.amount,
            request.description,
            request.category,
            request.tags.clone(),
            Utc::now(),
        );
        self.validator
            .validate_transaction(&record)
            .map_err(LedgerError::Validation)?;

        if deadline_passed(deadline) {
            return Err(deadline_exceeded(attempt));
        }

        unit.update_balance(request.from, debited)?;
        unit.update_balance(request.to, credited)?;
        unit.append_transaction(&record)?;

        Ok(record)
    }

    /// Run `attempt_fn` until it stops failing transiently, the retry budget
    /// is spent, or the deadline passes.
    fn with_retry<T, F>(&self, deadline: Option<Instant>, mut attempt_fn: F) -> Result<T, LedgerError>
    where
        F: FnMut(u32) -> Result<T, LedgerError>,
    {
        let mut attempt = 0;
        loop {
            if deadline_passed(deadline) {
                return Err(deadline_exceeded(attempt));
            }
            attempt += 1;

            match attempt_fn(attempt) {
                Err(LedgerError::Storage(err)) if err.is_transient() => {
                    if attempt >= self.retry.max_attempts {
                        return Err(LedgerError::TransferAborted {
                            attempts: attempt,
                            reason: err.to_string(),
                            source: Some(err),
                        });
                    }

                    let mut delay = self.retry.backoff(attempt);
                    if let Some(deadline) = deadline {
                        delay = delay.min(deadline.saturating_duration_since(Instant::now()));
                    }
                    warn!(attempt, ?delay, error = %err, "transient storage conflict, retrying");
                    thread::sleep(delay);
                }
                other => return other,
            }
        }
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Committed state of one account
    pub fn account(&self, account_id: &str) -> Result<Option<Account>, LedgerError> {
        Ok(self.store.get_account(account_id)?)
    }

    /// Committed balance of one account
    pub fn balance(&self, account_id: &str) -> Result<Amount, LedgerError> {
        self.account(account_id)?
            .map(|a| a.balance)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    /// All accounts in the order they were opened
    pub fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(self.store.list_accounts()?)
    }

    /// Transfer history, oldest first
    pub fn transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.store.list_transactions()?)
    }

    /// Transfers in or out of one account, oldest first
    pub fn account_history(&self, account_id: &str) -> Result<Vec<Transaction>, LedgerError> {
        if self.account(account_id)?.is_none() {
            return Err(LedgerError::AccountNotFound(account_id.to_string()));
        }
        Ok(self
            .transactions()?
            .into_iter()
            .filter(|tx| tx.involves(account_id))
            .collect())
    }

    pub fn transaction_count(&self) -> Result<usize, LedgerError> {
        Ok(self.transactions()?.len())
    }

    /// Sum of all balances. Transfers never change it.
    pub fn total_balance(&self) -> Result<Decimal, LedgerError> {
        Ok(self
            .accounts()?
            .iter()
            .map(|a| a.balance.to_decimal())
            .sum())
    }

    // ========================================================================
    // PROVISIONING
    // ========================================================================

    /// Insert one validated account
    pub fn open_account(&self, account: Account) -> Result<Account, LedgerError> {
        let mut opened = self.open_accounts(vec![account])?;
        Ok(opened.remove(0))
    }

    /// Insert a batch of accounts atomically: either all of them or none.
    ///
    /// Every account is schema-validated before the store is touched; the
    /// errors of all invalid accounts are reported together.
    pub fn open_accounts(&self, accounts: Vec<Account>) -> Result<Vec<Account>, LedgerError> {
        let errors: Vec<_> = accounts
            .iter()
            .filter_map(|a| self.validator.validate_account(a).err())
            .flatten()
            .collect();
        if !errors.is_empty() {
            return Err(LedgerError::Validation(errors));
        }

        self.store.atomically(|unit| {
            for account in &accounts {
                if unit.find_account(&account.account_id)?.is_some() {
                    return Err(LedgerError::DuplicateAccount(account.account_id.clone()));
                }
                unit.insert_account(account)?;
            }
            Ok(())
        })?;

        info!(count = accounts.len(), "opened accounts");
        Ok(accounts)
    }

    /// Drop both collections and start empty
    pub fn reset(&self) -> Result<(), LedgerError> {
        self.store.reset()?;
        info!("dropped and recreated accounts and transactions collections");
        Ok(())
    }
}

fn ensure_active(account: &Account) -> Result<(), LedgerError> {
    if account.is_active() {
        Ok(())
    } else {
        Err(LedgerError::AccountNotActive {
            account_id: account.account_id.clone(),
            status: account.status,
        })
    }
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

fn deadline_exceeded(attempts: u32) -> LedgerError {
    LedgerError::TransferAborted {
        attempts,
        reason: "deadline exceeded".to_string(),
        source: None,
    }
}

// ============================================================================
// TESTS
// ============================================================================

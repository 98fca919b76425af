// 🌱 Provisioning - reset collections and seed accounts
//
// Seed accounts come either from the built-in sample pair or from a CSV file
// with header `account_id,name,balance,account_type[,status]`.

use crate::entities::{Account, AccountStatus, AccountType};
use crate::ledger::LedgerStore;
use crate::money::Amount;
use crate::store::DocumentStore;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// One CSV row before its fields are parsed into domain types
#[derive(Debug, Deserialize)]
struct AccountRecord {
    account_id: String,
    name: String,
    balance: String,
    account_type: String,
    #[serde(default)]
    status: Option<String>,
}

impl AccountRecord {
    fn into_account(self, line: u64) -> Result<Account> {
        let balance: Amount = self
            .balance
            .parse()
            .with_context(|| format!("line {}: invalid balance {:?}", line, self.balance))?;
        let account_type: AccountType = self
            .account_type
            .parse()
            .with_context(|| format!("line {}: invalid account_type", line))?;
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => AccountStatus::Active,
            Some(raw) => raw
                .parse()
                .with_context(|| format!("line {}: invalid status", line))?,
        };

        Ok(Account::new(self.account_id.trim(), self.name.trim(), account_type, balance).with_status(status))
    }
}

/// The two sample accounts every fresh ledger starts with
pub fn default_accounts() -> Vec<Account> {
    vec![
        Account::new(
            "12345",
            "Primary Checking",
            AccountType::Checking,
            Amount::from_minor_units(150_000),
        ),
        Account::new(
            "67890",
            "Emergency Savings",
            AccountType::Savings,
            Amount::from_minor_units(300_000),
        ),
    ]
}

/// Drop and recreate the `accounts` and `transactions` collections
pub fn reset_collections<S: DocumentStore>(ledger: &LedgerStore<S>) -> Result<()> {
    ledger.reset().context("Failed to reset collections")
}

/// Reset, then insert `accounts` as one atomic batch
pub fn seed_accounts<S: DocumentStore>(ledger: &LedgerStore<S>, accounts: Vec<Account>) -> Result<Vec<Account>> {
    reset_collections(ledger)?;
    let seeded = ledger
        .open_accounts(accounts)
        .context("Failed to insert seed accounts")?;
    info!(count = seeded.len(), "seeded accounts");
    Ok(seeded)
}

/// Reset, then insert [`default_accounts`]
pub fn seed_default_accounts<S: DocumentStore>(ledger: &LedgerStore<S>) -> Result<Vec<Account>> {
    seed_accounts(ledger, default_accounts())
}

/// Parse seed accounts from any CSV source
pub fn parse_accounts_csv<R: Read>(reader: R) -> Result<Vec<Account>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut accounts = Vec::new();
    for (index, result) in rdr.deserialize::<AccountRecord>().enumerate() {
        // Header is line 1
        let line = index as u64 + 2;
        let record = result.with_context(|| format!("line {}: failed to deserialize account", line))?;
        accounts.push(record.into_account(line)?);
    }

    Ok(accounts)
}

/// Parse seed accounts from a CSV file
pub fn load_accounts_csv(csv_path: &Path) -> Result<Vec<Account>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    let accounts = parse_accounts_csv(file)?;
    info!(path = %csv_path.display(), count = accounts.len(), "loaded accounts from CSV");
    Ok(accounts)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::entities::Tags;
    use crate::error::LedgerError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn memory_ledger() -> LedgerStore {
        LedgerStore::open_in_memory(RetryPolicy::default()).unwrap()
    }

    #[test]
    fn test_default_accounts() {
        let accounts = default_accounts();
        assert_eq!(accounts.len(), 2);

        assert_eq!(accounts[0].account_id, "12345");
        assert_eq!(accounts[0].name, "Primary Checking");
        assert_eq!(accounts[0].account_type, AccountType::Checking);
        assert_eq!(accounts[0].balance.to_string(), "1500.00");

        assert_eq!(accounts[1].account_id, "67890");
        assert_eq!(accounts[1].account_type, AccountType::Savings);
        assert_eq!(accounts[1].balance.to_string(), "3000.00");

        assert!(accounts.iter().all(|a| a.is_active()));
    }

    #[test]
    fn test_seed_replaces_previous_state() {
        let ledger = memory_ledger();
        seed_default_accounts(&ledger).unwrap();
        ledger
            .transfer("12345", "67890", "10.00".parse().unwrap(), "", "transfer", Tags::new())
            .unwrap();

        // Seeding again starts from a clean slate
        seed_default_accounts(&ledger).unwrap();

        assert_eq!(ledger.accounts().unwrap().len(), 2);
        assert_eq!(ledger.transaction_count().unwrap(), 0);
        assert_eq!(ledger.balance("12345").unwrap().to_string(), "1500.00");
    }

    #[test]
    fn test_parse_accounts_csv() {
        let data = "\
account_id,name,balance,account_type,status
A1,Main Checking,1500.00,checking,active
A2, Brokerage ,250.5,Investment,
A3,Old Card,0,credit,closed
";
        let accounts = parse_accounts_csv(data.as_bytes()).unwrap();

        assert_eq!(accounts.len(), 3);
        assert_eq!(accounts[1].name, "Brokerage");
        assert_eq!(accounts[1].balance.to_string(), "250.50");
        assert_eq!(accounts[1].account_type, AccountType::Investment);
        assert_eq!(accounts[1].status, AccountStatus::Active);
        assert_eq!(accounts[2].status, AccountStatus::Closed);
    }

    #[test]
    fn test_status_column_is_optional() {
        let data = "account_id,name,balance,account_type\nB1,Savings,10.00,savings\n";
        let accounts = parse_accounts_csv(data.as_bytes()).unwrap();
        assert_eq!(accounts[0].status, AccountStatus::Active);
    }

    #[test]
    fn test_bad_row_reports_line() {
        let data = "account_id,name,balance,account_type\nB1,Savings,10.00,savings\nB2,Weird,1.00,crypto\n";
        let err = parse_accounts_csv(data.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"), "got: {:#}", err);
    }

    #[test]
    fn test_too_precise_balance_rejected() {
        let data = "account_id,name,balance,account_type\nB1,Savings,10.001,savings\n";
        assert!(parse_accounts_csv(data.as_bytes()).is_err());
    }

    #[test]
    fn test_oversized_balance_is_an_error() {
        let data = "account_id,name,balance,account_type\nB1,Whale,1000000000000000000000000000,savings\n";
        let err = parse_accounts_csv(data.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("out of range"), "got: {:#}", err);
    }

    #[test]
    fn test_load_and_seed_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "account_id,name,balance,account_type").unwrap();
        writeln!(file, "C1,Checking,100.00,checking").unwrap();
        writeln!(file, "C2,Savings,50.00,savings").unwrap();

        let accounts = load_accounts_csv(file.path()).unwrap();
        let ledger = memory_ledger();
        seed_accounts(&ledger, accounts).unwrap();

        assert_eq!(ledger.total_balance().unwrap().to_string(), "150.00");
    }

    #[test]
    fn test_invalid_seed_rows_insert_nothing() {
        let data = "account_id,name,balance,account_type\nD1,Good,1.00,checking\nD2,,1.00,savings\n";
        let accounts = parse_accounts_csv(data.as_bytes()).unwrap();

        let ledger = memory_ledger();
        let err = seed_accounts(&ledger, accounts).unwrap_err();

        assert!(matches!(err.downcast_ref::<LedgerError>(), Some(LedgerError::Validation(_))));
        assert!(ledger.accounts().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = load_accounts_csv(Path::new("/definitely/not/here.csv"));
        assert!(result.is_err());
    }
}

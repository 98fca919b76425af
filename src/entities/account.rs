// 💳 Account Entity - keyed by account_id, balance kept in minor units
//
// Accounts are created at provisioning time. Afterwards only `transfer`
// touches the balance; status changes are administrative.

use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A string that did not name any known enum variant
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// ============================================================================
// ACCOUNT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Checking account (debit card, daily transactions)
    Checking,

    /// Savings account (interest-bearing)
    Savings,

    /// Investment account (brokerage, stocks, bonds)
    Investment,

    /// Credit account (credit line)
    Credit,
}

impl AccountType {
    pub const ALL: [AccountType; 4] = [
        AccountType::Checking,
        AccountType::Savings,
        AccountType::Investment,
        AccountType::Credit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Investment => "investment",
            AccountType::Credit => "credit",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "account type",
                value: s.to_string(),
            })
    }
}

// ============================================================================
// ACCOUNT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Closed,
    Suspended,
}

impl AccountStatus {
    pub const ALL: [AccountStatus; 3] = [
        AccountStatus::Active,
        AccountStatus::Closed,
        AccountStatus::Suspended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Closed => "closed",
            AccountStatus::Suspended => "suspended",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "account status",
                value: s.to_string(),
            })
    }
}

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

/// Account document
///
/// `account_id` is the unique key. `balance` must never go below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique key (e.g. "12345")
    pub account_id: String,

    /// Display name (e.g. "Primary Checking")
    pub name: String,

    /// Current balance
    pub balance: Amount,

    pub account_type: AccountType,

    pub creation_date: DateTime<Utc>,

    pub status: AccountStatus,
}

impl Account {
    /// Create a new active account, stamped with the current time
    pub fn new(
        account_id: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
        balance: Amount,
    ) -> Self {
        Account {
            account_id: account_id.into(),
            name: name.into(),
            balance,
            account_type,
            creation_date: Utc::now(),
            status: AccountStatus::Active,
        }
    }

    /// Builder-style status override, used when provisioning
    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Whether `amount` can be debited without going negative
    pub fn can_cover(&self, amount: Amount) -> bool {
        self.balance >= amount
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_account() -> Account {
        Account::new(
            "12345",
            "Primary Checking",
            AccountType::Checking,
            Amount::from_major(1500).unwrap(),
        )
    }

    #[test]
    fn test_account_creation() {
        let account = create_test_account();

        assert_eq!(account.account_id, "12345");
        assert_eq!(account.name, "Primary Checking");
        assert_eq!(account.account_type, AccountType::Checking);
        assert_eq!(account.balance.to_string(), "1500.00");
        assert_eq!(account.status, AccountStatus::Active);
        assert!(account.is_active());
    }

    #[test]
    fn test_with_status() {
        let account = create_test_account().with_status(AccountStatus::Suspended);
        assert!(!account.is_active());
    }

    #[test]
    fn test_can_cover() {
        let account = create_test_account();

        assert!(account.can_cover(Amount::from_major(1500).unwrap()));
        assert!(account.can_cover(Amount::from_major(500).unwrap()));
        assert!(!account.can_cover(Amount::from_minor_units(150_001)));
    }

    #[test]
    fn test_account_type_round_trip_strings() {
        for account_type in AccountType::ALL {
            let parsed: AccountType = account_type.as_str().parse().unwrap();
            assert_eq!(parsed, account_type);
        }

        assert_eq!("Savings".parse::<AccountType>().unwrap(), AccountType::Savings);

        let err = "brokerage".parse::<AccountType>().unwrap_err();
        assert_eq!(err.kind, "account type");
        assert_eq!(err.value, "brokerage");
    }

    #[test]
    fn test_account_status_parse() {
        assert_eq!("ACTIVE".parse::<AccountStatus>().unwrap(), AccountStatus::Active);
        assert_eq!(" closed ".parse::<AccountStatus>().unwrap(), AccountStatus::Closed);
        assert!("frozen".parse::<AccountStatus>().is_err());
        assert_eq!(AccountStatus::default(), AccountStatus::Active);
    }

    #[test]
    fn test_account_serializes_lowercase_enums() {
        let account = create_test_account();
        let json = serde_json::to_value(&account).unwrap();

        assert_eq!(json["account_type"], "checking");
        assert_eq!(json["status"], "active");
        assert_eq!(json["balance"], "1500.00");
    }
}

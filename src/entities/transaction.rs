// 🧾 Transaction Entity - immutable record of one completed transfer
//
// Created only as a side effect of a successful transfer, never edited.

use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form labels attached to a transfer (keys are unique)
pub type Tags = BTreeMap<String, String>;

/// Prefix of every generated transaction id
pub const TRANSACTION_ID_PREFIX: &str = "TX";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique id, see [`Transaction::generate_id`]
    pub transaction_id: String,

    /// Debited account key
    pub from_account: String,

    /// Credited account key
    pub to_account: String,

    /// Always strictly positive
    pub amount: Amount,

    pub transaction_date: DateTime<Utc>,

    pub description: String,

    /// e.g. "transfer"
    pub category: String,

    #[serde(default)]
    pub tags: Tags,
}

impl Transaction {
    /// Build a record stamped at `at` with a freshly generated id
    pub fn new(
        from_account: &str,
        to_account: &str,
        amount: Amount,
        description: &str,
        category: &str,
        tags: Tags,
        at: DateTime<Utc>,
    ) -> Self {
        Transaction {
            transaction_id: Self::generate_id(at),
            from_account: from_account.to_string(),
            to_account: to_account.to_string(),
            amount,
            transaction_date: at,
            description: description.to_string(),
            category: category.to_string(),
            tags,
        }
    }

    /// `TX` + UTC timestamp to the microsecond + `-` + 8 random hex chars.
    ///
    /// Sorts by time; two ids minted in the same microsecond still differ
    /// in the random suffix.
    pub fn generate_id(at: DateTime<Utc>) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}{}-{}",
            TRANSACTION_ID_PREFIX,
            at.format("%Y%m%d%H%M%S%6f"),
            &suffix[..8]
        )
    }

    /// True if this record moves money out of or into `account_id`
    pub fn involves(&self, account_id: &str) -> bool {
        self.from_account == account_id || self.to_account == account_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn create_test_transaction() -> Transaction {
        let mut tags = Tags::new();
        tags.insert("purpose".to_string(), "emergency fund".to_string());
        tags.insert("method".to_string(), "online banking".to_string());

        Transaction::new(
            "12345",
            "67890",
            Amount::from_major(500).unwrap(),
            "Transfer to savings",
            "transfer",
            tags,
            Utc::now(),
        )
    }

    #[test]
    fn test_generate_id_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let id = Transaction::generate_id(at);

        assert!(id.starts_with("TX20240309140507000000-"), "unexpected id {}", id);
        assert_eq!(id.len(), "TX".len() + 20 + 1 + 8);
    }

    #[test]
    fn test_generate_id_unique_for_same_instant() {
        let at = Utc::now();
        let ids: HashSet<String> = (0..1000).map(|_| Transaction::generate_id(at)).collect();

        assert_eq!(ids.len(), 1000, "ids minted at one instant must not collide");
    }

    #[test]
    fn test_new_transaction() {
        let tx = create_test_transaction();

        assert!(tx.transaction_id.starts_with(TRANSACTION_ID_PREFIX));
        assert_eq!(tx.amount.to_string(), "500.00");
        assert_eq!(tx.tags.get("purpose").map(String::as_str), Some("emergency fund"));
        assert!(tx.involves("12345"));
        assert!(tx.involves("67890"));
        assert!(!tx.involves("99999"));
    }

    #[test]
    fn test_tags_serialize_as_object() {
        let tx = create_test_transaction();
        let json = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["tags"]["method"], "online banking");
        assert_eq!(json["amount"], "500.00");
    }
}

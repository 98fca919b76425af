// 📐 Shape Layer - Schema Validation
// Explicit per-entity checks, run before anything is written

use crate::entities::{Account, Transaction};

/// Longest description or category accepted on a transaction record
pub const MAX_TEXT_LEN: usize = 256;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl ValidationError {
    fn new(context: &str, field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
            context: context.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.context, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

// ============================================================================
// SCHEMA VALIDATOR
// ============================================================================

/// Validates documents before they reach the store.
///
/// Enum fields (account type, status) are closed by their Rust types, so the
/// checks here cover what the types cannot: empty keys, sign of money,
/// record-level consistency.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        SchemaValidator
    }

    /// Validate an account document
    pub fn validate_account(&self, account: &Account) -> ValidationResult {
        let mut errors = Vec::new();
        let context = "Account";

        if account.account_id.trim().is_empty() {
            errors.push(ValidationError::new(context, "account_id", "Required field is empty"));
        }

        if account.name.trim().is_empty() {
            errors.push(ValidationError::new(context, "name", "Required field is empty"));
        }

        if account.balance.is_negative() {
            errors.push(ValidationError::new(
                context,
                "balance",
                format!("Must be >= 0, got {}", account.balance),
            ));
        }

        finish(errors)
    }

    /// Validate a transaction record
    pub fn validate_transaction(&self, tx: &Transaction) -> ValidationResult {
        let mut errors = Vec::new();
        let context = "Transaction";

        if tx.transaction_id.trim().is_empty() {
            errors.push(ValidationError::new(context, "transaction_id", "Required field is empty"));
        }

        if tx.from_account.trim().is_empty() {
            errors.push(ValidationError::new(context, "from_account", "Required field is empty"));
        }

        if tx.to_account.trim().is_empty() {
            errors.push(ValidationError::new(context, "to_account", "Required field is empty"));
        }

        if !tx.from_account.is_empty() && tx.from_account == tx.to_account {
            errors.push(ValidationError::new(
                context,
                "to_account",
                "Must differ from from_account",
            ));
        }

        if !tx.amount.is_positive() {
            errors.push(ValidationError::new(
                context,
                "amount",
                format!("Must be > 0, got {}", tx.amount),
            ));
        }

        if tx.category.trim().is_empty() {
            errors.push(ValidationError::new(context, "category", "Required field is empty"));
        }

        if tx.category.len() > MAX_TEXT_LEN {
            errors.push(ValidationError::new(
                context,
                "category",
                format!("Longer than {} bytes", MAX_TEXT_LEN),
            ));
        }

        if tx.description.len() > MAX_TEXT_LEN {
            errors.push(ValidationError::new(
                context,
                "description",
                format!("Longer than {} bytes", MAX_TEXT_LEN),
            ));
        }

        if tx.tags.keys().any(|k| k.trim().is_empty()) {
            errors.push(ValidationError::new(context, "tags", "Tag keys must not be empty"));
        }

        finish(errors)
    }
}

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// ============================================================================
// TESTS
// ============================================================================

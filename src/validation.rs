//! Validation of journal line sets before posting
//!
//! Line sets are constructed internally by the posting rules, so a failure
//! here is a programming fault in a caller, not user input to be reported
//! back politely. Amounts are minor units; the balance tolerance of one
//! minor unit corresponds to the 0.01-currency-unit penny precision used
//! throughout the ledger.

use thiserror::Error;

use crate::services::posting_rules::LineSpec;

/// Allowed |Σdebit - Σcredit| per entry, in minor units (penny precision)
pub const BALANCE_TOLERANCE_MINOR: i64 = 1;

pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Validation errors for journal line sets
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Lines must have at least 2 items, got {0}")]
    InsufficientLines(usize),

    #[error("Line {0}: account code cannot be empty")]
    EmptyAccountCode(usize),

    #[error("Line {0}: debit must be non-negative, got {1}")]
    NegativeDebit(usize, i64),

    #[error("Line {0}: credit must be non-negative, got {1}")]
    NegativeCredit(usize, i64),

    #[error("Line {0}: description exceeds {MAX_DESCRIPTION_LEN} characters, got {1}")]
    DescriptionTooLong(usize, usize),

    #[error("Entry description must be between 1 and {MAX_DESCRIPTION_LEN} characters, got {0}")]
    InvalidDescriptionLength(usize),
}

/// Validate the shape of a journal line set.
///
/// # Validation Rules
///
/// - At least 2 lines
/// - Each line: non-empty account code, non-negative debit and credit,
///   description (if present) within bounds
///
/// The balance check itself lives in the posting service, which reports
/// `UnbalancedEntry` separately so operators can tell a malformed payload
/// from a broken posting rule.
pub fn validate_line_set(lines: &[LineSpec]) -> Result<(), ValidationError> {
    if lines.len() < 2 {
        return Err(ValidationError::InsufficientLines(lines.len()));
    }

    for (idx, line) in lines.iter().enumerate() {
        if line.account_code.is_empty() {
            return Err(ValidationError::EmptyAccountCode(idx));
        }
        if line.debit_minor < 0 {
            return Err(ValidationError::NegativeDebit(idx, line.debit_minor));
        }
        if line.credit_minor < 0 {
            return Err(ValidationError::NegativeCredit(idx, line.credit_minor));
        }
        if let Some(ref description) = line.description {
            if description.len() > MAX_DESCRIPTION_LEN {
                return Err(ValidationError::DescriptionTooLong(idx, description.len()));
            }
        }
    }

    Ok(())
}

/// Validate an entry-level description
pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    let len = description.len();
    if len == 0 || len > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::InvalidDescriptionLength(len));
    }
    Ok(())
}

/// Whether a line set balances within [`BALANCE_TOLERANCE_MINOR`]
pub fn is_balanced(total_debits: i64, total_credits: i64) -> bool {
    (total_debits - total_credits).abs() <= BALANCE_TOLERANCE_MINOR
}

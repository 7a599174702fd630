//! Chart-of-accounts contract
//!
//! Account codes are the stable interface between posting rules and the
//! chart of accounts: internal ids are regenerable, codes survive reseeding.
//! Every code the posting rules reference is listed here, and
//! [`verify_chart`] checks at startup that a tenant's chart covers all of
//! them.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

pub const MAIN_BANK: &str = "1101";
pub const PETTY_CASH: &str = "1102";
pub const ACCOUNTS_RECEIVABLE: &str = "1200";
pub const INVENTORY: &str = "1300";
pub const INPUT_TAX_RECEIVABLE: &str = "1350";
pub const ACCOUNTS_PAYABLE: &str = "2100";
pub const TAX_PAYABLE: &str = "2200";
pub const RETAINED_EARNINGS: &str = "3200";
pub const SALES_REVENUE: &str = "4100";
pub const OTHER_INCOME: &str = "4200";
pub const COST_OF_GOODS_SOLD: &str = "5100";
pub const INVENTORY_LOSS: &str = "5150";
pub const OTHER_EXPENSES: &str = "5900";

/// Every account code the posting rules may emit. Expense category codes
/// are included via [`ExpenseCategory::account_code`].
pub const REQUIRED_CODES: &[&str] = &[
    MAIN_BANK,
    PETTY_CASH,
    ACCOUNTS_RECEIVABLE,
    INVENTORY,
    INPUT_TAX_RECEIVABLE,
    ACCOUNTS_PAYABLE,
    TAX_PAYABLE,
    RETAINED_EARNINGS,
    SALES_REVENUE,
    OTHER_INCOME,
    COST_OF_GOODS_SOLD,
    INVENTORY_LOSS,
    "5200",
    "5300",
    "5400",
    "5500",
    OTHER_EXPENSES,
];

/// Expense categories and their expense-account mapping.
///
/// Modeled as a closed enum rather than string constants so an unmapped
/// category cannot appear at a call site; categories without a dedicated
/// account fall through to Other Expenses (5900).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    Rent,
    Utilities,
    Salaries,
    Transport,
    Supplies,
    Maintenance,
    Marketing,
    Misc,
}

impl ExpenseCategory {
    pub fn account_code(&self) -> &'static str {
        match self {
            ExpenseCategory::Rent => "5200",
            ExpenseCategory::Utilities => "5300",
            ExpenseCategory::Salaries => "5400",
            ExpenseCategory::Transport => "5500",
            ExpenseCategory::Supplies
            | ExpenseCategory::Maintenance
            | ExpenseCategory::Marketing
            | ExpenseCategory::Misc => OTHER_EXPENSES,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExpenseCategory::Rent => "RENT",
            ExpenseCategory::Utilities => "UTILITIES",
            ExpenseCategory::Salaries => "SALARIES",
            ExpenseCategory::Transport => "TRANSPORT",
            ExpenseCategory::Supplies => "SUPPLIES",
            ExpenseCategory::Maintenance => "MAINTENANCE",
            ExpenseCategory::Marketing => "MARKETING",
            ExpenseCategory::Misc => "MISC",
        }
    }
}

/// How an expense or payment was settled; decides the credited cash account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Bank,
}

impl PaymentMethod {
    pub fn settlement_account_code(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => PETTY_CASH,
            PaymentMethod::Bank => MAIN_BANK,
        }
    }
}

/// Stock adjustment classification. Only loss types produce journal
/// entries; count corrections and increases adjust quantities without
/// touching the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentType {
    Wastage,
    Damage,
    Theft,
    Recount,
    Increase,
}

impl AdjustmentType {
    pub fn is_loss(&self) -> bool {
        matches!(
            self,
            AdjustmentType::Wastage | AdjustmentType::Damage | AdjustmentType::Theft
        )
    }
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Chart of accounts for tenant {tenant_id} is missing codes: {codes:?}")]
    MissingAccounts { tenant_id: String, codes: Vec<String> },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Verify that every code the posting rules reference exists in the
/// tenant's chart of accounts. Intended to run once at startup so a
/// misconfigured chart is caught before the first posting soft-skips.
pub async fn verify_chart(pool: &PgPool, tenant_id: &str) -> Result<(), ChartError> {
    let present: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT code FROM account_heads
        WHERE tenant_id = $1 AND code = ANY($2)
        "#,
    )
    .bind(tenant_id)
    .bind(
        REQUIRED_CODES
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>(),
    )
    .fetch_all(pool)
    .await?;

    let missing: Vec<String> = REQUIRED_CODES
        .iter()
        .filter(|code| !present.iter().any(|p| p == *code))
        .map(|code| code.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ChartError::MissingAccounts {
            tenant_id: tenant_id.to_string(),
            codes: missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expense_categories_map_to_seeded_codes() {
        assert_eq!(ExpenseCategory::Rent.account_code(), "5200");
        assert_eq!(ExpenseCategory::Utilities.account_code(), "5300");
        assert_eq!(ExpenseCategory::Salaries.account_code(), "5400");
        assert_eq!(ExpenseCategory::Transport.account_code(), "5500");
        assert_eq!(ExpenseCategory::Supplies.account_code(), "5900");
        assert_eq!(ExpenseCategory::Misc.account_code(), "5900");
    }

    #[test]
    fn every_expense_code_is_required() {
        let categories = [
            ExpenseCategory::Rent,
            ExpenseCategory::Utilities,
            ExpenseCategory::Salaries,
            ExpenseCategory::Transport,
            ExpenseCategory::Supplies,
            ExpenseCategory::Maintenance,
            ExpenseCategory::Marketing,
            ExpenseCategory::Misc,
        ];
        for category in categories {
            assert!(REQUIRED_CODES.contains(&category.account_code()));
        }
    }

    #[test]
    fn only_loss_adjustments_post() {
        assert!(AdjustmentType::Wastage.is_loss());
        assert!(AdjustmentType::Damage.is_loss());
        assert!(AdjustmentType::Theft.is_loss());
        assert!(!AdjustmentType::Recount.is_loss());
        assert!(!AdjustmentType::Increase.is_loss());
    }

    #[test]
    fn payment_method_settlement_accounts() {
        assert_eq!(PaymentMethod::Cash.settlement_account_code(), PETTY_CASH);
        assert_eq!(PaymentMethod::Bank.settlement_account_code(), MAIN_BANK);
    }
}

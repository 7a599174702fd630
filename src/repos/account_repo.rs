use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

/// Account type enum matching database account_type
#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "account_type", rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

/// Chart-of-accounts node. `current_balance_minor` is a cached running
/// balance; [`apply_balance_change`] is the only mutation path.
#[derive(Debug, Clone, FromRow)]
pub struct AccountHead {
    pub id: Uuid,
    pub tenant_id: String,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub parent_id: Option<Uuid>,
    pub is_system_account: bool,
    pub opening_balance_minor: i64,
    pub current_balance_minor: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Errors that can occur during account repository operations
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Account not found: tenant_id={tenant_id}, code={code}")]
    NotFound { tenant_id: String, code: String },

    #[error("Account is inactive: tenant_id={tenant_id}, code={code}")]
    Inactive { tenant_id: String, code: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

const SELECT_ACCOUNT: &str = r#"
    SELECT id, tenant_id, code, name, account_type, parent_id, is_system_account,
           opening_balance_minor, current_balance_minor, is_active, created_at
    FROM account_heads
    WHERE tenant_id = $1 AND code = $2
"#;

/// Find an account by tenant_id and code.
/// Returns None if the code has no chart-of-accounts entry.
pub async fn find_by_code(
    pool: &PgPool,
    tenant_id: &str,
    code: &str,
) -> Result<Option<AccountHead>, AccountError> {
    let account = sqlx::query_as::<_, AccountHead>(SELECT_ACCOUNT)
        .bind(tenant_id)
        .bind(code)
        .fetch_optional(pool)
        .await?;

    Ok(account)
}

/// Find an account by tenant_id and code within a transaction
pub async fn find_by_code_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    code: &str,
) -> Result<Option<AccountHead>, AccountError> {
    let account = sqlx::query_as::<_, AccountHead>(SELECT_ACCOUNT)
        .bind(tenant_id)
        .bind(code)
        .fetch_optional(&mut **tx)
        .await?;

    Ok(account)
}

/// Find an active account by tenant_id and code within a transaction.
/// Returns an error if the account doesn't exist or is inactive.
pub async fn find_active_by_code_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    code: &str,
) -> Result<AccountHead, AccountError> {
    let account = find_by_code_tx(tx, tenant_id, code).await?;

    match account {
        Some(acc) if acc.is_active => Ok(acc),
        Some(_) => Err(AccountError::Inactive {
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
        }),
        None => Err(AccountError::NotFound {
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
        }),
    }
}

/// Find an account by its internal id. Used when a caller holds an id
/// (e.g. a chosen bank account) and needs the stable code back.
pub async fn find_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    id: Uuid,
) -> Result<Option<AccountHead>, AccountError> {
    let account = sqlx::query_as::<_, AccountHead>(
        r#"
        SELECT id, tenant_id, code, name, account_type, parent_id, is_system_account,
               opening_balance_minor, current_balance_minor, is_active, created_at
        FROM account_heads
        WHERE tenant_id = $1 AND id = $2
        "#,
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(account)
}

/// Apply a signed balance change to an account's running balance.
///
/// This is the ONLY code path allowed to touch `current_balance_minor`;
/// the delta must come from `balance_rules::balance_change` so the cached
/// column always equals opening balance plus the fold over posted lines.
/// Single-statement additive update, so concurrent postings serialize on
/// the row without a read-modify-write race.
pub async fn apply_balance_change(
    tx: &mut Transaction<'_, Postgres>,
    account_head_id: Uuid,
    delta_minor: i64,
) -> Result<(), AccountError> {
    sqlx::query(
        r#"
        UPDATE account_heads
        SET current_balance_minor = current_balance_minor + $2
        WHERE id = $1
        "#,
    )
    .bind(account_head_id)
    .bind(delta_minor)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_variants() {
        // These should match the database enum values
        let types = [
            AccountType::Asset,
            AccountType::Liability,
            AccountType::Equity,
            AccountType::Revenue,
            AccountType::Expense,
        ];
        assert_eq!(types.len(), 5);
    }

    #[test]
    fn test_not_found_error_display() {
        let err = AccountError::NotFound {
            tenant_id: "demo".to_string(),
            code: "3200".to_string(),
        };
        assert!(err.to_string().contains("3200"));
        assert!(err.to_string().contains("demo"));
    }
}

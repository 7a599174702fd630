use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::repos::account_repo::AccountType;

/// Journal entry status matching database entry_status.
/// The core only ever creates `Posted` entries; `Draft` and `Void` exist
/// for schema completeness and external tooling.
#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "entry_status", rename_all = "lowercase")]
pub enum EntryStatus {
    Draft,
    Posted,
    Void,
}

/// Journal entry header (for reading from DB)
#[derive(Debug, Clone, FromRow)]
pub struct JournalEntry {
    pub id: Uuid,
    pub tenant_id: String,
    pub entry_number: String,
    pub entry_date: NaiveDate,
    pub description: String,
    pub status: EntryStatus,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Journal line (for reading from DB)
#[derive(Debug, Clone, FromRow)]
pub struct JournalLine {
    pub id: Uuid,
    pub journal_entry_id: Uuid,
    pub line_no: i32,
    pub account_head_id: Uuid,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub description: Option<String>,
}

/// Struct for inserting a journal line
#[derive(Debug, Clone)]
pub struct JournalLineInsert {
    pub id: Uuid,
    pub line_no: i32,
    pub account_head_id: Uuid,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub description: Option<String>,
}

/// Insert a POSTED journal entry header
pub async fn insert_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry_id: Uuid,
    tenant_id: &str,
    entry_number: &str,
    entry_date: NaiveDate,
    description: &str,
    reference_type: Option<&str>,
    reference_id: Option<&str>,
    created_by: &str,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO journal_entries
            (id, tenant_id, entry_number, entry_date, description, status,
             reference_type, reference_id, created_by, approved_by)
        VALUES ($1, $2, $3, $4, $5, 'posted', $6, $7, $8, $8)
        "#,
    )
    .bind(entry_id)
    .bind(tenant_id)
    .bind(entry_number)
    .bind(entry_date)
    .bind(description)
    .bind(reference_type)
    .bind(reference_id)
    .bind(created_by)
    .execute(&mut **tx)
    .await?;

    Ok(entry_id)
}

/// Bulk insert journal lines for a journal entry
pub async fn bulk_insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    journal_entry_id: Uuid,
    tenant_id: &str,
    lines: Vec<JournalLineInsert>,
) -> Result<(), sqlx::Error> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO journal_entry_lines
                (id, journal_entry_id, tenant_id, line_no, account_head_id,
                 debit_minor, credit_minor, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(line.id)
        .bind(journal_entry_id)
        .bind(tenant_id)
        .bind(line.line_no)
        .bind(line.account_head_id)
        .bind(line.debit_minor)
        .bind(line.credit_minor)
        .bind(&line.description)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Check whether a journal entry already exists for a business reference.
/// This is the idempotency key used by the historical backfill.
pub async fn exists_for_reference(
    pool: &PgPool,
    tenant_id: &str,
    reference_type: &str,
    reference_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id FROM journal_entries
        WHERE tenant_id = $1 AND reference_type = $2 AND reference_id = $3
        LIMIT 1
        "#,
    )
    .bind(tenant_id)
    .bind(reference_type)
    .bind(reference_id)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

/// Fetch a journal entry by ID with its lines, ordered by line_no
pub async fn fetch_entry_with_lines(
    pool: &PgPool,
    tenant_id: &str,
    entry_id: Uuid,
) -> Result<Option<(JournalEntry, Vec<JournalLine>)>, sqlx::Error> {
    let entry = sqlx::query_as::<_, JournalEntry>(
        r#"
        SELECT id, tenant_id, entry_number, entry_date, description, status,
               reference_type, reference_id, created_by, approved_by, created_at
        FROM journal_entries
        WHERE tenant_id = $1 AND id = $2
        "#,
    )
    .bind(tenant_id)
    .bind(entry_id)
    .fetch_optional(pool)
    .await?;

    let Some(entry) = entry else {
        return Ok(None);
    };

    let lines = sqlx::query_as::<_, JournalLine>(
        r#"
        SELECT id, journal_entry_id, line_no, account_head_id,
               debit_minor, credit_minor, description
        FROM journal_entry_lines
        WHERE journal_entry_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(entry_id)
    .fetch_all(pool)
    .await?;

    Ok(Some((entry, lines)))
}

/// Sum debits and credits over all POSTED lines dated on or before `as_of`.
/// This is the trial-balance read used by period close and the backfill
/// validation; it must run on the caller's transaction when consistency
/// with a pending close matters.
pub async fn trial_balance_totals_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    as_of: NaiveDate,
) -> Result<(i64, i64), sqlx::Error> {
    let totals: (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(l.debit_minor), 0)::BIGINT,
               COALESCE(SUM(l.credit_minor), 0)::BIGINT
        FROM journal_entry_lines l
        JOIN journal_entries e ON e.id = l.journal_entry_id
        WHERE e.tenant_id = $1
          AND e.status = 'posted'
          AND e.entry_date <= $2
        "#,
    )
    .bind(tenant_id)
    .bind(as_of)
    .fetch_one(&mut **tx)
    .await?;

    Ok(totals)
}

/// Pool variant of [`trial_balance_totals_tx`] for read-only validation.
pub async fn trial_balance_totals(
    pool: &PgPool,
    tenant_id: &str,
    as_of: NaiveDate,
) -> Result<(i64, i64), sqlx::Error> {
    let totals: (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(l.debit_minor), 0)::BIGINT,
               COALESCE(SUM(l.credit_minor), 0)::BIGINT
        FROM journal_entry_lines l
        JOIN journal_entries e ON e.id = l.journal_entry_id
        WHERE e.tenant_id = $1
          AND e.status = 'posted'
          AND e.entry_date <= $2
        "#,
    )
    .bind(tenant_id)
    .bind(as_of)
    .fetch_one(pool)
    .await?;

    Ok(totals)
}

/// Per-account debit/credit totals for revenue and expense accounts within
/// a date range, over POSTED entries only.
#[derive(Debug, Clone, FromRow)]
pub struct AccountPeriodTotals {
    pub account_head_id: Uuid,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub debit_minor: i64,
    pub credit_minor: i64,
}

/// Aggregate revenue/expense activity per account for a period.
///
/// `exclude_closing` drops PERIOD_CLOSE entries so P&L reads don't see the
/// zeroing lines of a previous close of the same period.
pub async fn period_account_totals_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    period_start: NaiveDate,
    period_end: NaiveDate,
    exclude_closing: bool,
) -> Result<Vec<AccountPeriodTotals>, sqlx::Error> {
    let rows = if exclude_closing {
        sqlx::query_as::<_, AccountPeriodTotals>(
            r#"
            SELECT a.id AS account_head_id, a.code, a.name, a.account_type,
                   COALESCE(SUM(l.debit_minor), 0)::BIGINT AS debit_minor,
                   COALESCE(SUM(l.credit_minor), 0)::BIGINT AS credit_minor
            FROM journal_entry_lines l
            JOIN journal_entries e ON e.id = l.journal_entry_id
            JOIN account_heads a ON a.id = l.account_head_id
            WHERE e.tenant_id = $1
              AND e.status = 'posted'
              AND e.entry_date >= $2
              AND e.entry_date <= $3
              AND COALESCE(e.reference_type, '') <> 'PERIOD_CLOSE'
              AND a.account_type IN ('revenue', 'expense')
            GROUP BY a.id, a.code, a.name, a.account_type
            ORDER BY a.code
            "#,
        )
        .bind(tenant_id)
        .bind(period_start)
        .bind(period_end)
        .fetch_all(&mut **tx)
        .await?
    } else {
        sqlx::query_as::<_, AccountPeriodTotals>(
            r#"
            SELECT a.id AS account_head_id, a.code, a.name, a.account_type,
                   COALESCE(SUM(l.debit_minor), 0)::BIGINT AS debit_minor,
                   COALESCE(SUM(l.credit_minor), 0)::BIGINT AS credit_minor
            FROM journal_entry_lines l
            JOIN journal_entries e ON e.id = l.journal_entry_id
            JOIN account_heads a ON a.id = l.account_head_id
            WHERE e.tenant_id = $1
              AND e.status = 'posted'
              AND e.entry_date >= $2
              AND e.entry_date <= $3
              AND a.account_type IN ('revenue', 'expense')
            GROUP BY a.id, a.code, a.name, a.account_type
            ORDER BY a.code
            "#,
        )
        .bind(tenant_id)
        .bind(period_start)
        .bind(period_end)
        .fetch_all(&mut **tx)
        .await?
    };

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_status_variants() {
        let statuses = [EntryStatus::Draft, EntryStatus::Posted, EntryStatus::Void];
        assert_eq!(statuses.len(), 3);
    }
}

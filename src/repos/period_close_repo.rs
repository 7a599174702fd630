//! Repository for period close records

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "period_type", rename_all = "lowercase")]
pub enum PeriodType {
    Month,
}

#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "period_status", rename_all = "lowercase")]
pub enum PeriodStatus {
    Closed,
    Reopened,
}

/// One record per closed accounting period. `period_date` is the last
/// calendar day of the period.
#[derive(Debug, Clone, FromRow)]
pub struct PeriodClose {
    pub id: Uuid,
    pub tenant_id: String,
    pub period_type: PeriodType,
    pub period_date: NaiveDate,
    pub net_profit_minor: i64,
    pub status: PeriodStatus,
    pub closed_by: String,
    pub reopen_reason: Option<String>,
    pub closing_journal_entry_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, tenant_id, period_type, period_date, net_profit_minor, status,
           closed_by, reopen_reason, closing_journal_entry_id, created_at
    FROM period_closes
"#;

/// Latest close record for a period, regardless of status.
/// A `Closed` result blocks re-closing; a `Reopened` one does too (see
/// the close service for the rationale).
pub async fn find_for_period_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    period_date: NaiveDate,
) -> Result<Option<PeriodClose>, sqlx::Error> {
    sqlx::query_as::<_, PeriodClose>(&format!(
        "{SELECT_COLUMNS} WHERE tenant_id = $1 AND period_type = 'month' AND period_date = $2 \
         ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(tenant_id)
    .bind(period_date)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn find_by_id(
    pool: &PgPool,
    tenant_id: &str,
    id: Uuid,
) -> Result<Option<PeriodClose>, sqlx::Error> {
    sqlx::query_as::<_, PeriodClose>(&format!("{SELECT_COLUMNS} WHERE tenant_id = $1 AND id = $2"))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// All close records, most recent period first
pub async fn list(pool: &PgPool, tenant_id: &str) -> Result<Vec<PeriodClose>, sqlx::Error> {
    sqlx::query_as::<_, PeriodClose>(&format!(
        "{SELECT_COLUMNS} WHERE tenant_id = $1 ORDER BY period_date DESC"
    ))
    .bind(tenant_id)
    .fetch_all(pool)
    .await
}

pub async fn insert_closed_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    period_date: NaiveDate,
    net_profit_minor: i64,
    closed_by: &str,
    closing_journal_entry_id: Option<Uuid>,
) -> Result<PeriodClose, sqlx::Error> {
    sqlx::query_as::<_, PeriodClose>(
        r#"
        INSERT INTO period_closes
            (id, tenant_id, period_type, period_date, net_profit_minor, status,
             closed_by, closing_journal_entry_id)
        VALUES ($1, $2, 'month', $3, $4, 'closed', $5, $6)
        RETURNING id, tenant_id, period_type, period_date, net_profit_minor, status,
                  closed_by, reopen_reason, closing_journal_entry_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(period_date)
    .bind(net_profit_minor)
    .bind(closed_by)
    .bind(closing_journal_entry_id)
    .fetch_one(&mut **tx)
    .await
}

/// Flip a CLOSED record to REOPENED, recording the reason.
/// Returns None when the record is not in CLOSED state.
pub async fn mark_reopened(
    pool: &PgPool,
    tenant_id: &str,
    id: Uuid,
    reason: &str,
) -> Result<Option<PeriodClose>, sqlx::Error> {
    sqlx::query_as::<_, PeriodClose>(
        r#"
        UPDATE period_closes
        SET status = 'reopened', reopen_reason = $3
        WHERE tenant_id = $1 AND id = $2 AND status = 'closed'
        RETURNING id, tenant_id, period_type, period_date, net_profit_minor, status,
                  closed_by, reopen_reason, closing_journal_entry_id, created_at
        "#,
    )
    .bind(tenant_id)
    .bind(id)
    .bind(reason)
    .fetch_optional(pool)
    .await
}

//! Journal entry number generation
//!
//! Entry numbers are human-readable, date-scoped sequences of the form
//! `JE-YYYYMMDD-NNN`. The sequence for each day comes from a dedicated
//! counter row incremented with an atomic upsert inside the posting
//! transaction, so two concurrent postings on the same day can never read
//! the same "latest" number.

use chrono::NaiveDate;
use sqlx::{Postgres, Transaction};

/// Day prefix for a posting date, e.g. `JE-20260131-`
pub fn day_prefix(date: NaiveDate) -> String {
    format!("JE-{}-", date.format("%Y%m%d"))
}

/// Zero-padded to three digits; sequences past 999 simply grow wider.
pub fn format_entry_number(prefix: &str, seq: i32) -> String {
    format!("{prefix}{seq:03}")
}

/// Next entry number for a tenant and posting date.
///
/// Must be called on the same transaction that inserts the journal entry:
/// the counter row update holds a row lock until commit, serializing
/// concurrent postings for the same day.
pub async fn next_entry_number(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    date: NaiveDate,
) -> Result<String, sqlx::Error> {
    let prefix = day_prefix(date);

    let seq: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO entry_number_counters (tenant_id, day_prefix, last_seq)
        VALUES ($1, $2, 1)
        ON CONFLICT (tenant_id, day_prefix)
        DO UPDATE SET last_seq = entry_number_counters.last_seq + 1
        RETURNING last_seq
        "#,
    )
    .bind(tenant_id)
    .bind(&prefix)
    .fetch_one(&mut **tx)
    .await?;

    Ok(format_entry_number(&prefix, seq))
}

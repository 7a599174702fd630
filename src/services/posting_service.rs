//! Transactional journal posting
//!
//! Takes the line sets produced by `posting_rules`, resolves account codes,
//! validates balance, and persists POSTED entries together with their
//! running-balance updates — all on the caller's transaction, so journal
//! lines and balance changes commit together or not at all.
//!
//! Auto-postings are best-effort: a missing account logs a warning and
//! skips the entry rather than failing the parent business operation (a
//! misconfigured chart must not block a sale, though it leaves the ledger
//! incomplete until fixed). Period close and backfill use the strict
//! variant, which always fails hard.

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::coa;
use crate::repos::account_repo::{self, AccountError, AccountType};
use crate::repos::journal_repo::{self, JournalLineInsert};
use crate::services::balance_rules;
use crate::services::entry_number;
use crate::services::posting_rules::{
    self, AdjustmentPosting, CreditNotePosting, DeliveryPosting, EntrySpec, ExpensePosting,
    GoodsReceiptPosting, InvoicePosting, LandedCostPosting, PaymentPosting, ReferenceType,
};
use crate::validation::{self, ValidationError};

/// Tenant and acting user threaded through every posting operation
#[derive(Debug, Clone)]
pub struct PostingContext {
    pub tenant_id: String,
    pub user_id: String,
}

/// Errors that can occur while posting a journal entry
#[derive(Debug, Error)]
pub enum PostingError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("Entry not balanced: debits={debits_minor}, credits={credits_minor}")]
    Unbalanced { debits_minor: i64, credits_minor: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for posting operations
pub type PostingResult<T> = Result<T, PostingError>;

struct ResolvedLine {
    account_head_id: Uuid,
    account_type: AccountType,
    debit_minor: i64,
    credit_minor: i64,
    description: Option<String>,
}

/// Post an auto-journal entry, skipping silently when an account code has
/// no chart entry. Returns the new entry id, or None when skipped.
pub async fn post_entry(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    spec: &EntrySpec,
) -> PostingResult<Option<Uuid>> {
    validation::validate_description(&spec.description)?;
    validation::validate_line_set(&spec.lines)?;

    // Resolve codes up front; one missing account skips the whole entry so
    // a partially-resolved line set can never be written.
    let mut cache: HashMap<String, (Uuid, AccountType)> = HashMap::new();
    let mut resolved = Vec::with_capacity(spec.lines.len());

    for line in &spec.lines {
        let account = match cache.get(&line.account_code).copied() {
            Some(hit) => hit,
            None => {
                match account_repo::find_by_code_tx(tx, &ctx.tenant_id, &line.account_code).await? {
                    Some(account) => {
                        cache.insert(line.account_code.clone(), (account.id, account.account_type));
                        (account.id, account.account_type)
                    }
                    None => {
                        tracing::warn!(
                            tenant_id = %ctx.tenant_id,
                            account_code = %line.account_code,
                            description = %spec.description,
                            "Account not found, skipping journal entry"
                        );
                        return Ok(None);
                    }
                }
            }
        };

        resolved.push(ResolvedLine {
            account_head_id: account.0,
            account_type: account.1,
            debit_minor: line.debit_minor,
            credit_minor: line.credit_minor,
            description: line.description.clone(),
        });
    }

    let entry_id = persist_entry(tx, ctx, spec, resolved).await?;
    Ok(Some(entry_id))
}

/// Post an entry with hard failures on missing or inactive accounts.
/// Used by period close and the historical backfill, where an incomplete
/// chart must abort the operation.
pub async fn post_entry_strict(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    spec: &EntrySpec,
) -> PostingResult<Uuid> {
    validation::validate_description(&spec.description)?;
    validation::validate_line_set(&spec.lines)?;

    let mut cache: HashMap<String, (Uuid, AccountType)> = HashMap::new();
    let mut resolved = Vec::with_capacity(spec.lines.len());

    for line in &spec.lines {
        let account = match cache.get(&line.account_code).copied() {
            Some(hit) => hit,
            None => {
                let account =
                    account_repo::find_active_by_code_tx(tx, &ctx.tenant_id, &line.account_code)
                        .await?;
                cache.insert(line.account_code.clone(), (account.id, account.account_type));
                (account.id, account.account_type)
            }
        };

        resolved.push(ResolvedLine {
            account_head_id: account.0,
            account_type: account.1,
            debit_minor: line.debit_minor,
            credit_minor: line.credit_minor,
            description: line.description.clone(),
        });
    }

    persist_entry(tx, ctx, spec, resolved).await
}

async fn persist_entry(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    spec: &EntrySpec,
    resolved: Vec<ResolvedLine>,
) -> PostingResult<Uuid> {
    let total_debits: i64 = resolved.iter().map(|l| l.debit_minor).sum();
    let total_credits: i64 = resolved.iter().map(|l| l.credit_minor).sum();

    if !validation::is_balanced(total_debits, total_credits) {
        return Err(PostingError::Unbalanced {
            debits_minor: total_debits,
            credits_minor: total_credits,
        });
    }

    let entry_number = entry_number::next_entry_number(tx, &ctx.tenant_id, spec.entry_date).await?;
    let entry_id = Uuid::new_v4();

    journal_repo::insert_entry(
        tx,
        entry_id,
        &ctx.tenant_id,
        &entry_number,
        spec.entry_date,
        &spec.description,
        Some(spec.reference_type.as_str()),
        spec.reference_id.as_deref(),
        &ctx.user_id,
    )
    .await?;

    let line_inserts: Vec<JournalLineInsert> = resolved
        .iter()
        .enumerate()
        .map(|(idx, line)| JournalLineInsert {
            id: Uuid::new_v4(),
            line_no: (idx + 1) as i32,
            account_head_id: line.account_head_id,
            debit_minor: line.debit_minor,
            credit_minor: line.credit_minor,
            description: line.description.clone(),
        })
        .collect();

    journal_repo::bulk_insert_lines(tx, entry_id, &ctx.tenant_id, line_inserts).await?;

    // Running balances update in the same transaction as the lines; the
    // balance calculator is the only place sign logic lives.
    for line in &resolved {
        let delta =
            balance_rules::balance_change(line.account_type, line.debit_minor, line.credit_minor);
        account_repo::apply_balance_change(tx, line.account_head_id, delta).await?;
    }

    tracing::info!(
        tenant_id = %ctx.tenant_id,
        entry_number = %entry_number,
        reference_type = %spec.reference_type,
        reference_id = ?spec.reference_id,
        amount_minor = total_debits,
        "Journal entry posted"
    );

    Ok(entry_id)
}

/// Resolve the bank account code for a payment. A payment may target any
/// bank-type account head; missing or unknown ids fall back to the main
/// bank account.
pub async fn resolve_bank_account_code(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    bank_account_id: Option<Uuid>,
) -> PostingResult<String> {
    let Some(id) = bank_account_id else {
        return Ok(coa::MAIN_BANK.to_string());
    };

    let code = account_repo::find_by_id_tx(tx, tenant_id, id)
        .await?
        .map(|account| account.code)
        .unwrap_or_else(|| coa::MAIN_BANK.to_string());

    Ok(code)
}

// ---------------------------------------------------------------------------
// One method per business event type
// ---------------------------------------------------------------------------

/// Entry ids created for an invoice posting (A/R leg and optional COGS leg)
#[derive(Debug, Clone, Default)]
pub struct InvoiceEntries {
    pub ar_entry_id: Option<Uuid>,
    pub cogs_entry_id: Option<Uuid>,
}

/// Invoice created: A/R entry plus a COGS entry when `cogs_minor > 0`.
/// `cogs_minor` is the batch-cost sum from the FIFO deduction; pass 0 when
/// dispatch already posted COGS.
pub async fn post_invoice_created(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    invoice: &InvoicePosting,
    cogs_minor: i64,
) -> PostingResult<InvoiceEntries> {
    let ar_entry_id = post_entry(tx, ctx, &posting_rules::invoice_entry(invoice)).await?;

    let cogs_entry_id = if cogs_minor > 0 {
        let spec = posting_rules::cogs_entry(
            ReferenceType::Invoice,
            &invoice.invoice_id,
            &format!("Invoice {}", invoice.invoice_number),
            invoice.date,
            cogs_minor,
        );
        post_entry(tx, ctx, &spec).await?
    } else {
        None
    };

    Ok(InvoiceEntries {
        ar_entry_id,
        cogs_entry_id,
    })
}

/// Invoice voided: mirror entries dated at void time
pub async fn post_invoice_voided(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    invoice: &InvoicePosting,
    cogs_minor: i64,
    void_date: NaiveDate,
) -> PostingResult<InvoiceEntries> {
    let ar_entry_id =
        post_entry(tx, ctx, &posting_rules::invoice_void_entry(invoice, void_date)).await?;

    let cogs_entry_id = if cogs_minor > 0 {
        let spec = posting_rules::cogs_reversal_entry(
            ReferenceType::Invoice,
            &invoice.invoice_id,
            &format!("Void Invoice {}", invoice.invoice_number),
            void_date,
            cogs_minor,
        );
        post_entry(tx, ctx, &spec).await?
    } else {
        None
    };

    Ok(InvoiceEntries {
        ar_entry_id,
        cogs_entry_id,
    })
}

/// Delivery note dispatched: COGS posting at the moment stock leaves the
/// warehouse (full SO→DN→Invoice mode)
pub async fn post_delivery_dispatched(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    delivery: &DeliveryPosting,
    cogs_minor: i64,
) -> PostingResult<Option<Uuid>> {
    if cogs_minor <= 0 {
        return Ok(None);
    }

    let spec = posting_rules::cogs_entry(
        ReferenceType::DeliveryNote,
        &delivery.delivery_note_id,
        &format!("Delivery Note {}", delivery.delivery_note_number),
        delivery.date,
        cogs_minor,
    );
    post_entry(tx, ctx, &spec).await
}

/// Client payment: DR Bank  CR A/R
pub async fn post_client_payment(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    payment: &PaymentPosting,
) -> PostingResult<Option<Uuid>> {
    let bank_code = resolve_bank_account_code(tx, &ctx.tenant_id, payment.bank_account_id).await?;
    post_entry(tx, ctx, &posting_rules::client_payment_entry(payment, &bank_code)).await
}

/// Supplier payment: DR A/P  CR Bank
pub async fn post_supplier_payment(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    payment: &PaymentPosting,
) -> PostingResult<Option<Uuid>> {
    let bank_code = resolve_bank_account_code(tx, &ctx.tenant_id, payment.bank_account_id).await?;
    post_entry(tx, ctx, &posting_rules::supplier_payment_entry(payment, &bank_code)).await
}

/// PO receipt: DR Inventory (+ Input Tax Receivable)  CR A/P
pub async fn post_goods_received(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    receipt: &GoodsReceiptPosting,
) -> PostingResult<Option<Uuid>> {
    post_entry(tx, ctx, &posting_rules::goods_received_entry(receipt)).await
}

/// GRN cancelled: mirror of the goods-received entry
pub async fn post_goods_received_reversed(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    receipt: &GoodsReceiptPosting,
    reversal_date: NaiveDate,
) -> PostingResult<Option<Uuid>> {
    post_entry(
        tx,
        ctx,
        &posting_rules::goods_received_reversal_entry(receipt, reversal_date),
    )
    .await
}

/// PO/GRN landed cost added: DR Inventory  CR A/P
pub async fn post_landed_cost(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    cost: &LandedCostPosting,
) -> PostingResult<Option<Uuid>> {
    post_entry(tx, ctx, &posting_rules::landed_cost_entry(cost)).await
}

/// Landed cost reversal on cancellation
pub async fn post_landed_cost_reversed(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    cost: &LandedCostPosting,
    reversal_date: NaiveDate,
) -> PostingResult<Option<Uuid>> {
    post_entry(
        tx,
        ctx,
        &posting_rules::landed_cost_reversal_entry(cost, reversal_date),
    )
    .await
}

/// Expense created: DR mapped expense account  CR cash/bank
pub async fn post_expense(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    expense: &ExpensePosting,
) -> PostingResult<Option<Uuid>> {
    post_entry(tx, ctx, &posting_rules::expense_entry(expense)).await
}

/// Expense deleted: mirror entry dated at reversal time
pub async fn post_expense_reversed(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    expense: &ExpensePosting,
    reversal_date: NaiveDate,
) -> PostingResult<Option<Uuid>> {
    post_entry(
        tx,
        ctx,
        &posting_rules::expense_reversal_entry(expense, reversal_date),
    )
    .await
}

/// Stock adjustment approved. Non-loss adjustment types and zero-value
/// losses return Ok(None) without posting.
pub async fn post_stock_adjustment(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    adjustment: &AdjustmentPosting,
) -> PostingResult<Option<Uuid>> {
    match posting_rules::stock_adjustment_entry(adjustment) {
        Some(spec) => post_entry(tx, ctx, &spec).await,
        None => Ok(None),
    }
}

/// Credit note created: DR Other Income  CR A/R
pub async fn post_credit_note(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    credit_note: &CreditNotePosting,
) -> PostingResult<Option<Uuid>> {
    post_entry(tx, ctx, &posting_rules::credit_note_entry(credit_note)).await
}

/// Credit note voided: mirror entry dated at void time
pub async fn post_credit_note_voided(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    credit_note: &CreditNotePosting,
    void_date: NaiveDate,
) -> PostingResult<Option<Uuid>> {
    post_entry(
        tx,
        ctx,
        &posting_rules::credit_note_void_entry(credit_note, void_date),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbalanced_error_display() {
        let err = PostingError::Unbalanced {
            debits_minor: 117_000,
            credits_minor: 100_000,
        };
        assert!(err.to_string().contains("117000"));
        assert!(err.to_string().contains("100000"));
    }

    #[test]
    fn test_invoice_entries_default_is_empty() {
        let entries = InvoiceEntries::default();
        assert!(entries.ar_entry_id.is_none());
        assert!(entries.cogs_entry_id.is_none());
    }
}

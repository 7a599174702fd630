//! Historical ledger backfill
//!
//! One-time replay of existing business records through the same posting
//! rules, to retroactively populate the ledger. Idempotent: a record whose
//! reference_type + reference_id already has a journal entry is skipped,
//! so running the backfill twice creates nothing new. Processing happens
//! in a fixed order (PO receipts, invoices, client payments, supplier
//! payments, expenses, stock adjustments) and finishes with a
//! trial-balance validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use crate::repos::journal_repo;
use crate::services::posting_rules::{
    self, AdjustmentPosting, ExpensePosting, GoodsReceiptPosting, InvoicePosting, PaymentPosting,
    ReferenceType,
};
use crate::services::posting_service::{self, PostingContext, PostingError};
use crate::validation::BALANCE_TOLERANCE_MINOR;

/// One historical business record to replay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackfillRecord {
    PoReceipt(GoodsReceiptPosting),
    Invoice(InvoicePosting),
    ClientPayment(PaymentPosting),
    SupplierPayment(PaymentPosting),
    Expense(ExpensePosting),
    StockAdjustment(AdjustmentPosting),
}

/// Errors that abort the backfill
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error(transparent)]
    Posting(#[from] PostingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Created/skipped counters for one record kind
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct KindCounts {
    pub processed: u32,
    pub skipped: u32,
}

/// Outcome of a full backfill run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackfillSummary {
    pub po_receipts: KindCounts,
    pub invoices: KindCounts,
    pub client_payments: KindCounts,
    pub supplier_payments: KindCounts,
    pub expenses: KindCounts,
    pub stock_adjustments: KindCounts,
    pub total_debits_minor: i64,
    pub total_credits_minor: i64,
    pub trial_balanced: bool,
}

impl BackfillSummary {
    pub fn total_processed(&self) -> u32 {
        self.po_receipts.processed
            + self.invoices.processed
            + self.client_payments.processed
            + self.supplier_payments.processed
            + self.expenses.processed
            + self.stock_adjustments.processed
    }

    pub fn total_skipped(&self) -> u32 {
        self.po_receipts.skipped
            + self.invoices.skipped
            + self.client_payments.skipped
            + self.supplier_payments.skipped
            + self.expenses.skipped
            + self.stock_adjustments.skipped
    }
}

fn reference_of(record: &BackfillRecord) -> (ReferenceType, String) {
    match record {
        BackfillRecord::PoReceipt(receipt) => (ReferenceType::Po, receipt.po_id.clone()),
        BackfillRecord::Invoice(invoice) => (ReferenceType::Invoice, invoice.invoice_id.clone()),
        BackfillRecord::ClientPayment(payment) | BackfillRecord::SupplierPayment(payment) => {
            (ReferenceType::Payment, payment.payment_id.clone())
        }
        BackfillRecord::Expense(expense) => (ReferenceType::Expense, expense.expense_id.clone()),
        BackfillRecord::StockAdjustment(adjustment) => {
            (ReferenceType::Adjustment, adjustment.adjustment_id.clone())
        }
    }
}

fn order_rank(record: &BackfillRecord) -> u8 {
    match record {
        BackfillRecord::PoReceipt(_) => 0,
        BackfillRecord::Invoice(_) => 1,
        BackfillRecord::ClientPayment(_) => 2,
        BackfillRecord::SupplierPayment(_) => 3,
        BackfillRecord::Expense(_) => 4,
        BackfillRecord::StockAdjustment(_) => 5,
    }
}

/// Records with no amount worth posting are counted as skipped, matching
/// the idempotency skip rather than failing the whole run.
fn is_postable(record: &BackfillRecord) -> bool {
    match record {
        BackfillRecord::PoReceipt(receipt) => receipt.total_minor > 0,
        BackfillRecord::Invoice(invoice) => invoice.total_minor > 0,
        BackfillRecord::ClientPayment(payment) | BackfillRecord::SupplierPayment(payment) => {
            payment.amount_minor > 0
        }
        BackfillRecord::Expense(expense) => expense.amount_minor > 0,
        BackfillRecord::StockAdjustment(adjustment) => {
            adjustment.adjustment_type.is_loss()
                && adjustment.quantity.abs() * adjustment.unit_cost_minor > 0
        }
    }
}

/// Replay one record with strict posting: an incomplete chart aborts the
/// run (the live soft-skip policy would silently leave gaps in a backfill
/// meant to reconstruct history).
async fn replay_one(
    pool: &PgPool,
    ctx: &PostingContext,
    record: &BackfillRecord,
) -> Result<(), BackfillError> {
    let mut tx = pool.begin().await?;

    match record {
        BackfillRecord::PoReceipt(receipt) => {
            let spec = posting_rules::goods_received_entry(receipt);
            posting_service::post_entry_strict(&mut tx, ctx, &spec).await?;
        }
        BackfillRecord::Invoice(invoice) => {
            // Historical invoices post A/R only; their stock left the
            // warehouse long ago and COGS cannot be reconstructed per batch.
            let spec = posting_rules::invoice_entry(invoice);
            posting_service::post_entry_strict(&mut tx, ctx, &spec).await?;
        }
        BackfillRecord::ClientPayment(payment) => {
            let bank_code = posting_service::resolve_bank_account_code(
                &mut tx,
                &ctx.tenant_id,
                payment.bank_account_id,
            )
            .await?;
            let spec = posting_rules::client_payment_entry(payment, &bank_code);
            posting_service::post_entry_strict(&mut tx, ctx, &spec).await?;
        }
        BackfillRecord::SupplierPayment(payment) => {
            let bank_code = posting_service::resolve_bank_account_code(
                &mut tx,
                &ctx.tenant_id,
                payment.bank_account_id,
            )
            .await?;
            let spec = posting_rules::supplier_payment_entry(payment, &bank_code);
            posting_service::post_entry_strict(&mut tx, ctx, &spec).await?;
        }
        BackfillRecord::Expense(expense) => {
            let spec = posting_rules::expense_entry(expense);
            posting_service::post_entry_strict(&mut tx, ctx, &spec).await?;
        }
        BackfillRecord::StockAdjustment(adjustment) => {
            if let Some(spec) = posting_rules::stock_adjustment_entry(adjustment) {
                posting_service::post_entry_strict(&mut tx, ctx, &spec).await?;
            }
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Replay historical records into the ledger in fixed order, then validate
/// the trial balance as of `as_of`.
pub async fn replay(
    pool: &PgPool,
    ctx: &PostingContext,
    mut records: Vec<BackfillRecord>,
    as_of: NaiveDate,
) -> Result<BackfillSummary, BackfillError> {
    records.sort_by_key(order_rank);

    let mut summary = BackfillSummary::default();

    for record in &records {
        let counts = match record {
            BackfillRecord::PoReceipt(_) => &mut summary.po_receipts,
            BackfillRecord::Invoice(_) => &mut summary.invoices,
            BackfillRecord::ClientPayment(_) => &mut summary.client_payments,
            BackfillRecord::SupplierPayment(_) => &mut summary.supplier_payments,
            BackfillRecord::Expense(_) => &mut summary.expenses,
            BackfillRecord::StockAdjustment(_) => &mut summary.stock_adjustments,
        };

        if !is_postable(record) {
            counts.skipped += 1;
            continue;
        }

        let (reference_type, reference_id) = reference_of(record);
        if journal_repo::exists_for_reference(
            pool,
            &ctx.tenant_id,
            reference_type.as_str(),
            &reference_id,
        )
        .await?
        {
            counts.skipped += 1;
            continue;
        }

        replay_one(pool, ctx, record).await?;
        counts.processed += 1;
    }

    let (total_debits, total_credits) =
        journal_repo::trial_balance_totals(pool, &ctx.tenant_id, as_of).await?;

    summary.total_debits_minor = total_debits;
    summary.total_credits_minor = total_credits;
    summary.trial_balanced = (total_debits - total_credits).abs() <= BALANCE_TOLERANCE_MINOR;

    if summary.trial_balanced {
        tracing::info!(
            tenant_id = %ctx.tenant_id,
            processed = summary.total_processed(),
            skipped = summary.total_skipped(),
            total_debits_minor = total_debits,
            total_credits_minor = total_credits,
            "Backfill complete, trial balance OK"
        );
    } else {
        tracing::warn!(
            tenant_id = %ctx.tenant_id,
            total_debits_minor = total_debits,
            total_credits_minor = total_credits,
            "Backfill complete but trial balance does NOT balance"
        );
    }

    Ok(summary)
}

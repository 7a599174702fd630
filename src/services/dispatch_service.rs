//! Stock issue orchestration for invoice and delivery dispatch
//!
//! Ties the FIFO engine to the posting service: availability is checked
//! before any side effect, batches are consumed and movements recorded,
//! and the A/R and COGS entries are posted — all inside the one
//! transaction the caller owns, so a failure anywhere leaves no partial
//! journal or inventory state.

use sqlx::{Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::repos::inventory_repo::MovementType;
use crate::services::fifo_service::{self, BatchDeduction, FifoError, MovementContext};
use crate::services::posting_rules::{DeliveryPosting, InvoicePosting, ReferenceType};
use crate::services::posting_service::{self, InvoiceEntries, PostingContext, PostingError};

/// Errors raised while dispatching stock
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Fifo(#[from] FifoError),

    #[error(transparent)]
    Posting(#[from] PostingError),
}

/// One product line leaving the warehouse
#[derive(Debug, Clone)]
pub struct StockIssueLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i64,
}

/// What a dispatch consumed and posted
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub entries: InvoiceEntries,
    pub cogs_minor: i64,
    pub deductions: Vec<BatchDeduction>,
}

/// Check every line's availability before touching anything, so the whole
/// business transaction can be rejected with a precise shortfall message
/// and zero side effects.
async fn assert_availability(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    warehouse_id: Uuid,
    items: &[StockIssueLine],
) -> Result<(), FifoError> {
    for item in items {
        if item.quantity <= 0 {
            return Err(FifoError::InvalidQuantity(item.quantity));
        }

        let available = fifo_service::get_available_quantity(
            tx,
            tenant_id,
            item.product_id,
            warehouse_id,
            item.variant_id,
        )
        .await?;

        if available < item.quantity {
            return Err(FifoError::InsufficientStock {
                available,
                required: item.quantity,
            });
        }
    }

    Ok(())
}

async fn consume_items(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    warehouse_id: Uuid,
    items: &[StockIssueLine],
    reference_type: ReferenceType,
    reference_id: &str,
    document_number: &str,
) -> Result<(i64, Vec<BatchDeduction>), FifoError> {
    let mut all_deductions = Vec::new();
    let mut cogs_minor = 0;

    for item in items {
        let deductions = fifo_service::deduct_stock_fifo(
            tx,
            &ctx.tenant_id,
            item.product_id,
            warehouse_id,
            item.variant_id,
            item.quantity,
            &MovementContext {
                movement_type: MovementType::Sale,
                reference_type,
                reference_id: reference_id.to_string(),
                notes: Some(document_number.to_string()),
            },
            &ctx.user_id,
        )
        .await?;

        cogs_minor += fifo_service::cogs_total(&deductions);
        all_deductions.extend(deductions);
    }

    Ok((cogs_minor, all_deductions))
}

/// Invoice created in simple mode (no delivery note): deduct stock FIFO,
/// record movements, post A/R and batch-cost COGS.
pub async fn post_invoice_with_stock(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    invoice: &InvoicePosting,
    warehouse_id: Uuid,
    items: &[StockIssueLine],
) -> Result<DispatchOutcome, DispatchError> {
    assert_availability(tx, &ctx.tenant_id, warehouse_id, items).await?;

    let (cogs_minor, deductions) = consume_items(
        tx,
        ctx,
        warehouse_id,
        items,
        ReferenceType::Invoice,
        &invoice.invoice_id,
        &format!("Invoice {}", invoice.invoice_number),
    )
    .await?;

    let entries = posting_service::post_invoice_created(tx, ctx, invoice, cogs_minor).await?;

    tracing::info!(
        tenant_id = %ctx.tenant_id,
        invoice_number = %invoice.invoice_number,
        cogs_minor,
        batches_consumed = deductions.len(),
        "Invoice dispatched with FIFO stock deduction"
    );

    Ok(DispatchOutcome {
        entries,
        cogs_minor,
        deductions,
    })
}

/// Delivery note dispatched in full mode: stock leaves the warehouse now,
/// COGS posts now; the later invoice posts A/R only.
pub async fn post_delivery_with_stock(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    delivery: &DeliveryPosting,
    warehouse_id: Uuid,
    items: &[StockIssueLine],
) -> Result<DispatchOutcome, DispatchError> {
    assert_availability(tx, &ctx.tenant_id, warehouse_id, items).await?;

    let (cogs_minor, deductions) = consume_items(
        tx,
        ctx,
        warehouse_id,
        items,
        ReferenceType::DeliveryNote,
        &delivery.delivery_note_id,
        &format!("Delivery Note {}", delivery.delivery_note_number),
    )
    .await?;

    let cogs_entry_id =
        posting_service::post_delivery_dispatched(tx, ctx, delivery, cogs_minor).await?;

    Ok(DispatchOutcome {
        entries: InvoiceEntries {
            ar_entry_id: None,
            cogs_entry_id,
        },
        cogs_minor,
        deductions,
    })
}

/// Void an invoice: restore its stock to the original batches and post the
/// mirror A/R and COGS entries. `items` and `deductions` come from the
/// invoice being voided (its lines and recorded batch consumption).
pub async fn void_invoice_with_restock(
    tx: &mut Transaction<'_, Postgres>,
    ctx: &PostingContext,
    invoice: &InvoicePosting,
    warehouse_id: Uuid,
    items: &[(StockIssueLine, Vec<BatchDeduction>)],
    void_date: chrono::NaiveDate,
) -> Result<InvoiceEntries, DispatchError> {
    let mut cogs_minor = 0;

    for (item, deductions) in items {
        fifo_service::restock_deductions(
            tx,
            &ctx.tenant_id,
            item.product_id,
            warehouse_id,
            item.variant_id,
            deductions,
            &MovementContext {
                movement_type: MovementType::Sale,
                reference_type: ReferenceType::Invoice,
                reference_id: invoice.invoice_id.clone(),
                notes: Some(format!("Void Invoice {}", invoice.invoice_number)),
            },
            &ctx.user_id,
        )
        .await?;

        cogs_minor += fifo_service::cogs_total(deductions);
    }

    let entries =
        posting_service::post_invoice_voided(tx, ctx, invoice, cogs_minor, void_date).await?;

    Ok(entries)
}

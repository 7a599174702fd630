//! FIFO inventory deduction
//!
//! Sales consume inventory batches oldest-first so COGS reflects the cost
//! actually paid for the units sold. Planning is pure and side-effect
//! free; applying a plan decrements batches and emits stock movements, and
//! must run on the same transaction that locked the batch rows.

use sqlx::{Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::repos::inventory_repo::{
    self, InventoryBatch, InventoryError, MovementType, NewBatch, NewMovement,
};
use crate::services::posting_rules::ReferenceType;

/// Errors that can occur during FIFO deduction
#[derive(Debug, Error)]
pub enum FifoError {
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("No stock available for product {product_id} in warehouse {warehouse_id}")]
    NoStock { product_id: Uuid, warehouse_id: Uuid },

    #[error("Insufficient stock: required {required}, available {available}")]
    InsufficientStock { available: i64, required: i64 },

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for FIFO operations
pub type FifoResult<T> = Result<T, FifoError>;

/// Minimal view of a batch for planning
#[derive(Debug, Clone)]
pub struct BatchView {
    pub id: Uuid,
    pub batch_no: Option<String>,
    pub quantity: i64,
    pub unit_cost_minor: i64,
}

impl From<&InventoryBatch> for BatchView {
    fn from(batch: &InventoryBatch) -> Self {
        BatchView {
            id: batch.id,
            batch_no: batch.batch_no.clone(),
            quantity: batch.quantity,
            unit_cost_minor: batch.unit_cost_minor,
        }
    }
}

/// One slice of a deduction plan: how much to take from which batch, at
/// the batch's receipt-time cost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDeduction {
    pub batch_id: Uuid,
    pub batch_no: Option<String>,
    pub quantity: i64,
    pub unit_cost_minor: i64,
}

/// Greedily consume batches oldest-first until the requested quantity is
/// satisfied. Pure: the input slice must already be in FIFO order (the
/// repository query guarantees this). Fails without partial results when
/// total supply is short.
pub fn plan_deductions(batches: &[BatchView], required: i64) -> FifoResult<Vec<BatchDeduction>> {
    if required <= 0 {
        return Err(FifoError::InvalidQuantity(required));
    }

    let available: i64 = batches.iter().map(|b| b.quantity).sum();
    if available < required {
        return Err(FifoError::InsufficientStock {
            available,
            required,
        });
    }

    let mut remaining = required;
    let mut deductions = Vec::new();

    for batch in batches {
        if remaining == 0 {
            break;
        }
        if batch.quantity <= 0 {
            continue;
        }

        let take = remaining.min(batch.quantity);
        deductions.push(BatchDeduction {
            batch_id: batch.id,
            batch_no: batch.batch_no.clone(),
            quantity: take,
            unit_cost_minor: batch.unit_cost_minor,
        });
        remaining -= take;
    }

    debug_assert_eq!(remaining, 0);
    Ok(deductions)
}

/// Total cost of a deduction plan, in minor units. Mixing batches of
/// different cost yields the cost-weighted sum, not a single unit price.
pub fn cogs_total(deductions: &[BatchDeduction]) -> i64 {
    deductions
        .iter()
        .map(|d| d.quantity * d.unit_cost_minor)
        .sum()
}

/// Reference context recorded on the stock movements a deduction emits
#[derive(Debug, Clone)]
pub struct MovementContext {
    pub movement_type: MovementType,
    pub reference_type: ReferenceType,
    pub reference_id: String,
    pub notes: Option<String>,
}

/// Available quantity for a product/variant/warehouse tuple, read on the
/// caller's transaction so a following deduction sees the same snapshot.
pub async fn get_available_quantity(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    product_id: Uuid,
    warehouse_id: Uuid,
    variant_id: Option<Uuid>,
) -> FifoResult<i64> {
    let available =
        inventory_repo::available_quantity_tx(tx, tenant_id, product_id, warehouse_id, variant_id)
            .await?;
    Ok(available)
}

/// Lock the product's batches and plan a FIFO deduction without mutating
/// anything. The row locks hold until the transaction ends, so a plan
/// applied later in the same transaction cannot be invalidated by a
/// concurrent sale.
pub async fn plan_stock_deduction(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    product_id: Uuid,
    warehouse_id: Uuid,
    variant_id: Option<Uuid>,
    required: i64,
) -> FifoResult<Vec<BatchDeduction>> {
    if required <= 0 {
        return Err(FifoError::InvalidQuantity(required));
    }

    let batches = inventory_repo::fetch_batches_for_update(
        tx,
        tenant_id,
        product_id,
        warehouse_id,
        variant_id,
    )
    .await?;

    if batches.is_empty() {
        return Err(FifoError::NoStock {
            product_id,
            warehouse_id,
        });
    }

    let views: Vec<BatchView> = batches.iter().map(BatchView::from).collect();
    plan_deductions(&views, required)
}

/// Apply a deduction plan: decrement each consumed batch (never below
/// zero) and append one stock movement per slice. Must run on the same
/// transaction that produced the plan.
pub async fn apply_deductions(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    product_id: Uuid,
    warehouse_id: Uuid,
    variant_id: Option<Uuid>,
    deductions: &[BatchDeduction],
    movement: &MovementContext,
    user_id: &str,
) -> FifoResult<()> {
    for deduction in deductions {
        inventory_repo::decrement_batch(tx, deduction.batch_id, deduction.quantity).await?;

        inventory_repo::insert_movement(
            tx,
            tenant_id,
            &NewMovement {
                product_id,
                variant_id,
                warehouse_id,
                movement_type: movement.movement_type,
                quantity: -deduction.quantity,
                reference_type: Some(movement.reference_type.as_str().to_string()),
                reference_id: Some(movement.reference_id.clone()),
                notes: movement.notes.clone().or_else(|| {
                    deduction
                        .batch_no
                        .as_ref()
                        .map(|b| format!("Batch {b}"))
                }),
                created_by: user_id.to_string(),
            },
        )
        .await?;

        tracing::debug!(
            batch_id = %deduction.batch_id,
            batch_no = ?deduction.batch_no,
            quantity = deduction.quantity,
            unit_cost_minor = deduction.unit_cost_minor,
            "Applied FIFO deduction"
        );
    }

    Ok(())
}

/// Plan and apply in one call — the common path for invoice/dispatch flows
pub async fn deduct_stock_fifo(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    product_id: Uuid,
    warehouse_id: Uuid,
    variant_id: Option<Uuid>,
    required: i64,
    movement: &MovementContext,
    user_id: &str,
) -> FifoResult<Vec<BatchDeduction>> {
    let deductions =
        plan_stock_deduction(tx, tenant_id, product_id, warehouse_id, variant_id, required).await?;

    apply_deductions(
        tx,
        tenant_id,
        product_id,
        warehouse_id,
        variant_id,
        &deductions,
        movement,
        user_id,
    )
    .await?;

    Ok(deductions)
}

/// Restore previously deducted quantities, e.g. when an invoice is voided.
/// Adds the quantity back to the original batches and appends offsetting
/// movements; the movement history keeps both directions.
pub async fn restock_deductions(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    product_id: Uuid,
    warehouse_id: Uuid,
    variant_id: Option<Uuid>,
    deductions: &[BatchDeduction],
    movement: &MovementContext,
    user_id: &str,
) -> FifoResult<()> {
    for deduction in deductions {
        inventory_repo::restore_batch(tx, deduction.batch_id, deduction.quantity).await?;

        inventory_repo::insert_movement(
            tx,
            tenant_id,
            &NewMovement {
                product_id,
                variant_id,
                warehouse_id,
                movement_type: movement.movement_type,
                quantity: deduction.quantity,
                reference_type: Some(movement.reference_type.as_str().to_string()),
                reference_id: Some(movement.reference_id.clone()),
                notes: movement.notes.clone(),
                created_by: user_id.to_string(),
            },
        )
        .await?;
    }

    Ok(())
}

/// Receive a new batch into a warehouse, snapshotting its unit cost, and
/// record the receipt movement.
pub async fn receive_stock(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    batch: &NewBatch,
    reference_type: ReferenceType,
    reference_id: &str,
    user_id: &str,
) -> FifoResult<Uuid> {
    if batch.quantity <= 0 {
        return Err(FifoError::InvalidQuantity(batch.quantity));
    }

    let batch_id = inventory_repo::insert_batch(tx, tenant_id, batch).await?;

    inventory_repo::insert_movement(
        tx,
        tenant_id,
        &NewMovement {
            product_id: batch.product_id,
            variant_id: batch.variant_id,
            warehouse_id: batch.warehouse_id,
            movement_type: MovementType::Receipt,
            quantity: batch.quantity,
            reference_type: Some(reference_type.as_str().to_string()),
            reference_id: Some(reference_id.to_string()),
            notes: batch.batch_no.as_ref().map(|b| format!("Batch {b}")),
            created_by: user_id.to_string(),
        },
    )
    .await?;

    Ok(batch_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(no: &str, quantity: i64, unit_cost_minor: i64) -> BatchView {
        BatchView {
            id: Uuid::new_v4(),
            batch_no: Some(no.to_string()),
            quantity,
            unit_cost_minor,
        }
    }

    #[test]
    fn consumes_oldest_batch_first() {
        // B1: 10 @ 5.00, B2: 20 @ 6.00; request 15
        let batches = vec![batch("B1", 10, 500), batch("B2", 20, 600)];

        let plan = plan_deductions(&batches, 15).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].batch_no.as_deref(), Some("B1"));
        assert_eq!(plan[0].quantity, 10);
        assert_eq!(plan[0].unit_cost_minor, 500);
        assert_eq!(plan[1].batch_no.as_deref(), Some("B2"));
        assert_eq!(plan[1].quantity, 5);
        assert_eq!(plan[1].unit_cost_minor, 600);
    }

    #[test]
    fn single_batch_satisfies_request() {
        let batches = vec![batch("B1", 10, 500), batch("B2", 20, 600)];
        let plan = plan_deductions(&batches, 10).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].quantity, 10);
    }

    #[test]
    fn insufficient_stock_reports_both_quantities() {
        let batches = vec![batch("B1", 10, 500), batch("B2", 5, 600)];

        let err = plan_deductions(&batches, 50).unwrap_err();
        match err {
            FifoError::InsufficientStock {
                available,
                required,
            } => {
                assert_eq!(available, 15);
                assert_eq!(required, 50);
            }
            other => panic!("Expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn zero_or_negative_request_rejected() {
        let batches = vec![batch("B1", 10, 500)];
        assert!(matches!(
            plan_deductions(&batches, 0),
            Err(FifoError::InvalidQuantity(0))
        ));
        assert!(matches!(
            plan_deductions(&batches, -3),
            Err(FifoError::InvalidQuantity(-3))
        ));
    }

    #[test]
    fn batches_drained_to_exact_total() {
        let batches = vec![batch("B1", 3, 100), batch("B2", 3, 200), batch("B3", 3, 300)];
        let plan = plan_deductions(&batches, 9).unwrap();
        let total: i64 = plan.iter().map(|d| d.quantity).sum();
        assert_eq!(total, 9);
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn mixed_costs_yield_weighted_total() {
        // 10 @ 5.00 + 5 @ 6.00 = 80.00
        let batches = vec![batch("B1", 10, 500), batch("B2", 20, 600)];
        let plan = plan_deductions(&batches, 15).unwrap();
        assert_eq!(cogs_total(&plan), 10 * 500 + 5 * 600);
    }

    #[test]
    fn exhausted_batches_are_skipped() {
        let batches = vec![batch("B0", 0, 400), batch("B1", 10, 500)];
        let plan = plan_deductions(&batches, 5).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].batch_no.as_deref(), Some("B1"));
    }
}

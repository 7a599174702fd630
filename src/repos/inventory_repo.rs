//! Repository for inventory batches and the stock-movement audit trail
//!
//! Batches carry a `unit_cost_minor` snapshot taken at receipt; FIFO
//! deduction reads that snapshot, never the live product master cost.
//! Stock movements are append-only and never updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

/// Movement type enum matching database movement_type
#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "movement_type", rename_all = "lowercase")]
pub enum MovementType {
    Receipt,
    Sale,
    Adjustment,
    Transfer,
}

/// A quantity of a product held at a warehouse, optionally batch-tagged
#[derive(Debug, Clone, FromRow)]
pub struct InventoryBatch {
    pub id: Uuid,
    pub tenant_id: String,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub warehouse_id: Uuid,
    pub batch_no: Option<String>,
    pub quantity: i64,
    pub unit_cost_minor: i64,
    pub received_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Errors that can occur during inventory repository operations
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Batch {batch_id} no longer holds the requested quantity")]
    BatchConflict { batch_id: Uuid },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Total available quantity for a product/variant/warehouse tuple.
/// Read-only pre-check so callers can reject a sale before any mutation.
pub async fn available_quantity_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    product_id: Uuid,
    warehouse_id: Uuid,
    variant_id: Option<Uuid>,
) -> Result<i64, InventoryError> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(quantity), 0)::BIGINT
        FROM inventory_batches
        WHERE tenant_id = $1
          AND product_id = $2
          AND warehouse_id = $3
          AND variant_id IS NOT DISTINCT FROM $4
          AND quantity > 0
        "#,
    )
    .bind(tenant_id)
    .bind(product_id)
    .bind(warehouse_id)
    .bind(variant_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(total)
}

/// Fetch all non-empty batches for a product/variant/warehouse tuple in
/// FIFO order (oldest receipt first), locking the rows for the remainder
/// of the transaction so two concurrent sales cannot consume the same
/// batch twice.
pub async fn fetch_batches_for_update(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    product_id: Uuid,
    warehouse_id: Uuid,
    variant_id: Option<Uuid>,
) -> Result<Vec<InventoryBatch>, InventoryError> {
    let batches = sqlx::query_as::<_, InventoryBatch>(
        r#"
        SELECT id, tenant_id, product_id, variant_id, warehouse_id, batch_no,
               quantity, unit_cost_minor, received_at, created_at
        FROM inventory_batches
        WHERE tenant_id = $1
          AND product_id = $2
          AND warehouse_id = $3
          AND variant_id IS NOT DISTINCT FROM $4
          AND quantity > 0
        ORDER BY received_at ASC, created_at ASC, id ASC
        FOR UPDATE
        "#,
    )
    .bind(tenant_id)
    .bind(product_id)
    .bind(warehouse_id)
    .bind(variant_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(batches)
}

/// Decrement a batch's quantity. The `quantity >= $2` guard makes it
/// impossible to drive a batch below zero even if the caller's plan is
/// stale; zero rows affected surfaces as a conflict.
pub async fn decrement_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: Uuid,
    quantity: i64,
) -> Result<(), InventoryError> {
    let result = sqlx::query(
        r#"
        UPDATE inventory_batches
        SET quantity = quantity - $2
        WHERE id = $1 AND quantity >= $2
        "#,
    )
    .bind(batch_id)
    .bind(quantity)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(InventoryError::BatchConflict { batch_id });
    }

    Ok(())
}

/// Add quantity back to a batch (stock restoration on invoice void)
pub async fn restore_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: Uuid,
    quantity: i64,
) -> Result<(), InventoryError> {
    sqlx::query(
        r#"
        UPDATE inventory_batches
        SET quantity = quantity + $2
        WHERE id = $1
        "#,
    )
    .bind(batch_id)
    .bind(quantity)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// New batch received into a warehouse
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub warehouse_id: Uuid,
    pub batch_no: Option<String>,
    pub quantity: i64,
    pub unit_cost_minor: i64,
    pub received_at: DateTime<Utc>,
}

pub async fn insert_batch(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    batch: &NewBatch,
) -> Result<Uuid, InventoryError> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO inventory_batches
            (id, tenant_id, product_id, variant_id, warehouse_id, batch_no,
             quantity, unit_cost_minor, received_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(batch.product_id)
    .bind(batch.variant_id)
    .bind(batch.warehouse_id)
    .bind(&batch.batch_no)
    .bind(batch.quantity)
    .bind(batch.unit_cost_minor)
    .bind(batch.received_at)
    .execute(&mut **tx)
    .await?;

    Ok(id)
}

/// One row of the append-only stock-movement ledger. Quantity is signed:
/// positive into the warehouse, negative out.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub warehouse_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
}

pub async fn insert_movement(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    movement: &NewMovement,
) -> Result<Uuid, InventoryError> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO stock_movements
            (id, tenant_id, product_id, variant_id, warehouse_id, movement_type,
             quantity, reference_type, reference_id, notes, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .bind(movement.product_id)
    .bind(movement.variant_id)
    .bind(movement.warehouse_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(&movement.reference_type)
    .bind(&movement.reference_id)
    .bind(&movement.notes)
    .bind(&movement.created_by)
    .execute(&mut **tx)
    .await?;

    Ok(id)
}

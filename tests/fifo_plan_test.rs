use ledger_rs::services::fifo_service::{cogs_total, plan_deductions, BatchView, FifoError};
use uuid::Uuid;

fn batch(no: &str, quantity: i64, unit_cost_minor: i64) -> BatchView {
    BatchView {
        id: Uuid::new_v4(),
        batch_no: Some(no.to_string()),
        quantity,
        unit_cost_minor,
    }
}

#[test]
fn test_split_across_two_batches() {
    // B1: 10 @ 5.00, B2: 20 @ 6.00 — request 15
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
fn test_exact_batch_boundary() {
    let batches = vec![batch("B1", 10, 500), batch("B2", 20, 600)];

    let plan = plan_deductions(&batches, 10).unwrap();

    // The second batch must not be touched at all
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].batch_no.as_deref(), Some("B1"));
    assert_eq!(plan[0].quantity, 10);
}

#[test]
fn test_insufficient_stock_carries_quantities() {
    let batches = vec![batch("B1", 10, 500), batch("B2", 5, 600)];

    match plan_deductions(&batches, 50) {
        Err(FifoError::InsufficientStock {
            available,
            required,
        }) => {
            assert_eq!(available, 15);
            assert_eq!(required, 50);
        }
        other => panic!("Expected InsufficientStock, got {other:?}"),
    }
}

#[test]
fn test_no_partial_plan_on_shortfall() {
    // A failed plan must be all-or-nothing: the error carries no slices
    let batches = vec![batch("B1", 3, 100)];
    assert!(plan_deductions(&batches, 4).is_err());
}

#[test]
fn test_requested_total_always_satisfied() {
    let batches = vec![
        batch("B1", 7, 100),
        batch("B2", 11, 110),
        batch("B3", 13, 120),
    ];

    for required in 1..=31 {
        let plan = plan_deductions(&batches, required).unwrap();
        let total: i64 = plan.iter().map(|d| d.quantity).sum();
        assert_eq!(total, required, "requested {required}");

        // No slice may exceed its batch's quantity
        for (slice, view) in plan.iter().zip(batches.iter()) {
            assert!(slice.quantity <= view.quantity);
        }
    }
}

#[test]
fn test_weighted_cogs_across_costs() {
    let batches = vec![batch("B1", 10, 500), batch("B2", 20, 600)];
    let plan = plan_deductions(&batches, 15).unwrap();

    // 10 @ 5.00 + 5 @ 6.00 = 80.00, not 15 units at either single price
    assert_eq!(cogs_total(&plan), 8_000);
}

#[test]
fn test_invalid_quantities_rejected() {
    let batches = vec![batch("B1", 10, 500)];
    assert!(matches!(
        plan_deductions(&batches, 0),
        Err(FifoError::InvalidQuantity(0))
    ));
    assert!(matches!(
        plan_deductions(&batches, -1),
        Err(FifoError::InvalidQuantity(-1))
    ));
}

#[test]
fn test_untagged_batches_still_deduct() {
    let batches = vec![BatchView {
        id: Uuid::new_v4(),
        batch_no: None,
        quantity: 8,
        unit_cost_minor: 250,
    }];

    let plan = plan_deductions(&batches, 8).unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].batch_no, None);
    assert_eq!(cogs_total(&plan), 2_000);
}

use chrono::NaiveDate;
use ledger_rs::coa::{self, AdjustmentType, ExpenseCategory, PaymentMethod};
use ledger_rs::services::posting_rules::{
    self, AdjustmentPosting, CreditNotePosting, ExpensePosting, GoodsReceiptPosting,
    InvoicePosting, LandedCostPosting, LineSpec, PaymentPosting, ReferenceType,
};
use ledger_rs::validation;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn totals(lines: &[LineSpec]) -> (i64, i64) {
    (
        lines.iter().map(|l| l.debit_minor).sum(),
        lines.iter().map(|l| l.credit_minor).sum(),
    )
}

fn assert_balanced(lines: &[LineSpec]) {
    let (debits, credits) = totals(lines);
    assert_eq!(debits, credits, "entry must balance: {lines:?}");
    assert!(validation::validate_line_set(lines).is_ok());
}

#[test]
fn test_invoice_posting_table() {
    // Subtotal 1000.00, tax 170.00, total 1170.00:
    // A/R += 1170, Sales Revenue += 1000, Tax Payable += 170
    let invoice = InvoicePosting {
        invoice_id: "inv_77".to_string(),
        invoice_number: "INV-0077".to_string(),
        date: date(2026, 4, 2),
        subtotal_minor: 100_000,
        tax_minor: 17_000,
        total_minor: 117_000,
    };

    let entry = posting_rules::invoice_entry(&invoice);

    let ar = entry
        .lines
        .iter()
        .find(|l| l.account_code == coa::ACCOUNTS_RECEIVABLE)
        .unwrap();
    assert_eq!(ar.debit_minor, 117_000);

    let sales = entry
        .lines
        .iter()
        .find(|l| l.account_code == coa::SALES_REVENUE)
        .unwrap();
    assert_eq!(sales.credit_minor, 100_000);

    let tax = entry
        .lines
        .iter()
        .find(|l| l.account_code == coa::TAX_PAYABLE)
        .unwrap();
    assert_eq!(tax.credit_minor, 17_000);

    assert_balanced(&entry.lines);
    assert_eq!(entry.reference_type, ReferenceType::Invoice);
    assert_eq!(entry.reference_id.as_deref(), Some("inv_77"));
}

#[test]
fn test_goods_received_posting_table() {
    // Amount 1000.00, no tax: Inventory debit 1000, A/P credit 1000
    let receipt = GoodsReceiptPosting {
        po_id: "po_5".to_string(),
        po_number: "PO-0005".to_string(),
        date: date(2026, 4, 1),
        total_minor: 100_000,
        tax_minor: 0,
    };

    let entry = posting_rules::goods_received_entry(&receipt);
    assert_eq!(entry.lines.len(), 2);
    assert_eq!(entry.lines[0].account_code, coa::INVENTORY);
    assert_eq!(entry.lines[0].debit_minor, 100_000);
    assert_eq!(entry.lines[1].account_code, coa::ACCOUNTS_PAYABLE);
    assert_eq!(entry.lines[1].credit_minor, 100_000);
    assert_balanced(&entry.lines);
}

#[test]
fn test_goods_received_with_input_tax() {
    let receipt = GoodsReceiptPosting {
        po_id: "po_6".to_string(),
        po_number: "PO-0006".to_string(),
        date: date(2026, 4, 1),
        total_minor: 117_000,
        tax_minor: 17_000,
    };

    let entry = posting_rules::goods_received_entry(&receipt);
    let input_tax = entry
        .lines
        .iter()
        .find(|l| l.account_code == coa::INPUT_TAX_RECEIVABLE)
        .unwrap();
    assert_eq!(input_tax.debit_minor, 17_000);
    assert_balanced(&entry.lines);
}

#[test]
fn test_every_reversal_mirrors_its_original() {
    let when = date(2026, 4, 3);

    let invoice = InvoicePosting {
        invoice_id: "inv_1".to_string(),
        invoice_number: "INV-0001".to_string(),
        date: when,
        subtotal_minor: 100_000,
        tax_minor: 17_000,
        total_minor: 117_000,
    };
    let receipt = GoodsReceiptPosting {
        po_id: "po_1".to_string(),
        po_number: "PO-0001".to_string(),
        date: when,
        total_minor: 117_000,
        tax_minor: 17_000,
    };
    let cost = LandedCostPosting {
        reference_id: "grn_1".to_string(),
        document_number: "GRN-0001".to_string(),
        cost_type: "shipping".to_string(),
        amount_minor: 12_000,
        date: when,
    };
    let expense = ExpensePosting {
        expense_id: "exp_1".to_string(),
        amount_minor: 30_000,
        category: ExpenseCategory::Utilities,
        description: "Electricity".to_string(),
        date: when,
        payment_method: PaymentMethod::Bank,
    };
    let credit_note = CreditNotePosting {
        credit_note_id: "cn_1".to_string(),
        credit_note_number: "CN-0001".to_string(),
        total_minor: 15_000,
        date: when,
    };

    let pairs = vec![
        (
            posting_rules::invoice_entry(&invoice).lines,
            posting_rules::invoice_void_entry(&invoice, when).lines,
        ),
        (
            posting_rules::goods_received_entry(&receipt).lines,
            posting_rules::goods_received_reversal_entry(&receipt, when).lines,
        ),
        (
            posting_rules::landed_cost_entry(&cost).lines,
            posting_rules::landed_cost_reversal_entry(&cost, when).lines,
        ),
        (
            posting_rules::expense_entry(&expense).lines,
            posting_rules::expense_reversal_entry(&expense, when).lines,
        ),
        (
            posting_rules::credit_note_entry(&credit_note).lines,
            posting_rules::credit_note_void_entry(&credit_note, when).lines,
        ),
    ];

    for (original, reversal) in pairs {
        assert_eq!(original.len(), reversal.len());
        assert_balanced(&original);
        assert_balanced(&reversal);
        for (orig, rev) in original.iter().zip(reversal.iter()) {
            assert_eq!(orig.account_code, rev.account_code);
            assert_eq!(orig.debit_minor, rev.credit_minor);
            assert_eq!(orig.credit_minor, rev.debit_minor);
        }
    }
}

#[test]
fn test_payment_entries_resolve_bank_side() {
    let payment = PaymentPosting {
        payment_id: "pay_3".to_string(),
        amount_minor: 45_000,
        date: date(2026, 4, 8),
        reference_number: None,
        bank_account_id: None,
    };

    let client = posting_rules::client_payment_entry(&payment, "1103");
    assert_eq!(client.lines[0].account_code, "1103");
    assert_eq!(client.lines[1].account_code, coa::ACCOUNTS_RECEIVABLE);
    assert_balanced(&client.lines);

    let supplier = posting_rules::supplier_payment_entry(&payment, coa::MAIN_BANK);
    assert_eq!(supplier.lines[0].account_code, coa::ACCOUNTS_PAYABLE);
    assert_eq!(supplier.lines[1].account_code, coa::MAIN_BANK);
    assert_balanced(&supplier.lines);
}

#[test]
fn test_expense_category_account_mapping() {
    let base = ExpensePosting {
        expense_id: "exp_9".to_string(),
        amount_minor: 10_000,
        category: ExpenseCategory::Salaries,
        description: "Payroll".to_string(),
        date: date(2026, 4, 30),
        payment_method: PaymentMethod::Bank,
    };

    let entry = posting_rules::expense_entry(&base);
    assert_eq!(entry.lines[0].account_code, "5400");
    assert_eq!(entry.lines[1].account_code, coa::MAIN_BANK);

    let mut cash_misc = base;
    cash_misc.category = ExpenseCategory::Supplies;
    cash_misc.payment_method = PaymentMethod::Cash;
    let entry = posting_rules::expense_entry(&cash_misc);
    assert_eq!(entry.lines[0].account_code, coa::OTHER_EXPENSES);
    assert_eq!(entry.lines[1].account_code, coa::PETTY_CASH);
}

#[test]
fn test_adjustment_loss_gate() {
    let mut adjustment = AdjustmentPosting {
        adjustment_id: "adj_2".to_string(),
        adjustment_type: AdjustmentType::Damage,
        quantity: -3,
        unit_cost_minor: 4_000,
        reason: "Forklift damage".to_string(),
        date: date(2026, 4, 12),
    };

    // Quantity sign must not matter for the loss amount
    let entry = posting_rules::stock_adjustment_entry(&adjustment).unwrap();
    assert_eq!(entry.lines[0].account_code, coa::INVENTORY_LOSS);
    assert_eq!(entry.lines[0].debit_minor, 12_000);
    assert_balanced(&entry.lines);

    adjustment.adjustment_type = AdjustmentType::Increase;
    assert!(posting_rules::stock_adjustment_entry(&adjustment).is_none());
}

//! Posting rules: business events to journal lines
//!
//! One typed payload per business event and a pure builder that turns it
//! into a balanced line set. Builders reference accounts by stable code
//! (see `coa`); resolution to ids happens later in the posting service.
//! Voids and reversals never touch history: they produce the mirror image
//! of the original lines as a brand-new entry.
//!
//! Standard postings:
//!
//! | Event                     | Debit                     | Credit                      |
//! |---------------------------|---------------------------|-----------------------------|
//! | Invoice created           | A/R 1200 = total          | Sales 4100 = subtotal; Tax 2200 = tax |
//! | COGS at invoice/dispatch  | COGS 5100                 | Inventory 1300              |
//! | Client payment            | Bank (resolved)           | A/R 1200                    |
//! | Supplier payment          | A/P 2100                  | Bank (resolved)             |
//! | Goods received            | Inventory 1300; 1350 tax  | A/P 2100 = total            |
//! | Landed cost added         | Inventory 1300            | A/P 2100                    |
//! | Expense                   | 5xxx by category          | Petty cash 1102 / bank 1101 |
//! | Stock adjustment (loss)   | Inventory Loss 5150       | Inventory 1300              |
//! | Credit note               | Other Income 4200         | A/R 1200                    |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coa::{self, AdjustmentType, ExpenseCategory, PaymentMethod};

/// Loose foreign key pairing a journal entry to the business object that
/// caused it; used for traceability and idempotent backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    Invoice,
    DeliveryNote,
    Payment,
    Po,
    Expense,
    Adjustment,
    CreditNote,
    PeriodClose,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Invoice => "INVOICE",
            ReferenceType::DeliveryNote => "DELIVERY_NOTE",
            ReferenceType::Payment => "PAYMENT",
            ReferenceType::Po => "PO",
            ReferenceType::Expense => "EXPENSE",
            ReferenceType::Adjustment => "ADJUSTMENT",
            ReferenceType::CreditNote => "CREDIT_NOTE",
            ReferenceType::PeriodClose => "PERIOD_CLOSE",
        }
    }
}

impl std::fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One journal leg expressed against a stable account code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSpec {
    pub account_code: String,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub description: Option<String>,
}

impl LineSpec {
    pub fn debit(code: &str, amount_minor: i64, description: impl Into<String>) -> Self {
        LineSpec {
            account_code: code.to_string(),
            debit_minor: amount_minor,
            credit_minor: 0,
            description: Some(description.into()),
        }
    }

    pub fn credit(code: &str, amount_minor: i64, description: impl Into<String>) -> Self {
        LineSpec {
            account_code: code.to_string(),
            debit_minor: 0,
            credit_minor: amount_minor,
            description: Some(description.into()),
        }
    }
}

/// A fully described entry ready for the posting service
#[derive(Debug, Clone)]
pub struct EntrySpec {
    pub entry_date: NaiveDate,
    pub description: String,
    pub reference_type: ReferenceType,
    pub reference_id: Option<String>,
    pub lines: Vec<LineSpec>,
}

/// Mirror image of a line set: every debit becomes a credit and vice
/// versa. Reversal entries are built from this, never by mutating the
/// original entry.
pub fn reversed(lines: &[LineSpec]) -> Vec<LineSpec> {
    lines
        .iter()
        .map(|line| LineSpec {
            account_code: line.account_code.clone(),
            debit_minor: line.credit_minor,
            credit_minor: line.debit_minor,
            description: line.description.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePosting {
    pub invoice_id: String,
    pub invoice_number: String,
    pub date: NaiveDate,
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub total_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPosting {
    pub payment_id: String,
    pub amount_minor: i64,
    pub date: NaiveDate,
    pub reference_number: Option<String>,
    /// Chosen bank account head; None falls back to the main bank account
    pub bank_account_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsReceiptPosting {
    pub po_id: String,
    pub po_number: String,
    pub date: NaiveDate,
    /// Product cost plus input tax
    pub total_minor: i64,
    pub tax_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandedCostPosting {
    pub reference_id: String,
    pub document_number: String,
    pub cost_type: String,
    pub amount_minor: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpensePosting {
    pub expense_id: String,
    pub amount_minor: i64,
    pub category: ExpenseCategory,
    pub description: String,
    pub date: NaiveDate,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentPosting {
    pub adjustment_id: String,
    pub adjustment_type: AdjustmentType,
    pub quantity: i64,
    pub unit_cost_minor: i64,
    pub reason: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditNotePosting {
    pub credit_note_id: String,
    pub credit_note_number: String,
    pub total_minor: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPosting {
    pub delivery_note_id: String,
    pub delivery_note_number: String,
    pub date: NaiveDate,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Invoice created: DR A/R (1200)  CR Sales Revenue (4100) + Tax Payable (2200)
pub fn invoice_entry(invoice: &InvoicePosting) -> EntrySpec {
    let mut lines = vec![
        LineSpec::debit(
            coa::ACCOUNTS_RECEIVABLE,
            invoice.total_minor,
            format!("A/R for {}", invoice.invoice_number),
        ),
        LineSpec::credit(
            coa::SALES_REVENUE,
            invoice.subtotal_minor,
            format!("Sales revenue {}", invoice.invoice_number),
        ),
    ];

    if invoice.tax_minor > 0 {
        lines.push(LineSpec::credit(
            coa::TAX_PAYABLE,
            invoice.tax_minor,
            format!("Tax payable {}", invoice.invoice_number),
        ));
    }

    EntrySpec {
        entry_date: invoice.date,
        description: format!("Invoice {}", invoice.invoice_number),
        reference_type: ReferenceType::Invoice,
        reference_id: Some(invoice.invoice_id.clone()),
        lines,
    }
}

/// Invoice voided: mirror of the original A/R entry, dated at void time
pub fn invoice_void_entry(invoice: &InvoicePosting, void_date: NaiveDate) -> EntrySpec {
    EntrySpec {
        entry_date: void_date,
        description: format!("Void Invoice {}", invoice.invoice_number),
        reference_type: ReferenceType::Invoice,
        reference_id: Some(invoice.invoice_id.clone()),
        lines: reversed(&invoice_entry(invoice).lines),
    }
}

/// COGS at invoice or dispatch: DR COGS (5100)  CR Inventory (1300).
/// The amount is the batch-cost sum from the FIFO deduction.
pub fn cogs_entry(
    reference_type: ReferenceType,
    reference_id: &str,
    document_number: &str,
    date: NaiveDate,
    cogs_minor: i64,
) -> EntrySpec {
    EntrySpec {
        entry_date: date,
        description: format!("COGS for {document_number}"),
        reference_type,
        reference_id: Some(reference_id.to_string()),
        lines: vec![
            LineSpec::debit(coa::COST_OF_GOODS_SOLD, cogs_minor, "Cost of Goods Sold"),
            LineSpec::credit(coa::INVENTORY, cogs_minor, "Inventory reduction"),
        ],
    }
}

/// Reverse COGS on invoice void: DR Inventory (1300)  CR COGS (5100)
pub fn cogs_reversal_entry(
    reference_type: ReferenceType,
    reference_id: &str,
    document_number: &str,
    date: NaiveDate,
    cogs_minor: i64,
) -> EntrySpec {
    EntrySpec {
        entry_date: date,
        description: format!("Reverse COGS for {document_number}"),
        reference_type,
        reference_id: Some(reference_id.to_string()),
        lines: vec![
            LineSpec::debit(coa::INVENTORY, cogs_minor, "Inventory restoration"),
            LineSpec::credit(coa::COST_OF_GOODS_SOLD, cogs_minor, "Reverse COGS"),
        ],
    }
}

/// Client payment: DR Bank  CR A/R (1200).
/// `bank_code` is pre-resolved by the posting service (default 1101).
pub fn client_payment_entry(payment: &PaymentPosting, bank_code: &str) -> EntrySpec {
    let suffix = payment
        .reference_number
        .as_ref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default();

    EntrySpec {
        entry_date: payment.date,
        description: format!("Client payment received{suffix}"),
        reference_type: ReferenceType::Payment,
        reference_id: Some(payment.payment_id.clone()),
        lines: vec![
            LineSpec::debit(bank_code, payment.amount_minor, "Bank deposit"),
            LineSpec::credit(coa::ACCOUNTS_RECEIVABLE, payment.amount_minor, "A/R reduction"),
        ],
    }
}

/// Supplier payment: DR A/P (2100)  CR Bank
pub fn supplier_payment_entry(payment: &PaymentPosting, bank_code: &str) -> EntrySpec {
    let suffix = payment
        .reference_number
        .as_ref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default();

    EntrySpec {
        entry_date: payment.date,
        description: format!("Supplier payment{suffix}"),
        reference_type: ReferenceType::Payment,
        reference_id: Some(payment.payment_id.clone()),
        lines: vec![
            LineSpec::debit(coa::ACCOUNTS_PAYABLE, payment.amount_minor, "A/P reduction"),
            LineSpec::credit(bank_code, payment.amount_minor, "Bank payment"),
        ],
    }
}

/// PO receipt: DR Inventory (1300) + DR Input Tax Receivable (1350)  CR A/P (2100).
/// `total_minor` includes input tax; the inventory leg is cost net of tax.
pub fn goods_received_entry(receipt: &GoodsReceiptPosting) -> EntrySpec {
    let product_cost = receipt.total_minor - receipt.tax_minor;

    let mut lines = vec![
        LineSpec::debit(
            coa::INVENTORY,
            product_cost,
            format!("Inventory from {}", receipt.po_number),
        ),
        LineSpec::credit(
            coa::ACCOUNTS_PAYABLE,
            receipt.total_minor,
            format!("A/P for {}", receipt.po_number),
        ),
    ];

    if receipt.tax_minor > 0 {
        lines.push(LineSpec::debit(
            coa::INPUT_TAX_RECEIVABLE,
            receipt.tax_minor,
            format!("Input Tax Receivable {}", receipt.po_number),
        ));
    }

    EntrySpec {
        entry_date: receipt.date,
        description: format!("Goods received: {}", receipt.po_number),
        reference_type: ReferenceType::Po,
        reference_id: Some(receipt.po_id.clone()),
        lines,
    }
}

/// GRN cancelled: mirror of the goods-received entry
pub fn goods_received_reversal_entry(
    receipt: &GoodsReceiptPosting,
    reversal_date: NaiveDate,
) -> EntrySpec {
    EntrySpec {
        entry_date: reversal_date,
        description: format!("Reverse goods received: {}", receipt.po_number),
        reference_type: ReferenceType::Po,
        reference_id: Some(receipt.po_id.clone()),
        lines: reversed(&goods_received_entry(receipt).lines),
    }
}

/// PO/GRN landed cost added: DR Inventory (1300)  CR A/P (2100)
pub fn landed_cost_entry(cost: &LandedCostPosting) -> EntrySpec {
    EntrySpec {
        entry_date: cost.date,
        description: format!(
            "Additional cost ({}): {}",
            cost.cost_type, cost.document_number
        ),
        reference_type: ReferenceType::Po,
        reference_id: Some(cost.reference_id.clone()),
        lines: vec![
            LineSpec::debit(
                coa::INVENTORY,
                cost.amount_minor,
                format!("Landed cost ({}) for {}", cost.cost_type, cost.document_number),
            ),
            LineSpec::credit(
                coa::ACCOUNTS_PAYABLE,
                cost.amount_minor,
                format!("A/P for {} ({})", cost.cost_type, cost.document_number),
            ),
        ],
    }
}

/// Landed cost reversal on cancellation: DR A/P (2100)  CR Inventory (1300)
pub fn landed_cost_reversal_entry(
    cost: &LandedCostPosting,
    reversal_date: NaiveDate,
) -> EntrySpec {
    EntrySpec {
        entry_date: reversal_date,
        description: format!(
            "Reverse additional cost ({}): {}",
            cost.cost_type, cost.document_number
        ),
        reference_type: ReferenceType::Po,
        reference_id: Some(cost.reference_id.clone()),
        lines: reversed(&landed_cost_entry(cost).lines),
    }
}

/// Expense: DR mapped expense account (5xxx)  CR Petty Cash (1102) or Bank (1101)
pub fn expense_entry(expense: &ExpensePosting) -> EntrySpec {
    let expense_code = expense.category.account_code();
    let credit_code = expense.payment_method.settlement_account_code();
    let credit_note = match expense.payment_method {
        PaymentMethod::Cash => "Petty cash",
        PaymentMethod::Bank => "Bank payment",
    };

    EntrySpec {
        entry_date: expense.date,
        description: format!("Expense: {}", expense.description),
        reference_type: ReferenceType::Expense,
        reference_id: Some(expense.expense_id.clone()),
        lines: vec![
            LineSpec::debit(expense_code, expense.amount_minor, expense.category.label()),
            LineSpec::credit(credit_code, expense.amount_minor, credit_note),
        ],
    }
}

/// Expense deleted: mirror of the expense entry, dated at reversal time
pub fn expense_reversal_entry(expense: &ExpensePosting, reversal_date: NaiveDate) -> EntrySpec {
    EntrySpec {
        entry_date: reversal_date,
        description: format!("Reverse expense: {}", expense.description),
        reference_type: ReferenceType::Expense,
        reference_id: Some(expense.expense_id.clone()),
        lines: reversed(&expense_entry(expense).lines),
    }
}

/// Stock adjustment approved: DR Inventory Loss (5150)  CR Inventory (1300).
///
/// Only loss types (WASTAGE, DAMAGE, THEFT) produce entries; count
/// corrections and increases return None. Zero-value losses also return
/// None so the ledger is not littered with empty entries.
pub fn stock_adjustment_entry(adjustment: &AdjustmentPosting) -> Option<EntrySpec> {
    if !adjustment.adjustment_type.is_loss() {
        return None;
    }

    let amount = adjustment.quantity.abs() * adjustment.unit_cost_minor;
    if amount <= 0 {
        return None;
    }

    Some(EntrySpec {
        entry_date: adjustment.date,
        description: format!("Stock adjustment: {}", adjustment.reason),
        reference_type: ReferenceType::Adjustment,
        reference_id: Some(adjustment.adjustment_id.clone()),
        lines: vec![
            LineSpec::debit(coa::INVENTORY_LOSS, amount, "Inventory loss"),
            LineSpec::credit(coa::INVENTORY, amount, "Inventory reduction"),
        ],
    })
}

/// Credit note: DR Other Income/Returns (4200)  CR A/R (1200)
pub fn credit_note_entry(credit_note: &CreditNotePosting) -> EntrySpec {
    EntrySpec {
        entry_date: credit_note.date,
        description: format!("Credit note {}", credit_note.credit_note_number),
        reference_type: ReferenceType::CreditNote,
        reference_id: Some(credit_note.credit_note_id.clone()),
        lines: vec![
            LineSpec::debit(
                coa::OTHER_INCOME,
                credit_note.total_minor,
                format!("Returns {}", credit_note.credit_note_number),
            ),
            LineSpec::credit(
                coa::ACCOUNTS_RECEIVABLE,
                credit_note.total_minor,
                format!("A/R reduction {}", credit_note.credit_note_number),
            ),
        ],
    }
}

/// Credit note voided: mirror of the credit-note entry
pub fn credit_note_void_entry(
    credit_note: &CreditNotePosting,
    void_date: NaiveDate,
) -> EntrySpec {
    EntrySpec {
        entry_date: void_date,
        description: format!("Void credit note {}", credit_note.credit_note_number),
        reference_type: ReferenceType::CreditNote,
        reference_id: Some(credit_note.credit_note_id.clone()),
        lines: reversed(&credit_note_entry(credit_note).lines),
    }
}

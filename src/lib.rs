//! Double-entry general ledger core for a trading ERP.
//!
//! The crate turns business events (invoices, payments, goods receipts,
//! expenses, stock adjustments) into balanced POSTED journal entries,
//! maintains running account balances, deducts inventory on a FIFO basis to
//! cost sales, and performs month-end closing into Retained Earnings.
//!
//! HTTP routing, request validation, auth, and audit logging live in the
//! surrounding application; callers invoke the services here with
//! fully-formed payloads on their own database transaction.

pub mod coa;
pub mod config;
pub mod db;
pub mod repos;
pub mod services;
pub mod validation;

pub use config::Config;
pub use services::posting_service::PostingContext;

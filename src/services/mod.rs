pub mod backfill_service;
pub mod balance_rules;
pub mod dispatch_service;
pub mod entry_number;
pub mod fifo_service;
pub mod period_close_service;
pub mod posting_rules;
pub mod posting_service;

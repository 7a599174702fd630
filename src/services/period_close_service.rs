//! Month-end period close
//!
//! Verifies the trial balance, computes each revenue and expense account's
//! net movement for the month, posts a closing entry that zeroes them into
//! Retained Earnings, and records the close. Reopening is an
//! administrative acknowledgment: it flips the record's status and keeps
//! the closing entry untouched.

use chrono::{Days, Months, NaiveDate};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::coa;
use crate::repos::account_repo::{self, AccountType};
use crate::repos::journal_repo::{self, AccountPeriodTotals};
use crate::repos::period_close_repo::{self, PeriodClose, PeriodStatus};
use crate::services::posting_rules::{EntrySpec, LineSpec, ReferenceType};
use crate::services::posting_service::{self, PostingContext, PostingError};
use crate::validation::BALANCE_TOLERANCE_MINOR;

/// Errors that can occur during period close operations
#[derive(Debug, Error)]
pub enum CloseError {
    #[error("Invalid period: {year}-{month}")]
    InvalidPeriod { year: i32, month: u32 },

    #[error("Period {year}-{month:02} is already closed")]
    AlreadyClosed { year: i32, month: u32 },

    #[error("Period {year}-{month:02} was closed and reopened; close it again only after correcting the earlier closing entry")]
    ReopenedPeriod { year: i32, month: u32 },

    #[error("Trial balance is not balanced: debits={debits_minor}, credits={credits_minor}")]
    TrialBalanceMismatch { debits_minor: i64, credits_minor: i64 },

    #[error("System account {0} not found; cannot close period")]
    MissingSystemAccount(String),

    #[error("Period close record not found: {0}")]
    NotFound(Uuid),

    #[error("Period is already reopened")]
    AlreadyReopened,

    #[error("Reopen reason is required")]
    ReasonRequired,

    #[error(transparent)]
    Posting(#[from] PostingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for close operations
pub type CloseResult<T> = Result<T, CloseError>;

/// First and last calendar day of a month
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = start
        .checked_add_months(Months::new(1))?
        .checked_sub_days(Days::new(1))?;
    Some((start, end))
}

/// Net in-period movement of one revenue or expense account
#[derive(Debug, Clone)]
pub struct AccountNet {
    pub code: String,
    pub net_minor: i64,
}

/// Split per-account totals into revenue and expense nets and compute net
/// profit. Revenue accounts are credit-normal (net = credit - debit),
/// expense accounts debit-normal (net = debit - credit).
pub fn compute_nets(rows: &[AccountPeriodTotals]) -> (Vec<AccountNet>, Vec<AccountNet>, i64) {
    let mut revenue = Vec::new();
    let mut expense = Vec::new();
    let mut revenue_total = 0;
    let mut expense_total = 0;

    for row in rows {
        match row.account_type {
            AccountType::Revenue => {
                let net = row.credit_minor - row.debit_minor;
                revenue_total += net;
                revenue.push(AccountNet {
                    code: row.code.clone(),
                    net_minor: net,
                });
            }
            AccountType::Expense => {
                let net = row.debit_minor - row.credit_minor;
                expense_total += net;
                expense.push(AccountNet {
                    code: row.code.clone(),
                    net_minor: net,
                });
            }
            _ => {}
        }
    }

    (revenue, expense, revenue_total - expense_total)
}

/// Build the closing line set: debit each revenue net and credit each
/// expense net (zeroing the temporary accounts), then post the net
/// profit/loss to Retained Earnings. Contra balances (negative nets) swap
/// sides; nets below one minor unit are skipped. Returns an empty vec when
/// nothing moved in the period.
pub fn build_closing_lines(
    revenue: &[AccountNet],
    expense: &[AccountNet],
    net_profit_minor: i64,
) -> Vec<LineSpec> {
    let mut lines = Vec::new();

    for account in revenue {
        if account.net_minor.abs() < BALANCE_TOLERANCE_MINOR {
            continue;
        }
        let description = format!("Close revenue {}", account.code);
        if account.net_minor > 0 {
            lines.push(LineSpec::debit(&account.code, account.net_minor, description));
        } else {
            lines.push(LineSpec::credit(
                &account.code,
                account.net_minor.abs(),
                description,
            ));
        }
    }

    for account in expense {
        if account.net_minor.abs() < BALANCE_TOLERANCE_MINOR {
            continue;
        }
        let description = format!("Close expense {}", account.code);
        if account.net_minor > 0 {
            lines.push(LineSpec::credit(&account.code, account.net_minor, description));
        } else {
            lines.push(LineSpec::debit(
                &account.code,
                account.net_minor.abs(),
                description,
            ));
        }
    }

    if net_profit_minor.abs() >= BALANCE_TOLERANCE_MINOR {
        if net_profit_minor > 0 {
            lines.push(LineSpec::credit(
                coa::RETAINED_EARNINGS,
                net_profit_minor,
                "Net profit to Retained Earnings",
            ));
        } else {
            lines.push(LineSpec::debit(
                coa::RETAINED_EARNINGS,
                net_profit_minor.abs(),
                "Net loss to Retained Earnings",
            ));
        }
    }

    lines
}

/// Close a month: verify trial balance, compute net profit, post the
/// closing entry, and record the close — one transaction end to end.
pub async fn close_month(
    pool: &PgPool,
    ctx: &PostingContext,
    year: i32,
    month: u32,
) -> CloseResult<PeriodClose> {
    let (period_start, period_end) =
        month_bounds(year, month).ok_or(CloseError::InvalidPeriod { year, month })?;

    let mut tx = pool.begin().await?;

    // One record per period: an existing CLOSED record rejects outright,
    // and a REOPENED one still blocks because its closing entry was never
    // reversed (re-closing would double-post the zeroing lines).
    if let Some(existing) =
        period_close_repo::find_for_period_tx(&mut tx, &ctx.tenant_id, period_end).await?
    {
        return Err(match existing.status {
            PeriodStatus::Closed => CloseError::AlreadyClosed { year, month },
            PeriodStatus::Reopened => CloseError::ReopenedPeriod { year, month },
        });
    }

    // Trial balance across everything posted up to the period end must
    // balance before the books can close.
    let (total_debits, total_credits) =
        journal_repo::trial_balance_totals_tx(&mut tx, &ctx.tenant_id, period_end).await?;

    if (total_debits - total_credits).abs() > BALANCE_TOLERANCE_MINOR {
        return Err(CloseError::TrialBalanceMismatch {
            debits_minor: total_debits,
            credits_minor: total_credits,
        });
    }

    // Retained Earnings must exist regardless of whether a closing entry
    // turns out to be needed; a chart without it is a fatal configuration
    // gap, not something to soft-skip.
    let retained_earnings =
        account_repo::find_by_code_tx(&mut tx, &ctx.tenant_id, coa::RETAINED_EARNINGS)
            .await
            .map_err(PostingError::from)?;
    if retained_earnings.is_none() {
        return Err(CloseError::MissingSystemAccount(
            coa::RETAINED_EARNINGS.to_string(),
        ));
    }

    let rows = journal_repo::period_account_totals_tx(
        &mut tx,
        &ctx.tenant_id,
        period_start,
        period_end,
        false,
    )
    .await?;

    let (revenue, expense, net_profit_minor) = compute_nets(&rows);
    let closing_lines = build_closing_lines(&revenue, &expense, net_profit_minor);

    let closing_journal_entry_id = if closing_lines.is_empty() {
        None
    } else {
        let spec = EntrySpec {
            entry_date: period_end,
            description: format!("Month-end closing {year}-{month:02}"),
            reference_type: ReferenceType::PeriodClose,
            reference_id: None,
            lines: closing_lines,
        };
        Some(posting_service::post_entry_strict(&mut tx, ctx, &spec).await?)
    };

    let record = period_close_repo::insert_closed_tx(
        &mut tx,
        &ctx.tenant_id,
        period_end,
        net_profit_minor,
        &ctx.user_id,
        closing_journal_entry_id,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        tenant_id = %ctx.tenant_id,
        period = %format!("{year}-{month:02}"),
        net_profit_minor,
        closing_journal_entry_id = ?closing_journal_entry_id,
        "Period closed"
    );

    Ok(record)
}

/// Reopen a closed period. Requires a non-empty reason; allowed only from
/// CLOSED. Does not reverse the closing journal entry and does not unlock
/// postings — a recorded administrative acknowledgment only.
pub async fn reopen(
    pool: &PgPool,
    tenant_id: &str,
    id: Uuid,
    reason: &str,
    user_id: &str,
) -> CloseResult<PeriodClose> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(CloseError::ReasonRequired);
    }

    let existing = period_close_repo::find_by_id(pool, tenant_id, id)
        .await?
        .ok_or(CloseError::NotFound(id))?;

    if existing.status == PeriodStatus::Reopened {
        return Err(CloseError::AlreadyReopened);
    }

    let updated = period_close_repo::mark_reopened(pool, tenant_id, id, reason)
        .await?
        .ok_or(CloseError::AlreadyReopened)?;

    tracing::info!(
        tenant_id = %tenant_id,
        period_close_id = %id,
        reopened_by = %user_id,
        reason = %reason,
        "Period reopened"
    );

    Ok(updated)
}

/// One account's contribution to the monthly P&L
#[derive(Debug, Clone, Serialize)]
pub struct PnlRow {
    pub code: String,
    pub name: String,
    pub amount_minor: i64,
}

/// Profit-and-loss summary for a month, excluding closing entries
#[derive(Debug, Clone, Serialize)]
pub struct PnlSummary {
    pub period: String,
    pub revenues: Vec<PnlRow>,
    pub expenses: Vec<PnlRow>,
    pub total_revenue_minor: i64,
    pub total_expenses_minor: i64,
    pub net_profit_minor: i64,
}

/// Read-only P&L for a month. PERIOD_CLOSE entries are excluded so a
/// closed month still reports its real activity.
pub async fn month_pnl(
    pool: &PgPool,
    tenant_id: &str,
    year: i32,
    month: u32,
) -> CloseResult<PnlSummary> {
    let (period_start, period_end) =
        month_bounds(year, month).ok_or(CloseError::InvalidPeriod { year, month })?;

    let mut tx = pool.begin().await?;
    let rows =
        journal_repo::period_account_totals_tx(&mut tx, tenant_id, period_start, period_end, true)
            .await?;
    tx.commit().await?;

    let mut revenues = Vec::new();
    let mut expenses = Vec::new();
    let mut total_revenue_minor = 0;
    let mut total_expenses_minor = 0;

    for row in &rows {
        match row.account_type {
            AccountType::Revenue => {
                let amount = row.credit_minor - row.debit_minor;
                if amount.abs() >= BALANCE_TOLERANCE_MINOR {
                    total_revenue_minor += amount;
                    revenues.push(PnlRow {
                        code: row.code.clone(),
                        name: row.name.clone(),
                        amount_minor: amount,
                    });
                }
            }
            AccountType::Expense => {
                let amount = row.debit_minor - row.credit_minor;
                if amount.abs() >= BALANCE_TOLERANCE_MINOR {
                    total_expenses_minor += amount;
                    expenses.push(PnlRow {
                        code: row.code.clone(),
                        name: row.name.clone(),
                        amount_minor: amount,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(PnlSummary {
        period: format!("{year}-{month:02}"),
        revenues,
        expenses,
        total_revenue_minor,
        total_expenses_minor,
        net_profit_minor: total_revenue_minor - total_expenses_minor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(code: &str, account_type: AccountType, debit: i64, credit: i64) -> AccountPeriodTotals {
        AccountPeriodTotals {
            account_head_id: Uuid::new_v4(),
            code: code.to_string(),
            name: code.to_string(),
            account_type,
            debit_minor: debit,
            credit_minor: credit,
        }
    }

    fn line_totals(lines: &[LineSpec]) -> (i64, i64) {
        (
            lines.iter().map(|l| l.debit_minor).sum(),
            lines.iter().map(|l| l.credit_minor).sum(),
        )
    }

    #[test]
    fn month_bounds_cover_calendar_edges() {
        assert_eq!(
            month_bounds(2026, 1).unwrap(),
            (
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()
            )
        );
        // Leap February
        assert_eq!(
            month_bounds(2024, 2).unwrap().1,
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            month_bounds(2026, 12).unwrap().1,
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()
        );
        assert!(month_bounds(2026, 13).is_none());
    }

    #[test]
    fn nets_follow_normal_balance() {
        let rows = vec![
            totals("4100", AccountType::Revenue, 0, 820_000_000_000),
            totals("5100", AccountType::Expense, 510_000_000_000, 0),
        ];

        let (revenue, expense, net_profit) = compute_nets(&rows);

        assert_eq!(revenue.len(), 1);
        assert_eq!(revenue[0].net_minor, 820_000_000_000);
        assert_eq!(expense.len(), 1);
        assert_eq!(expense[0].net_minor, 510_000_000_000);
        // Revenue 8,200,000.00 - Expenses 5,100,000.00 = 3,100,000.00
        assert_eq!(net_profit, 310_000_000_000);
    }

    #[test]
    fn closing_lines_zero_accounts_into_retained_earnings() {
        let revenue = vec![AccountNet {
            code: "4100".to_string(),
            net_minor: 820_000_000_000,
        }];
        let expense = vec![AccountNet {
            code: "5100".to_string(),
            net_minor: 510_000_000_000,
        }];

        let lines = build_closing_lines(&revenue, &expense, 310_000_000_000);

        assert_eq!(lines.len(), 3);
        // Revenue is credit-normal, so a debit zeroes it
        assert_eq!(lines[0].account_code, "4100");
        assert_eq!(lines[0].debit_minor, 820_000_000_000);
        // Expense is debit-normal, so a credit zeroes it
        assert_eq!(lines[1].account_code, "5100");
        assert_eq!(lines[1].credit_minor, 510_000_000_000);
        // Profit credits Retained Earnings
        assert_eq!(lines[2].account_code, coa::RETAINED_EARNINGS);
        assert_eq!(lines[2].credit_minor, 310_000_000_000);

        let (debits, credits) = line_totals(&lines);
        assert_eq!(debits, credits);
    }

    #[test]
    fn net_loss_debits_retained_earnings() {
        let revenue = vec![AccountNet {
            code: "4100".to_string(),
            net_minor: 100_000,
        }];
        let expense = vec![AccountNet {
            code: "5200".to_string(),
            net_minor: 250_000,
        }];

        let lines = build_closing_lines(&revenue, &expense, -150_000);

        let re_line = lines
            .iter()
            .find(|l| l.account_code == coa::RETAINED_EARNINGS)
            .unwrap();
        assert_eq!(re_line.debit_minor, 150_000);
        assert_eq!(re_line.credit_minor, 0);

        let (debits, credits) = line_totals(&lines);
        assert_eq!(debits, credits);
    }

    #[test]
    fn contra_nets_swap_sides_and_still_balance() {
        // A revenue account with net debit activity (e.g. heavy returns)
        let revenue = vec![AccountNet {
            code: "4200".to_string(),
            net_minor: -30_000,
        }];
        let expense = vec![AccountNet {
            code: "5100".to_string(),
            net_minor: 50_000,
        }];

        let lines = build_closing_lines(&revenue, &expense, -80_000);

        assert_eq!(lines[0].account_code, "4200");
        assert_eq!(lines[0].credit_minor, 30_000);
        let (debits, credits) = line_totals(&lines);
        assert_eq!(debits, credits);
    }

    #[test]
    fn zero_movement_builds_no_lines() {
        let lines = build_closing_lines(&[], &[], 0);
        assert!(lines.is_empty());

        // Sub-tolerance nets are skipped too
        let revenue = vec![AccountNet {
            code: "4100".to_string(),
            net_minor: 0,
        }];
        let lines = build_closing_lines(&revenue, &[], 0);
        assert!(lines.is_empty());
    }

    #[test]
    fn accounts_netting_to_zero_are_skipped_but_profit_posts() {
        let revenue = vec![
            AccountNet {
                code: "4100".to_string(),
                net_minor: 40_000,
            },
            AccountNet {
                code: "4200".to_string(),
                net_minor: 0,
            },
        ];

        let lines = build_closing_lines(&revenue, &[], 40_000);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].account_code, "4100");
        assert_eq!(lines[1].account_code, coa::RETAINED_EARNINGS);
    }
}

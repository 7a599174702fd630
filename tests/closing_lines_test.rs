use ledger_rs::coa;
use ledger_rs::repos::account_repo::AccountType;
use ledger_rs::repos::journal_repo::AccountPeriodTotals;
use ledger_rs::services::period_close_service::{
    build_closing_lines, compute_nets, month_bounds, AccountNet,
};
use uuid::Uuid;

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

#[test]
fn test_month_end_profit_scenario() {
    // Revenue 8,200,000.00 and expenses 5,100,000.00 for the month
    let rows = vec![
        totals("4100", AccountType::Revenue, 0, 820_000_000_000),
        totals("5100", AccountType::Expense, 300_000_000_000, 0),
        totals("5400", AccountType::Expense, 210_000_000_000, 0),
    ];

    let (revenue, expense, net_profit) = compute_nets(&rows);
    assert_eq!(net_profit, 310_000_000_000); // 3,100,000.00

    let lines = build_closing_lines(&revenue, &expense, net_profit);

    // Revenue zeroed with a debit, each expense with a credit
    assert_eq!(lines[0].account_code, "4100");
    assert_eq!(lines[0].debit_minor, 820_000_000_000);
    assert_eq!(lines[1].account_code, "5100");
    assert_eq!(lines[1].credit_minor, 300_000_000_000);
    assert_eq!(lines[2].account_code, "5400");
    assert_eq!(lines[2].credit_minor, 210_000_000_000);

    // Profit credits Retained Earnings
    let re = lines.last().unwrap();
    assert_eq!(re.account_code, coa::RETAINED_EARNINGS);
    assert_eq!(re.credit_minor, 310_000_000_000);

    let debits: i64 = lines.iter().map(|l| l.debit_minor).sum();
    let credits: i64 = lines.iter().map(|l| l.credit_minor).sum();
    assert_eq!(debits, credits);
}

#[test]
fn test_loss_month_debits_retained_earnings() {
    let rows = vec![
        totals("4100", AccountType::Revenue, 0, 50_000),
        totals("5200", AccountType::Expense, 90_000, 0),
    ];

    let (revenue, expense, net_profit) = compute_nets(&rows);
    assert_eq!(net_profit, -40_000);

    let lines = build_closing_lines(&revenue, &expense, net_profit);
    let re = lines.last().unwrap();
    assert_eq!(re.account_code, coa::RETAINED_EARNINGS);
    assert_eq!(re.debit_minor, 40_000);
    assert_eq!(re.credit_minor, 0);
}

#[test]
fn test_partial_activity_nets_out() {
    // Revenue with refunds posted against it: net = credits - debits
    let rows = vec![
        totals("4100", AccountType::Revenue, 20_000, 120_000),
        totals("5100", AccountType::Expense, 70_000, 10_000),
    ];

    let (revenue, expense, net_profit) = compute_nets(&rows);
    assert_eq!(revenue[0].net_minor, 100_000);
    assert_eq!(expense[0].net_minor, 60_000);
    assert_eq!(net_profit, 40_000);
}

#[test]
fn test_zero_movement_month_produces_no_entry() {
    let (revenue, expense, net_profit) = compute_nets(&[]);
    assert_eq!(net_profit, 0);
    assert!(build_closing_lines(&revenue, &expense, net_profit).is_empty());
}

#[test]
fn test_break_even_month_still_zeroes_accounts() {
    // Equal revenue and expense: accounts are zeroed, no Retained
    // Earnings line is needed
    let revenue = vec![AccountNet {
        code: "4100".to_string(),
        net_minor: 75_000,
    }];
    let expense = vec![AccountNet {
        code: "5100".to_string(),
        net_minor: 75_000,
    }];

    let lines = build_closing_lines(&revenue, &expense, 0);
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.account_code != coa::RETAINED_EARNINGS));

    let debits: i64 = lines.iter().map(|l| l.debit_minor).sum();
    let credits: i64 = lines.iter().map(|l| l.credit_minor).sum();
    assert_eq!(debits, credits);
}

#[test]
fn test_month_bounds_edge_months() {
    assert_eq!(
        month_bounds(2026, 2).unwrap().1,
        chrono::NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
    );
    assert_eq!(
        month_bounds(2024, 2).unwrap().1,
        chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
    );
    assert_eq!(
        month_bounds(2026, 12).unwrap().0,
        chrono::NaiveDate::from_ymd_opt(2026, 12, 1).unwrap()
    );
    assert!(month_bounds(2026, 0).is_none());
}

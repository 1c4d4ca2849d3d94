// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::opt_str;
use crate::cache::Clock;
use crate::db;
use crate::engine::{self, CategoryIndex, FilterCriteria};
use crate::models::TransactionType;
use crate::reports::ReportPeriod;
use crate::store::Ledger;
use crate::utils::{fmt_money, maybe_print_json, parse_date, parse_month, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle<C: Clock>(conn: &Connection, ledger: &mut Ledger<C>, m: &clap::ArgMatches) -> Result<()> {
    let ccy = db::get_currency(conn)?;
    match m.subcommand() {
        Some(("monthly", sub)) => monthly(conn, ledger, sub, &ccy)?,
        Some(("yearly", sub)) => yearly(ledger, sub, &ccy)?,
        Some(("category", sub)) => category(ledger, sub, &ccy)?,
        Some(("trends", sub)) => trends(ledger, sub, &ccy)?,
        _ => {}
    }
    Ok(())
}

fn period_from_args(sub: &clap::ArgMatches) -> Result<ReportPeriod> {
    let from = parse_date(sub.get_one::<String>("from").unwrap())?;
    let to = parse_date(sub.get_one::<String>("to").unwrap())?;
    Ok(ReportPeriod::new(from, to)?)
}

fn monthly<C: Clock>(
    conn: &Connection,
    ledger: &mut Ledger<C>,
    sub: &clap::ArgMatches,
    ccy: &str,
) -> Result<()> {
    let (year, month) = parse_month(sub.get_one::<String>("month").unwrap())?;
    let top = db::get_top_expenses(conn)?;
    let report = ledger
        .reports()
        .with_top_expenses(top)
        .monthly_report(year, month)?;
    if maybe_print_json(sub.get_flag("json"), &report)? {
        return Ok(());
    }
    let s = &report.summary;
    println!(
        "{}",
        pretty_table(
            &["Month", "Income", "Expenses", "Balance", "Savings rate"],
            vec![vec![
                format!("{}-{:02}", year, month),
                fmt_money(&s.income, ccy),
                fmt_money(&s.expenses, ccy),
                fmt_money(&s.balance, ccy),
                format!("{:.1}%", report.statistics.savings_rate),
            ]],
        )
    );
    let rows = report
        .category_breakdown
        .iter()
        .map(|c| {
            vec![
                c.category_name.clone(),
                c.r#type.to_string(),
                fmt_money(&c.total, ccy),
                c.count.to_string(),
                format!("{:.1}%", c.percentage),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Category", "Type", "Total", "Count", "Share"], rows)
    );
    let index = CategoryIndex::new(ledger.categories().all());
    let rows = report
        .top_expenses
        .iter()
        .map(|t| {
            vec![
                t.date.to_string(),
                index.name_of(t.category_id).to_string(),
                t.description.clone().unwrap_or_default(),
                fmt_money(&t.amount, ccy),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Category", "Description", "Amount"], rows)
    );
    Ok(())
}

fn yearly<C: Clock>(ledger: &mut Ledger<C>, sub: &clap::ArgMatches, ccy: &str) -> Result<()> {
    let year = *sub.get_one::<i32>("year").unwrap();
    let report = ledger.reports().yearly_report(year)?;
    if maybe_print_json(sub.get_flag("json"), &report)? {
        return Ok(());
    }
    let mut rows: Vec<Vec<String>> = report
        .months
        .iter()
        .map(|m| {
            vec![
                m.month.clone(),
                fmt_money(&m.income, ccy),
                fmt_money(&m.expenses, ccy),
                m.transaction_count.to_string(),
            ]
        })
        .collect();
    for q in &report.quarters {
        rows.push(vec![
            format!("Q{}", q.quarter),
            fmt_money(&q.income, ccy),
            fmt_money(&q.expenses, ccy),
            q.transaction_count.to_string(),
        ]);
    }
    println!(
        "{}",
        pretty_table(&["Period", "Income", "Expenses", "Count"], rows)
    );
    let c = &report.comparison;
    println!(
        "vs {}: income {:+.1}%, expenses {:+.1}%, balance {}",
        c.previous_year,
        c.income_change_pct,
        c.expense_change_pct,
        fmt_money(&c.balance_change, ccy)
    );
    Ok(())
}

fn category<C: Clock>(ledger: &mut Ledger<C>, sub: &clap::ArgMatches, ccy: &str) -> Result<()> {
    let period = period_from_args(sub)?;
    let ty = match opt_str(sub, "type") {
        Some(t) => Some(t.parse::<TransactionType>()?),
        None => None,
    };
    let report = ledger.reports().category_report(period, ty)?;
    if maybe_print_json(sub.get_flag("json"), &report)? {
        return Ok(());
    }
    let rows = report
        .categories
        .iter()
        .map(|c| {
            vec![
                c.category_name.clone(),
                c.r#type.to_string(),
                fmt_money(&c.total, ccy),
                format!("{:.1}%", c.percentage),
                fmt_money(&c.previous_total, ccy),
                format!("{:?}", c.trend).to_lowercase(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Category", "Type", "Total", "Share", "Previous", "Trend"],
            rows
        )
    );
    Ok(())
}

fn trends<C: Clock>(ledger: &mut Ledger<C>, sub: &clap::ArgMatches, ccy: &str) -> Result<()> {
    let period = period_from_args(sub)?;
    let report = ledger.reports().trends_report(period)?;
    if maybe_print_json(sub.get_flag("json"), &report)? {
        return Ok(());
    }
    let rows = report
        .months
        .iter()
        .zip(report.running_balance.iter())
        .map(|(m, b)| {
            vec![
                m.month.clone(),
                fmt_money(&m.income, ccy),
                fmt_money(&m.expenses, ccy),
                fmt_money(&b.balance, ccy),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Month", "Income", "Expenses", "Running balance"], rows)
    );
    println!(
        "Average per month: income {}, expenses {}",
        fmt_money(&report.average_income, ccy),
        fmt_money(&report.average_expenses, ccy)
    );
    Ok(())
}

pub fn stats<C: Clock>(conn: &Connection, ledger: &Ledger<C>, sub: &clap::ArgMatches) -> Result<()> {
    let ccy = db::get_currency(conn)?;
    let mut criteria = FilterCriteria::default();
    criteria.start_date = opt_str(sub, "from").map(|s| parse_date(&s)).transpose()?;
    criteria.end_date = opt_str(sub, "to").map(|s| parse_date(&s)).transpose()?;
    let index = CategoryIndex::new(ledger.categories().all());
    let txns = engine::filter(ledger.transactions().all(), &criteria, &index)?;
    let stats = engine::statistics(&txns, &index);
    if maybe_print_json(sub.get_flag("json"), &stats)? {
        return Ok(());
    }
    let most_used = stats
        .most_used_category
        .as_ref()
        .map(|u| format!("{} ({})", index.name_of(u.category_id), u.count))
        .unwrap_or_default();
    let largest = stats
        .largest_transaction
        .as_ref()
        .map(|t| format!("{} {} on {}", t.r#type, fmt_money(&t.amount, &ccy), t.date))
        .unwrap_or_default();
    let rows = vec![
        vec!["Transactions".into(), stats.total_transactions.to_string()],
        vec!["Average".into(), fmt_money(&stats.avg_transaction_amount, &ccy)],
        vec!["Average income".into(), fmt_money(&stats.avg_income_amount, &ccy)],
        vec!["Average expense".into(), fmt_money(&stats.avg_expense_amount, &ccy)],
        vec!["Most used category".into(), most_used],
        vec!["Largest transaction".into(), largest],
        vec!["Savings rate".into(), format!("{:.1}%", stats.savings_rate)],
    ];
    println!("{}", pretty_table(&["Statistic", "Value"], rows));
    Ok(())
}

// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{opt_str, resolve_category};
use crate::cache::Clock;
use crate::db;
use crate::engine::CategoryIndex;
use crate::models::{BudgetPatch, BudgetPeriod, NewBudget};
use crate::store::Ledger;
use crate::utils::{maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle<C: Clock>(conn: &Connection, ledger: &mut Ledger<C>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, ledger, sub)?,
        Some(("edit", sub)) => edit(conn, ledger, sub)?,
        Some(("list", sub)) => list(ledger, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            ledger.delete_budget(id)?;
            db::delete_budget(conn, id)?;
            println!("Removed budget {}", id);
        }
        Some(("status", sub)) => status(conn, ledger, sub)?,
        _ => {}
    }
    Ok(())
}

fn set<C: Clock>(conn: &Connection, ledger: &mut Ledger<C>, sub: &clap::ArgMatches) -> Result<()> {
    let cat = sub.get_one::<String>("category").unwrap();
    let category_id = resolve_category(ledger, cat, None)?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let period: BudgetPeriod = sub.get_one::<String>("period").unwrap().parse()?;
    let start_date = match opt_str(sub, "start") {
        Some(s) => parse_date(&s)?,
        None => ledger.today(),
    };
    let end_date = opt_str(sub, "end").map(|s| parse_date(&s)).transpose()?;
    let alert_threshold = opt_str(sub, "alert").map(|s| parse_decimal(&s)).transpose()?;
    let budget = ledger.add_budget(NewBudget {
        category_id,
        amount,
        period,
        start_date,
        end_date,
        alert_threshold,
    })?;
    db::save_budget(conn, &budget)?;
    println!(
        "Budget {} set: {} {} for '{}'",
        budget.id, budget.period, budget.amount, cat
    );
    Ok(())
}

fn edit<C: Clock>(conn: &Connection, ledger: &mut Ledger<C>, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let mut patch = BudgetPatch::default();
    if let Some(a) = opt_str(sub, "amount") {
        patch.amount = Some(parse_decimal(&a)?);
    }
    if let Some(p) = opt_str(sub, "period") {
        patch.period = Some(p.parse()?);
    }
    if let Some(d) = opt_str(sub, "start") {
        patch.start_date = Some(parse_date(&d)?);
    }
    if let Some(d) = opt_str(sub, "end") {
        patch.end_date = Some(Some(parse_date(&d)?));
    } else if sub.get_flag("no_end") {
        patch.end_date = Some(None);
    }
    if let Some(a) = opt_str(sub, "alert") {
        patch.alert_threshold = Some(parse_decimal(&a)?);
    }
    let budget = ledger.update_budget(id, patch)?;
    db::save_budget(conn, &budget)?;
    println!(
        "Budget {} updated: {} {}",
        budget.id, budget.period, budget.amount
    );
    Ok(())
}

fn list<C: Clock>(ledger: &Ledger<C>, sub: &clap::ArgMatches) -> Result<()> {
    let budgets = ledger.budgets().all();
    if maybe_print_json(sub.get_flag("json"), &budgets)? {
        return Ok(());
    }
    let index = CategoryIndex::new(ledger.categories().all());
    let data = budgets
        .iter()
        .map(|b| {
            vec![
                b.id.to_string(),
                index.name_of(Some(b.category_id)).to_string(),
                b.period.to_string(),
                format!("{:.2}", b.amount),
                b.start_date.to_string(),
                b.end_date.map(|d| d.to_string()).unwrap_or_default(),
                format!("{}%", b.alert_threshold),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Category", "Period", "Amount", "Start", "End", "Alert"],
            data
        )
    );
    Ok(())
}

fn status<C: Clock>(conn: &Connection, ledger: &mut Ledger<C>, sub: &clap::ArgMatches) -> Result<()> {
    let ccy = db::get_currency(conn)?;
    let today = ledger.today();
    let progress = ledger.reports().budget_report(today)?;
    if maybe_print_json(sub.get_flag("json"), &progress)? {
        return Ok(());
    }
    let index = CategoryIndex::new(ledger.categories().all());
    let data = progress
        .iter()
        .map(|p| {
            vec![
                index.name_of(Some(p.budget.category_id)).to_string(),
                format!("{} .. {}", p.window_start, p.window_end),
                format!("{:.2}", p.budget.amount),
                format!("{:.2}", p.spent),
                format!("{:.2}", p.remaining),
                format!("{:.1}%", p.percentage),
                if p.alert { "!".into() } else { String::new() },
            ]
        })
        .collect();
    let budget_hdr = format!("Budget ({})", ccy);
    println!(
        "{}",
        pretty_table(
            &["Category", "Window", &budget_hdr, "Spent", "Remaining", "Used", "Alert"],
            data
        )
    );
    Ok(())
}

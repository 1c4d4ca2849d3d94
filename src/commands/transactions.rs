// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{opt_str, resolve_category};
use crate::cache::Clock;
use crate::db;
use crate::engine::{self, CategoryIndex, FilterCriteria};
use crate::models::{NewTransaction, TransactionPatch, TransactionStatus, TransactionType};
use crate::store::Ledger;
use crate::utils::{maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

pub fn handle<C: Clock>(
    conn: &mut Connection,
    ledger: &mut Ledger<C>,
    m: &clap::ArgMatches,
) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, ledger, sub)?,
        Some(("update", sub)) => update(conn, ledger, sub)?,
        Some(("list", sub)) => list(ledger, sub)?,
        Some(("rm", sub)) => remove(conn, ledger, sub)?,
        Some(("import", sub)) => super::importer::handle(conn, ledger, sub)?,
        _ => {}
    }
    Ok(())
}

fn add<C: Clock>(conn: &Connection, ledger: &mut Ledger<C>, sub: &clap::ArgMatches) -> Result<()> {
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let ty: TransactionType = sub.get_one::<String>("type").unwrap().parse()?;
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let category_id = match opt_str(sub, "category") {
        Some(c) => Some(resolve_category(ledger, &c, Some(ty))?),
        None => None,
    };
    let status = match opt_str(sub, "status") {
        Some(s) => s.parse::<TransactionStatus>()?,
        None => TransactionStatus::Completed,
    };
    let txn = ledger.add_transaction(NewTransaction {
        amount,
        r#type: ty,
        category_id,
        description: opt_str(sub, "description"),
        date,
        status,
    })?;
    db::save_transaction(conn, &txn)?;
    println!("Recorded {} {} on {} (id {})", txn.r#type, txn.amount, txn.date, txn.id);
    Ok(())
}

fn update<C: Clock>(conn: &Connection, ledger: &mut Ledger<C>, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let current_type = ledger
        .transactions()
        .get(id)
        .map(|t| t.r#type)
        .with_context(|| format!("Transaction {} not found", id))?;
    let mut patch = TransactionPatch::default();
    if let Some(a) = opt_str(sub, "amount") {
        patch.amount = Some(parse_decimal(&a)?);
    }
    if let Some(t) = opt_str(sub, "type") {
        patch.r#type = Some(t.parse()?);
    }
    if let Some(d) = opt_str(sub, "date") {
        patch.date = Some(parse_date(&d)?);
    }
    if let Some(c) = opt_str(sub, "category") {
        let ty = patch.r#type.unwrap_or(current_type);
        patch.category_id = Some(Some(resolve_category(ledger, &c, Some(ty))?));
    }
    if let Some(d) = sub.get_one::<String>("description") {
        patch.description = Some(Some(d.clone()));
    }
    if let Some(s) = opt_str(sub, "status") {
        patch.status = Some(s.parse()?);
    }
    let txn = ledger.update_transaction(id, patch)?;
    db::save_transaction(conn, &txn)?;
    println!("Updated transaction {}", txn.id);
    Ok(())
}

fn remove<C: Clock>(
    conn: &mut Connection,
    ledger: &mut Ledger<C>,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let ids: Vec<i64> = sub.get_many::<i64>("id").unwrap().copied().collect();
    if let [id] = ids.as_slice() {
        ledger.delete_transaction(*id)?;
        db::delete_transactions(conn, &[*id])?;
        println!("Removed transaction {}", id);
    } else {
        let removed: Vec<i64> = ledger
            .bulk_delete_transactions(&ids)
            .iter()
            .map(|t| t.id)
            .collect();
        let tx = conn.transaction()?;
        db::delete_transactions(&tx, &removed)?;
        tx.commit()?;
        println!("Removed {} of {} transactions", removed.len(), ids.len());
    }
    Ok(())
}

fn list<C: Clock>(ledger: &Ledger<C>, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let data = query_rows(ledger, sub)?;
    if !maybe_print_json(json_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.r#type.clone(),
                    r.amount.clone(),
                    r.category.clone(),
                    r.description.clone(),
                    r.status.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Type", "Amount", "Category", "Description", "Status"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub r#type: String,
    pub amount: String,
    pub category: String,
    pub description: String,
    pub status: String,
}

pub fn criteria_from_args<C: Clock>(
    ledger: &Ledger<C>,
    sub: &clap::ArgMatches,
) -> Result<FilterCriteria> {
    let mut c = FilterCriteria::default();
    if let Some(t) = opt_str(sub, "type") {
        c.r#type = Some(t.parse()?);
    }
    if let Some(cat) = opt_str(sub, "category") {
        c.category_id = Some(resolve_category(ledger, &cat, c.r#type)?);
    }
    if let Some(d) = opt_str(sub, "from") {
        c.start_date = Some(parse_date(&d)?);
    }
    if let Some(d) = opt_str(sub, "to") {
        c.end_date = Some(parse_date(&d)?);
    }
    if let Some(min) = opt_str(sub, "min") {
        c.min_amount = Some(parse_decimal(&min)?);
    }
    if let Some(max) = opt_str(sub, "max") {
        c.max_amount = Some(parse_decimal(&max)?);
    }
    if let Some(s) = opt_str(sub, "status") {
        c.status = Some(s.parse()?);
    }
    c.search = opt_str(sub, "search");
    Ok(c)
}

pub fn query_rows<C: Clock>(ledger: &Ledger<C>, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let criteria = criteria_from_args(ledger, sub)?;
    let index = CategoryIndex::new(ledger.categories().all());
    let filtered = engine::filter(ledger.transactions().all(), &criteria, &index)?;
    let mut sorted = engine::sort_by_date_descending(&filtered);
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sorted.truncate(*limit);
    }
    Ok(sorted
        .into_iter()
        .map(|t| TransactionRow {
            id: t.id,
            date: t.date.to_string(),
            r#type: t.r#type.to_string(),
            amount: format!("{:.2}", t.amount),
            category: index.name_of(t.category_id).to_string(),
            description: t.description.unwrap_or_default(),
            status: t.status.to_string(),
        })
        .collect())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::cache::Clock;
use crate::error::{Error, Result};
use crate::models::{Budget, Category, MAX_AMOUNT, Transaction};
use crate::store::Ledger;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Ledgerlens", "ledgerlens"));

pub const DB_ENV: &str = "LEDGERLENS_DB";

pub fn db_path() -> anyhow::Result<PathBuf> {
    if let Ok(p) = std::env::var(DB_ENV) {
        if !p.trim().is_empty() {
            return Ok(PathBuf::from(p));
        }
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("ledgerlens.sqlite"))
}

pub fn open_or_init() -> anyhow::Result<Connection> {
    let path = db_path()?;
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    debug!(path = %path.display(), "database ready");
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('INCOME','EXPENSE')),
        description TEXT,
        icon TEXT,
        color TEXT,
        is_default INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_name_type
        ON categories(lower(name), type);

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY,
        amount TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('INCOME','EXPENSE')),
        category_id INTEGER,
        description TEXT,
        date TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'completed',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

    CREATE TABLE IF NOT EXISTS budgets(
        id INTEGER PRIMARY KEY,
        category_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        period TEXT NOT NULL,
        start_date TEXT NOT NULL,
        end_date TEXT,
        alert_threshold TEXT NOT NULL,
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE CASCADE
    );
    "#,
    )?;
    Ok(())
}

fn text_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::<dyn std::error::Error + Send + Sync>::from(msg),
    )
}

fn parse_col<T: FromStr>(r: &Row, idx: usize) -> rusqlite::Result<T>
where
    T::Err: std::fmt::Display,
{
    let s: String = r.get(idx)?;
    s.parse::<T>()
        .map_err(|e| text_err(idx, format!("'{}': {}", s, e)))
}

fn date_col(r: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = r.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| text_err(idx, e.to_string()))
}

fn ts_col(r: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = r.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| text_err(idx, e.to_string()))
}

/// Stored amounts that no longer parse are a data-quality problem, not a
/// load failure.
fn amount_col(r: &Row, idx: usize, id: i64) -> rusqlite::Result<Decimal> {
    let s: String = r.get(idx)?;
    match s.trim().parse::<Decimal>() {
        Ok(d) if d <= MAX_AMOUNT => Ok(d),
        Ok(_) => {
            warn!(transaction = id, raw = %s, "stored amount above {}, treating as 0", MAX_AMOUNT);
            Ok(Decimal::ZERO)
        }
        Err(_) => {
            warn!(transaction = id, raw = %s, "unparsable stored amount, treating as 0");
            Ok(Decimal::ZERO)
        }
    }
}

pub fn load_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, type, description, icon, color, is_default, is_active
         FROM categories ORDER BY id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Category {
            id: r.get(0)?,
            name: r.get(1)?,
            r#type: parse_col(r, 2)?,
            description: r.get(3)?,
            icon: r.get(4)?,
            color: r.get(5)?,
            is_default: r.get(6)?,
            is_active: r.get(7)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn load_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, amount, type, category_id, description, date, status, created_at, updated_at
         FROM transactions ORDER BY id",
    )?;
    let rows = stmt.query_map([], |r| {
        let id: i64 = r.get(0)?;
        Ok(Transaction {
            id,
            amount: amount_col(r, 1, id)?,
            r#type: parse_col(r, 2)?,
            category_id: r.get(3)?,
            description: r.get(4)?,
            date: date_col(r, 5)?,
            status: parse_col(r, 6)?,
            created_at: ts_col(r, 7)?,
            updated_at: ts_col(r, 8)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn load_budgets(conn: &Connection) -> Result<Vec<Budget>> {
    let mut stmt = conn.prepare(
        "SELECT id, category_id, amount, period, start_date, end_date, alert_threshold
         FROM budgets ORDER BY id",
    )?;
    let rows = stmt.query_map([], |r| {
        let end: Option<String> = r.get(5)?;
        Ok(Budget {
            id: r.get(0)?,
            category_id: r.get(1)?,
            amount: parse_col(r, 2)?,
            period: parse_col(r, 3)?,
            start_date: date_col(r, 4)?,
            end_date: end
                .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
                .transpose()
                .map_err(|e| text_err(5, e.to_string()))?,
            alert_threshold: parse_col(r, 6)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn load_ledger<C: Clock>(conn: &Connection, clock: C) -> Result<Ledger<C>> {
    let categories = load_categories(conn)?;
    let transactions = load_transactions(conn)?;
    let budgets = load_budgets(conn)?;
    debug!(
        transactions = transactions.len(),
        categories = categories.len(),
        budgets = budgets.len(),
        "ledger loaded"
    );
    Ok(Ledger::from_parts(transactions, categories, budgets, clock))
}

pub fn save_transaction(conn: &Connection, t: &Transaction) -> Result<()> {
    conn.execute(
        "INSERT INTO transactions(id, amount, type, category_id, description, date, status, created_at, updated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
         ON CONFLICT(id) DO UPDATE SET amount=excluded.amount, type=excluded.type,
            category_id=excluded.category_id, description=excluded.description,
            date=excluded.date, status=excluded.status, updated_at=excluded.updated_at",
        params![
            t.id,
            t.amount.to_string(),
            t.r#type.as_str(),
            t.category_id,
            t.description,
            t.date.to_string(),
            t.status.as_str(),
            t.created_at.to_rfc3339(),
            t.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn save_transactions(conn: &mut Connection, txns: &[Transaction]) -> Result<()> {
    let tx = conn.transaction()?;
    for t in txns {
        save_transaction(&tx, t)?;
    }
    tx.commit()?;
    Ok(())
}

pub fn delete_transactions(conn: &Connection, ids: &[i64]) -> Result<usize> {
    let mut n = 0;
    for id in ids {
        n += conn.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
    }
    Ok(n)
}

pub fn save_category(conn: &Connection, c: &Category) -> Result<()> {
    conn.execute(
        "INSERT INTO categories(id, name, type, description, icon, color, is_default, is_active)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
         ON CONFLICT(id) DO UPDATE SET name=excluded.name, description=excluded.description,
            icon=excluded.icon, color=excluded.color, is_active=excluded.is_active",
        params![
            c.id,
            c.name,
            c.r#type.as_str(),
            c.description,
            c.icon,
            c.color,
            c.is_default,
            c.is_active,
        ],
    )?;
    Ok(())
}

pub fn delete_category(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM categories WHERE id=?1", params![id])?;
    Ok(())
}

pub fn save_budget(conn: &Connection, b: &Budget) -> Result<()> {
    conn.execute(
        "INSERT INTO budgets(id, category_id, amount, period, start_date, end_date, alert_threshold)
         VALUES (?1,?2,?3,?4,?5,?6,?7)
         ON CONFLICT(id) DO UPDATE SET amount=excluded.amount, period=excluded.period,
            start_date=excluded.start_date, end_date=excluded.end_date,
            alert_threshold=excluded.alert_threshold",
        params![
            b.id,
            b.category_id,
            b.amount.to_string(),
            b.period.as_str(),
            b.start_date.to_string(),
            b.end_date.map(|d| d.to_string()),
            b.alert_threshold.to_string(),
        ],
    )?;
    Ok(())
}

pub fn delete_budget(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM budgets WHERE id=?1", params![id])?;
    Ok(())
}

// Settings

pub const DEFAULT_CURRENCY: &str = "USD";

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn get_currency(conn: &Connection) -> Result<String> {
    Ok(get_setting(conn, "currency")?.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
}

pub fn get_top_expenses(conn: &Connection) -> Result<usize> {
    match get_setting(conn, "top_expenses")? {
        Some(v) => v.trim().parse::<usize>().map_err(|_| {
            Error::validation(format!("setting top_expenses='{}' is not a number", v))
        }),
        None => Ok(crate::reports::TOP_EXPENSES),
    }
}

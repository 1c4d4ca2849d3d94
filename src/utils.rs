// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result};
use crate::models::MAX_AMOUNT;
use chrono::{Datelike, NaiveDate};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::warn;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        Error::validation(format!("Invalid date '{}', expected YYYY-MM-DD", s))
    })
}

/// Parses `YYYY-MM` into `(year, month)`.
pub fn parse_month(s: &str) -> Result<(i32, u32)> {
    let d = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .map_err(|_| Error::invalid_query(format!("Invalid month '{}', expected YYYY-MM", s)))?;
    Ok((d.year(), d.month()))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .map_err(|_| Error::validation(format!("Invalid decimal '{}'", s)))
}

pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn month_start(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::invalid_query(format!("Invalid month {}-{:02}", year, month)))
}

pub fn month_end(year: i32, month: u32) -> Result<NaiveDate> {
    let (ny, nm) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    month_start(year, month)?;
    let next = month_start(ny, nm)?;
    next.pred_opt()
        .ok_or_else(|| Error::invalid_query(format!("Invalid month {}-{:02}", year, month)))
}

/// Percentage of `part` in `whole`; zero when `whole` is zero or the ratio
/// does not fit in a `Decimal`.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    match part
        .checked_div(whole)
        .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
    {
        Some(p) => p,
        None => {
            warn!(part = %part, whole = %whole, "percentage out of range, reporting 0");
            Decimal::ZERO
        }
    }
}

/// Defensive amount coercion for imported records.
///
/// Numbers and numeric strings become decimals. Anything else, including a
/// non-positive value, is a data-quality problem: it is logged and becomes 0.
pub fn coerce_amount(raw: &Value, context: &str) -> Decimal {
    let parsed = match raw {
        Value::Number(n) => n.to_string().parse::<Decimal>().ok().or_else(|| {
            n.as_f64().and_then(|f| Decimal::try_from(f).ok())
        }),
        Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    };
    match parsed {
        Some(d) if d > MAX_AMOUNT => {
            warn!(record = context, amount = %d, "amount above {}, treating as 0", MAX_AMOUNT);
            Decimal::ZERO
        }
        Some(d) if d > Decimal::ZERO => d,
        Some(d) => {
            warn!(record = context, amount = %d, "non-positive amount, treating as 0");
            Decimal::ZERO
        }
        None => {
            warn!(record = context, raw = %raw, "unparsable amount, treating as 0");
            Decimal::ZERO
        }
    }
}

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{} {:.2}", ccy, d.round_dp(2))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(json_flag: bool, v: &T) -> anyhow::Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    Ok(false)
}

// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod budgets;
pub mod categories;
pub mod config;
pub mod importer;
pub mod reports;
pub mod transactions;

use crate::cache::Clock;
use crate::models::TransactionType;
use crate::store::Ledger;
use anyhow::{Result, anyhow};

/// Resolves a category given by id or by name (case-insensitive).
pub fn resolve_category<C: Clock>(
    ledger: &Ledger<C>,
    raw: &str,
    ty: Option<TransactionType>,
) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        if ledger.categories().get(id).is_some() {
            return Ok(id);
        }
    }
    let found = match ty {
        Some(t) => ledger.categories().find_by_name(raw, t),
        None => ledger.categories().find_any_by_name(raw),
    };
    found
        .map(|c| c.id)
        .ok_or_else(|| anyhow!("Category '{}' not found", raw))
}

pub(crate) fn opt_str(sub: &clap::ArgMatches, name: &str) -> Option<String> {
    sub.get_one::<String>(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::cache::Clock;
use crate::db;
use crate::importer::{read_csv, read_json};
use crate::store::Ledger;
use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use std::fs::File;
use std::path::Path;

pub fn handle<C: Clock>(
    conn: &mut Connection,
    ledger: &mut Ledger<C>,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let format = match sub.get_one::<String>("format") {
        Some(f) => f.trim().to_lowercase(),
        None => Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("csv")
            .to_lowercase(),
    };
    let file = File::open(path).with_context(|| format!("Open {}", path))?;
    let records = match format.as_str() {
        "csv" => read_csv(file).with_context(|| format!("Read CSV {}", path))?,
        "json" => read_json(file).with_context(|| format!("Read JSON {}", path))?,
        other => return Err(anyhow!("Unknown import format '{}' (use csv|json)", other)),
    };

    let summary = ledger.import_transactions(records);
    db::save_transactions(conn, &summary.imported)?;
    println!(
        "Imported {} transactions from {} ({} skipped)",
        summary.imported.len(),
        path,
        summary.skipped.len()
    );
    for s in &summary.skipped {
        eprintln!("  row {}: {}", s.row, s.reason);
    }
    Ok(())
}

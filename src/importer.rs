// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Bulk ingestion of loosely-typed transaction records (CSV or JSON).
//!
//! Records whose type or date cannot be understood are skipped and reported.
//! Bad amounts are not fatal: they are logged and stored as zero.

use crate::cache::Clock;
use crate::error::Result;
use crate::models::{MAX_DESCRIPTION_LEN, Transaction, TransactionStatus, TransactionType};
use crate::store::Ledger;
use crate::utils::{coerce_amount, parse_date};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Read;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub amount: Value,
    #[serde(rename = "type")]
    pub r#type: String,
    pub date: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "categoryId")]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    date: String,
    #[serde(rename = "type")]
    kind: String,
    amount: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl From<CsvRecord> for RawTransaction {
    fn from(r: CsvRecord) -> Self {
        RawTransaction {
            amount: Value::String(r.amount),
            r#type: r.kind,
            date: r.date,
            category: r.category.filter(|s| !s.trim().is_empty()),
            category_id: None,
            description: r.description,
            status: r.status.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Reads `date,type,amount,category,description,status` rows with a header.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawTransaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut out = Vec::new();
    for rec in rdr.deserialize::<CsvRecord>() {
        out.push(rec?.into());
    }
    Ok(out)
}

/// Reads a JSON array of transaction objects.
pub fn read_json<R: Read>(reader: R) -> Result<Vec<RawTransaction>> {
    Ok(serde_json::from_reader(reader)?)
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub imported: Vec<Transaction>,
    pub skipped: Vec<SkippedRecord>,
}

impl<C: Clock> Ledger<C> {
    pub fn import_transactions(&mut self, records: Vec<RawTransaction>) -> ImportSummary {
        let mut summary = ImportSummary::default();
        let now = self.cache.clock().now();
        let latest = now.date_naive() + Duration::days(1);

        for (i, raw) in records.into_iter().enumerate() {
            let row = i + 1;
            let context = format!("row {}", row);
            let ty = match raw.r#type.parse::<TransactionType>() {
                Ok(t) => t,
                Err(e) => {
                    warn!(row, "skipping record: {}", e);
                    summary.skipped.push(SkippedRecord {
                        row,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let date = match parse_date(&raw.date) {
                Ok(d) if d <= latest => d,
                Ok(d) => {
                    let reason = format!("date {} is more than one day in the future", d);
                    warn!(row, "skipping record: {}", reason);
                    summary.skipped.push(SkippedRecord { row, reason });
                    continue;
                }
                Err(e) => {
                    warn!(row, "skipping record: {}", e);
                    summary.skipped.push(SkippedRecord {
                        row,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let amount = coerce_amount(&raw.amount, &context);

            let category_id = match (raw.category_id, raw.category.as_deref()) {
                (Some(id), _) => match self.categories.get(id) {
                    Some(c) if c.r#type == ty => Some(id),
                    Some(c) => {
                        warn!(
                            row,
                            category = id,
                            "category '{}' is {} but record is {}, importing as uncategorized",
                            c.name,
                            c.r#type,
                            ty
                        );
                        None
                    }
                    None => {
                        warn!(row, category = id, "unknown category id, importing as uncategorized");
                        None
                    }
                },
                (None, Some(name)) => match self.categories.find_by_name(name, ty) {
                    Some(c) => Some(c.id),
                    None => {
                        warn!(row, category = name, "unknown category, importing as uncategorized");
                        None
                    }
                },
                (None, None) => None,
            };

            let status = match raw.status.as_deref() {
                Some(s) => s.parse::<TransactionStatus>().unwrap_or_else(|e| {
                    warn!(row, "{}; defaulting to completed", e);
                    TransactionStatus::Completed
                }),
                None => TransactionStatus::Completed,
            };

            let description = raw
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .map(|d| {
                    if d.chars().count() > MAX_DESCRIPTION_LEN {
                        warn!(row, "description truncated to {} characters", MAX_DESCRIPTION_LEN);
                        d.chars().take(MAX_DESCRIPTION_LEN).collect()
                    } else {
                        d
                    }
                });

            let txn = self.ingest_transaction(Transaction {
                id: 0,
                amount,
                r#type: ty,
                category_id,
                description,
                date,
                status,
                created_at: now,
                updated_at: now,
            });
            summary.imported.push(txn);
        }

        self.after_bulk_mutation();
        info!(
            imported = summary.imported.len(),
            skipped = summary.skipped.len(),
            "import finished"
        );
        summary
    }
}

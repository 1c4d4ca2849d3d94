// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{self, get_currency, get_top_expenses, set_setting};
use crate::utils::pretty_table;
use anyhow::{Result, anyhow};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().as_str();
            let raw = sub.get_one::<String>("value").unwrap().trim();
            let value = match key {
                "currency" => raw.to_uppercase(),
                "top_expenses" => {
                    raw.parse::<usize>()
                        .map_err(|_| anyhow!("top_expenses must be a whole number, got '{}'", raw))?;
                    raw.to_string()
                }
                other => return Err(anyhow!("Unknown setting '{}'", other)),
            };
            set_setting(conn, key, &value)?;
            println!("{} set to {}", key, value);
        }
        Some(("show", _)) => {
            let rows = vec![
                vec!["database".into(), db::db_path()?.display().to_string()],
                vec!["currency".into(), get_currency(conn)?],
                vec!["top_expenses".into(), get_top_expenses(conn)?.to_string()],
            ];
            println!("{}", pretty_table(&["Setting", "Value"], rows));
        }
        _ => {}
    }
    Ok(())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use ledgerlens::cache::SystemClock;
use ledgerlens::{cli, commands, db};

pub const LOG_ENV: &str = "LEDGERLENS_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut conn = db::open_or_init()?;
    let mut ledger = db::load_ledger(&conn, SystemClock)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("category", sub)) => commands::categories::handle(&conn, &mut ledger, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&mut conn, &mut ledger, sub)?,
        Some(("budget", sub)) => commands::budgets::handle(&conn, &mut ledger, sub)?,
        Some(("report", sub)) => commands::reports::handle(&conn, &mut ledger, sub)?,
        Some(("stats", sub)) => commands::reports::stats(&conn, &ledger, sub)?,
        Some(("config", sub)) => commands::config::handle(&conn, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}

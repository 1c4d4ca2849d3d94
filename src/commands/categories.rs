// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::opt_str;
use crate::cache::Clock;
use crate::db;
use crate::models::{CategoryPatch, NewCategory, TransactionType};
use crate::store::Ledger;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle<C: Clock>(conn: &Connection, ledger: &mut Ledger<C>, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let ty: TransactionType = sub.get_one::<String>("type").unwrap().parse()?;
            let cat = ledger.add_category(NewCategory {
                name: sub.get_one::<String>("name").unwrap().clone(),
                r#type: ty,
                description: opt_str(sub, "description"),
                icon: opt_str(sub, "icon"),
                color: opt_str(sub, "color"),
                is_default: sub.get_flag("default"),
            })?;
            db::save_category(conn, &cat)?;
            println!("Added {} category '{}' (id {})", cat.r#type, cat.name, cat.id);
        }
        Some(("edit", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let patch = CategoryPatch {
                name: opt_str(sub, "name"),
                description: sub.get_one::<String>("description").map(|d| Some(d.clone())),
                icon: sub.get_one::<String>("icon").map(|i| Some(i.clone())),
                color: sub.get_one::<String>("color").map(|c| Some(c.clone())),
                is_active: if sub.get_flag("activate") {
                    Some(true)
                } else if sub.get_flag("deactivate") {
                    Some(false)
                } else {
                    None
                },
            };
            let cat = ledger.update_category(id, patch)?;
            db::save_category(conn, &cat)?;
            println!("Updated category '{}'", cat.name);
        }
        Some(("list", sub)) => {
            let ty = match opt_str(sub, "type") {
                Some(t) => Some(t.parse::<TransactionType>()?),
                None => None,
            };
            let cats = ledger.reports().categories(ty, sub.get_flag("all"))?;
            if !maybe_print_json(sub.get_flag("json"), &cats)? {
                let data = cats
                    .into_iter()
                    .map(|c| {
                        vec![
                            c.id.to_string(),
                            c.name,
                            c.r#type.to_string(),
                            c.color.unwrap_or_default(),
                            if c.is_default { "yes".into() } else { String::new() },
                            if c.is_active { "yes".into() } else { "no".into() },
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Category", "Type", "Color", "Default", "Active"], data)
                );
            }
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let cat = ledger.delete_category(id)?;
            db::delete_category(conn, id)?;
            println!("Removed category '{}'", cat.name);
        }
        _ => {}
    }
    Ok(())
}

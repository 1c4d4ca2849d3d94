// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print JSON instead of a table")
}

fn type_arg(required: bool) -> Arg {
    Arg::new("type")
        .long("type")
        .required(required)
        .help("income | expense")
}

fn range_args() -> [Arg; 2] {
    [
        Arg::new("from").long("from").help("Start date YYYY-MM-DD (inclusive)"),
        Arg::new("to").long("to").help("End date YYYY-MM-DD (inclusive)"),
    ]
}

pub fn build_cli() -> Command {
    Command::new("ledgerlens")
        .about("Personal finance ledger with category rollups, budgets, and reports")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(Command::new("init").about("Create the database if missing"))
        .subcommand(
            Command::new("category")
                .about("Manage categories")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(type_arg(true))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("icon").long("icon"))
                        .arg(Arg::new("color").long("color").help("Hex color, e.g. #4caf50"))
                        .arg(
                            Arg::new("default")
                                .long("default")
                                .action(ArgAction::SetTrue)
                                .help("Mark as a default category (cannot be removed)"),
                        ),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("name").long("name"))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("icon").long("icon"))
                        .arg(Arg::new("color").long("color"))
                        .arg(Arg::new("activate").long("activate").action(ArgAction::SetTrue))
                        .arg(
                            Arg::new("deactivate")
                                .long("deactivate")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("activate"),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .arg(type_arg(false))
                        .arg(
                            Arg::new("all")
                                .long("all")
                                .action(ArgAction::SetTrue)
                                .help("Include inactive categories"),
                        )
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("rm").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and query transactions")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(type_arg(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("status").long("status")),
                )
                .subcommand(
                    Command::new("update")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("amount").long("amount"))
                        .arg(type_arg(false))
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("status").long("status")),
                )
                .subcommand(
                    Command::new("list")
                        .arg(type_arg(false))
                        .arg(Arg::new("category").long("category"))
                        .args(range_args())
                        .arg(Arg::new("search").long("search"))
                        .arg(Arg::new("min").long("min"))
                        .arg(Arg::new("max").long("max"))
                        .arg(Arg::new("status").long("status"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        )
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("rm").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .num_args(1..)
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(
                    Command::new("import")
                        .arg(Arg::new("path").long("path").required(true))
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .help("csv | json (default: from file extension)"),
                        ),
                ),
        )
        .subcommand(
            Command::new("budget")
                .about("Budgets per category")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("period")
                                .long("period")
                                .default_value("monthly")
                                .help("daily | weekly | monthly | yearly"),
                        )
                        .arg(Arg::new("start").long("start").help("YYYY-MM-DD, default today"))
                        .arg(Arg::new("end").long("end"))
                        .arg(Arg::new("alert").long("alert").help("Alert threshold percent")),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("period").long("period"))
                        .arg(Arg::new("start").long("start"))
                        .arg(Arg::new("end").long("end"))
                        .arg(
                            Arg::new("no_end")
                                .long("no-end")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("end")
                                .help("Make the budget open-ended"),
                        )
                        .arg(Arg::new("alert").long("alert")),
                )
                .subcommand(Command::new("list").arg(json_flag()))
                .subcommand(
                    Command::new("rm").arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(Command::new("status").arg(json_flag())),
        )
        .subcommand(
            Command::new("report")
                .about("Aggregate reports")
                .subcommand(
                    Command::new("monthly")
                        .arg(Arg::new("month").long("month").required(true).help("YYYY-MM"))
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("yearly")
                        .arg(
                            Arg::new("year")
                                .long("year")
                                .required(true)
                                .value_parser(value_parser!(i32)),
                        )
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("category")
                        .args(range_args().map(|a| a.required(true)))
                        .arg(type_arg(false))
                        .arg(json_flag()),
                )
                .subcommand(
                    Command::new("trends")
                        .args(range_args().map(|a| a.required(true)))
                        .arg(json_flag()),
                ),
        )
        .subcommand(
            Command::new("stats")
                .about("Summary statistics over an optional date range")
                .args(range_args())
                .arg(json_flag()),
        )
        .subcommand(
            Command::new("config")
                .about("Settings")
                .subcommand(
                    Command::new("set")
                        .arg(
                            Arg::new("key")
                                .long("key")
                                .required(true)
                                .value_parser(["currency", "top_expenses"]),
                        )
                        .arg(Arg::new("value").long("value").required(true)),
                )
                .subcommand(Command::new("show")),
        )
}

// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, TimeZone, Utc};
use ledgerlens::cache::ManualClock;
use ledgerlens::models::{
    BudgetPeriod, NewBudget, NewCategory, NewTransaction, TransactionStatus, TransactionType,
};
use ledgerlens::{cli, commands::transactions, db};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap())
}

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let mut ledger = db::load_ledger(&conn, clock()).unwrap();
    let cat = ledger
        .add_category(NewCategory {
            name: "Cat1".into(),
            r#type: TransactionType::Expense,
            description: None,
            icon: None,
            color: Some("#00AA00".into()),
            is_default: true,
        })
        .unwrap();
    db::save_category(&conn, &cat).unwrap();
    for i in 1..=3 {
        let t = ledger
            .add_transaction(NewTransaction {
                amount: Decimal::from(10),
                r#type: TransactionType::Expense,
                category_id: Some(cat.id),
                description: Some("P".into()),
                date: NaiveDate::from_ymd_opt(2025, 1, i).unwrap(),
                status: TransactionStatus::Completed,
            })
            .unwrap();
        db::save_transaction(&conn, &t).unwrap();
    }
    conn
}

#[test]
fn list_limit_respected() {
    let conn = setup();
    let ledger = db::load_ledger(&conn, clock()).unwrap();
    let cli = cli::build_cli();
    let matches = cli.get_matches_from(["ledgerlens", "tx", "list", "--limit", "2"]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = tx_m.subcommand() {
            let rows = transactions::query_rows(&ledger, list_m).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].date, "2025-01-03");
            assert_eq!(rows[0].category, "Cat1");
        } else {
            panic!("no list subcommand");
        }
    } else {
        panic!("no tx subcommand");
    }
}

#[test]
fn list_filters_by_category_name() {
    let conn = setup();
    let ledger = db::load_ledger(&conn, clock()).unwrap();
    let matches = cli::build_cli().get_matches_from([
        "ledgerlens", "tx", "list", "--category", "cat1", "--from", "2025-01-02",
    ]);
    let (_, tx_m) = matches.subcommand().unwrap();
    let (_, list_m) = tx_m.subcommand().unwrap();
    let rows = transactions::query_rows(&ledger, list_m).unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn ledger_round_trips_through_sqlite() {
    let conn = setup();
    let mut ledger = db::load_ledger(&conn, clock()).unwrap();
    assert_eq!(ledger.transactions().len(), 3);
    let cat = ledger.categories().all()[0].clone();
    assert!(cat.is_default);
    assert_eq!(cat.color.as_deref(), Some("#00AA00"));

    let budget = ledger
        .add_budget(NewBudget {
            category_id: cat.id,
            amount: "250.75".parse().unwrap(),
            period: BudgetPeriod::Monthly,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: None,
            alert_threshold: Some(Decimal::from(90)),
        })
        .unwrap();
    db::save_budget(&conn, &budget).unwrap();

    let reloaded = db::load_ledger(&conn, clock()).unwrap();
    assert_eq!(reloaded.budgets().all(), &[budget][..]);
    assert_eq!(reloaded.transactions().all(), ledger.transactions().all());
}

#[test]
fn unparsable_stored_amount_loads_as_zero() {
    let conn = setup();
    conn.execute("UPDATE transactions SET amount='oops' WHERE id=?1", params![2])
        .unwrap();
    let ledger = db::load_ledger(&conn, clock()).unwrap();
    assert_eq!(ledger.transactions().get(2).unwrap().amount, Decimal::ZERO);
}

#[test]
fn bulk_delete_and_batch_save() {
    let mut conn = setup();
    let mut ledger = db::load_ledger(&conn, clock()).unwrap();
    let removed = ledger.bulk_delete_transactions(&[1, 3]);
    let ids: Vec<i64> = removed.iter().map(|t| t.id).collect();
    assert_eq!(db::delete_transactions(&conn, &ids).unwrap(), 2);

    let summary = ledger.import_transactions(
        ledgerlens::importer::read_csv("date,type,amount\n2025-01-05,expense,4\n".as_bytes())
            .unwrap(),
    );
    db::save_transactions(&mut conn, &summary.imported).unwrap();
    let reloaded = db::load_ledger(&conn, clock()).unwrap();
    let mut ids: Vec<i64> = reloaded.transactions().all().iter().map(|t| t.id).collect();
    ids.sort();
    assert_eq!(ids, vec![2, 4]);
}

#[test]
fn settings_default_and_override() {
    let conn = setup();
    assert_eq!(db::get_currency(&conn).unwrap(), "USD");
    assert_eq!(db::get_top_expenses(&conn).unwrap(), 5);
    db::set_setting(&conn, "currency", "EUR").unwrap();
    db::set_setting(&conn, "top_expenses", "3").unwrap();
    assert_eq!(db::get_currency(&conn).unwrap(), "EUR");
    assert_eq!(db::get_top_expenses(&conn).unwrap(), 3);
}

#[test]
fn file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.sqlite3");
    {
        let conn = Connection::open(&path).unwrap();
        db::init_schema(&conn).unwrap();
        let mut ledger = db::load_ledger(&conn, clock()).unwrap();
        let cat = ledger
            .add_category(NewCategory {
                name: "Rent".into(),
                r#type: TransactionType::Expense,
                description: None,
                icon: None,
                color: None,
                is_default: false,
            })
            .unwrap();
        db::save_category(&conn, &cat).unwrap();
    }
    let conn = Connection::open(&path).unwrap();
    // schema creation is idempotent
    db::init_schema(&conn).unwrap();
    let ledger = db::load_ledger(&conn, clock()).unwrap();
    assert_eq!(ledger.categories().all()[0].name, "Rent");
}

#[test]
fn category_delete_drops_budgets_in_memory_and_on_disk() {
    let conn = setup();
    let mut ledger = db::load_ledger(&conn, clock()).unwrap();
    let rent = ledger
        .add_category(NewCategory {
            name: "Rent".into(),
            r#type: TransactionType::Expense,
            description: None,
            icon: None,
            color: None,
            is_default: false,
        })
        .unwrap();
    db::save_category(&conn, &rent).unwrap();
    let budget = ledger
        .add_budget(NewBudget {
            category_id: rent.id,
            amount: Decimal::from(900),
            period: BudgetPeriod::Monthly,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: None,
            alert_threshold: None,
        })
        .unwrap();
    db::save_budget(&conn, &budget).unwrap();

    ledger.delete_category(rent.id).unwrap();
    db::delete_category(&conn, rent.id).unwrap();
    assert!(ledger.budgets().is_empty());
    let reloaded = db::load_ledger(&conn, clock()).unwrap();
    assert_eq!(reloaded.budgets().all(), ledger.budgets().all());
}

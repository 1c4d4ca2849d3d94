// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use ledgerlens::Ledger;
use ledgerlens::cache::{CacheKey, CacheStats, ManualClock, ReportCache};
use ledgerlens::importer::RawTransaction;
use ledgerlens::models::{
    BudgetPatch, BudgetPeriod, CategoryPatch, NewBudget, NewCategory, NewTransaction,
    TransactionPatch, TransactionStatus, TransactionType,
};
use rust_decimal::Decimal;
use serde_json::json;

fn setup() -> (Ledger<ManualClock>, ManualClock, i64) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap());
    let mut ledger = Ledger::with_clock(clock.clone());
    let food = ledger
        .add_category(NewCategory {
            name: "Food".into(),
            r#type: TransactionType::Expense,
            description: None,
            icon: None,
            color: None,
            is_default: false,
        })
        .unwrap()
        .id;
    ledger
        .add_transaction(NewTransaction {
            amount: Decimal::from(25),
            r#type: TransactionType::Expense,
            category_id: Some(food),
            description: Some("lunch".into()),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            status: TransactionStatus::Completed,
        })
        .unwrap();
    (ledger, clock, food)
}

fn stats(l: &Ledger<ManualClock>) -> CacheStats {
    l.cache().stats()
}

#[test]
fn standalone_cache_expires_after_ttl() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    let mut cache: ReportCache<u32, ManualClock> = ReportCache::with_clock(clock.clone());
    let key = CacheKey::with_params("answer", [("n", 1)]);
    cache.set(key.clone(), 42);
    clock.advance(Duration::minutes(4));
    assert_eq!(cache.get(&key), Some(42));
    clock.advance(Duration::minutes(1));
    assert_eq!(cache.get(&key), None);
    assert!(cache.is_empty());
}

#[test]
fn repeated_monthly_report_is_served_from_cache() {
    let (mut ledger, _clock, _) = setup();
    let first = ledger.reports().monthly_report(2024, 6).unwrap();
    let second = ledger.reports().monthly_report(2024, 6).unwrap();
    assert_eq!(first, second);
    assert_eq!(stats(&ledger), CacheStats { hits: 1, misses: 1 });
}

#[test]
fn adding_a_transaction_forces_recompute() {
    let (mut ledger, _clock, food) = setup();
    let before = ledger.reports().monthly_report(2024, 6).unwrap();
    ledger
        .add_transaction(NewTransaction {
            amount: Decimal::from(75),
            r#type: TransactionType::Expense,
            category_id: Some(food),
            description: None,
            date: NaiveDate::from_ymd_opt(2024, 6, 11).unwrap(),
            status: TransactionStatus::Completed,
        })
        .unwrap();
    assert!(ledger.cache().is_empty());
    let after = ledger.reports().monthly_report(2024, 6).unwrap();
    assert_eq!(before.summary.expenses, Decimal::from(25));
    assert_eq!(after.summary.expenses, Decimal::from(100));
    assert_eq!(stats(&ledger), CacheStats { hits: 0, misses: 2 });
}

#[test]
fn report_is_recomputed_once_ttl_has_elapsed() {
    let (mut ledger, clock, _) = setup();
    ledger.reports().yearly_report(2024).unwrap();
    clock.advance(Duration::minutes(5));
    ledger.reports().yearly_report(2024).unwrap();
    assert_eq!(stats(&ledger), CacheStats { hits: 0, misses: 2 });
}

#[test]
fn category_listing_outlives_the_default_ttl() {
    let (mut ledger, clock, _) = setup();
    ledger.reports().categories(None, false).unwrap();
    clock.advance(Duration::minutes(7));
    ledger.reports().categories(None, false).unwrap();
    assert_eq!(stats(&ledger), CacheStats { hits: 1, misses: 1 });
    clock.advance(Duration::minutes(3));
    ledger.reports().categories(None, false).unwrap();
    assert_eq!(stats(&ledger).misses, 2);
}

#[test]
fn every_mutation_clears_the_cache() {
    let (mut ledger, _clock, food) = setup();
    let warm = |l: &mut Ledger<ManualClock>| {
        l.reports().monthly_report(2024, 6).unwrap();
        assert!(!l.cache().is_empty());
    };

    warm(&mut ledger);
    ledger
        .update_transaction(
            1,
            TransactionPatch {
                amount: Some(Decimal::from(30)),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(ledger.cache().is_empty());

    warm(&mut ledger);
    let extra = ledger
        .add_category(NewCategory {
            name: "Rent".into(),
            r#type: TransactionType::Expense,
            description: None,
            icon: None,
            color: None,
            is_default: false,
        })
        .unwrap();
    assert!(ledger.cache().is_empty());

    warm(&mut ledger);
    ledger
        .update_category(
            extra.id,
            CategoryPatch {
                color: Some(Some("#FF0000".into())),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(ledger.cache().is_empty());

    warm(&mut ledger);
    let budget = ledger
        .add_budget(NewBudget {
            category_id: food,
            amount: Decimal::from(300),
            period: BudgetPeriod::Monthly,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            alert_threshold: None,
        })
        .unwrap();
    assert!(ledger.cache().is_empty());

    warm(&mut ledger);
    ledger
        .update_budget(
            budget.id,
            BudgetPatch {
                amount: Some(Decimal::from(350)),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(ledger.cache().is_empty());

    warm(&mut ledger);
    ledger.delete_budget(budget.id).unwrap();
    assert!(ledger.cache().is_empty());

    warm(&mut ledger);
    ledger.delete_category(extra.id).unwrap();
    assert!(ledger.cache().is_empty());

    warm(&mut ledger);
    let summary = ledger.import_transactions(vec![RawTransaction {
        amount: json!("12.50"),
        r#type: "expense".into(),
        date: "2024-06-12".into(),
        category: Some("food".into()),
        ..Default::default()
    }]);
    assert_eq!(summary.imported.len(), 1);
    assert!(ledger.cache().is_empty());

    warm(&mut ledger);
    ledger.bulk_delete_transactions(&[summary.imported[0].id, 999]);
    assert!(ledger.cache().is_empty());

    warm(&mut ledger);
    ledger.delete_transaction(1).unwrap();
    assert!(ledger.cache().is_empty());
}

#[test]
fn failed_mutation_keeps_cached_reports() {
    let (mut ledger, _clock, _) = setup();
    ledger.reports().monthly_report(2024, 6).unwrap();
    assert!(ledger.delete_transaction(404).is_err());
    assert_eq!(ledger.cache().len(), 1);
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use ledgerlens::engine::{self, CategoryIndex, FilterCriteria};
use ledgerlens::models::{
    Category, Transaction, TransactionStatus, TransactionType, UNCATEGORIZED_LABEL,
};
use ledgerlens::Error;
use proptest::prelude::*;
use rust_decimal::Decimal;

const FOOD: i64 = 1;
const TRANSPORT: i64 = 2;
const SALARY: i64 = 3;

fn categories() -> Vec<Category> {
    let cat = |id, name: &str, ty| Category {
        id,
        name: name.to_string(),
        r#type: ty,
        description: None,
        icon: None,
        color: None,
        is_default: false,
        is_active: true,
    };
    vec![
        cat(FOOD, "Food", TransactionType::Expense),
        cat(TRANSPORT, "Transport", TransactionType::Expense),
        cat(SALARY, "Salary", TransactionType::Income),
    ]
}

fn tx(
    id: i64,
    amount: &str,
    ty: TransactionType,
    date: &str,
    category_id: Option<i64>,
    description: Option<&str>,
) -> Transaction {
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(id);
    Transaction {
        id,
        amount: amount.parse().unwrap(),
        r#type: ty,
        category_id,
        description: description.map(String::from),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        status: TransactionStatus::Completed,
        created_at: ts,
        updated_at: ts,
    }
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn totals_income_minus_expenses() {
    let list = vec![
        tx(1, "100", TransactionType::Income, "2024-06-01", None, None),
        tx(2, "40", TransactionType::Expense, "2024-06-02", None, None),
    ];
    let t = engine::totals(&list);
    assert_eq!(t.income, dec("100"));
    assert_eq!(t.expenses, dec("40"));
    assert_eq!(t.balance, dec("60"));
}

#[test]
fn totals_have_no_rounding_drift() {
    let list: Vec<Transaction> = (1..=10)
        .map(|i| tx(i, "0.1", TransactionType::Income, "2024-06-01", None, None))
        .collect();
    assert_eq!(engine::totals(&list).income, dec("1.0"));
}

#[test]
fn empty_input_yields_zeroes() {
    let t = engine::totals(&[]);
    assert_eq!(t.balance, Decimal::ZERO);
    let s = engine::statistics(&[], &CategoryIndex::new(&[]));
    assert_eq!(s.total_transactions, 0);
    assert_eq!(s.avg_transaction_amount, Decimal::ZERO);
    assert_eq!(s.savings_rate, Decimal::ZERO);
    assert!(s.most_used_category.is_none());
    assert!(s.largest_transaction.is_none());
    assert!(engine::monthly_trend(&[]).is_empty());
}

#[test]
fn group_by_category_sums_per_category() {
    let cats = categories();
    let index = CategoryIndex::new(&cats);
    let list = vec![
        tx(1, "20", TransactionType::Expense, "2024-06-01", Some(FOOD), None),
        tx(2, "30", TransactionType::Expense, "2024-06-02", Some(FOOD), None),
        tx(3, "10", TransactionType::Expense, "2024-06-03", Some(TRANSPORT), None),
    ];
    let groups = engine::group_by_category(&list, &index);
    assert_eq!(groups.len(), 2);
    let food = &groups[&(TransactionType::Expense, Some(FOOD))];
    assert_eq!(food.category_name, "Food");
    assert_eq!(food.total_amount, dec("50"));
    assert_eq!(food.count, 2);
    let transport = &groups[&(TransactionType::Expense, Some(TRANSPORT))];
    assert_eq!(transport.total_amount, dec("10"));
    assert_eq!(transport.count, 1);
}

#[test]
fn missing_and_orphaned_categories_become_uncategorized() {
    let cats = categories();
    let index = CategoryIndex::new(&cats);
    let list = vec![
        tx(1, "5", TransactionType::Expense, "2024-06-01", None, None),
        tx(2, "7", TransactionType::Expense, "2024-06-01", Some(999), None),
        tx(3, "9", TransactionType::Expense, "2024-06-01", Some(FOOD), None),
    ];
    let groups = engine::group_by_category(&list, &index);
    let unc = &groups[&(TransactionType::Expense, None)];
    assert_eq!(unc.category_name, UNCATEGORIZED_LABEL);
    assert_eq!(unc.count, 2);
    assert_eq!(unc.total_amount, dec("12"));
}

#[test]
fn savings_rate_is_zero_without_income() {
    let cats = categories();
    let index = CategoryIndex::new(&cats);
    let list = vec![tx(1, "50", TransactionType::Expense, "2024-06-01", None, None)];
    assert_eq!(engine::statistics(&list, &index).savings_rate, Decimal::ZERO);
}

#[test]
fn statistics_averages_and_ties() {
    let list = vec![
        tx(1, "1000", TransactionType::Income, "2024-06-01", Some(SALARY), None),
        tx(2, "200", TransactionType::Expense, "2024-06-02", Some(FOOD), None),
        tx(3, "1000", TransactionType::Expense, "2024-06-03", Some(TRANSPORT), None),
        tx(4, "50", TransactionType::Expense, "2024-06-04", Some(TRANSPORT), None),
        tx(5, "50", TransactionType::Expense, "2024-06-05", Some(FOOD), None),
    ];
    let cats = categories();
    let s = engine::statistics(&list, &CategoryIndex::new(&cats));
    assert_eq!(s.total_transactions, 5);
    assert_eq!(s.avg_transaction_amount, dec("460"));
    assert_eq!(s.avg_income_amount, dec("1000"));
    assert_eq!(s.avg_expense_amount, dec("325"));
    // Food and Transport both used twice; Food was seen first
    let used = s.most_used_category.unwrap();
    assert_eq!(used.category_id, Some(FOOD));
    assert_eq!(used.count, 2);
    // two transactions of 1000; the first one wins
    assert_eq!(s.largest_transaction.unwrap().id, 1);
    // (1000 - 1300) / 1000 * 100
    assert_eq!(s.savings_rate, dec("-30"));
}

#[test]
fn most_used_category_folds_orphans_like_grouping() {
    let cats = categories();
    let index = CategoryIndex::new(&cats);
    let list = vec![
        tx(1, "5", TransactionType::Expense, "2024-06-01", Some(FOOD), None),
        tx(2, "5", TransactionType::Expense, "2024-06-02", Some(FOOD), None),
        tx(3, "5", TransactionType::Expense, "2024-06-03", Some(98), None),
        tx(4, "5", TransactionType::Expense, "2024-06-04", Some(99), None),
        tx(5, "5", TransactionType::Expense, "2024-06-05", None, None),
    ];
    let groups = engine::group_by_category(&list, &index);
    assert_eq!(groups[&(TransactionType::Expense, None)].count, 3);

    let used = engine::statistics(&list, &index).most_used_category.unwrap();
    assert_eq!(used.category_id, None);
    assert_eq!(used.count, 3);
}

#[test]
fn search_is_case_insensitive_over_description_and_category() {
    let cats = categories();
    let index = CategoryIndex::new(&cats);
    let list = vec![
        tx(1, "20", TransactionType::Expense, "2024-06-01", None, Some("Grocery Store")),
        tx(2, "20", TransactionType::Expense, "2024-06-01", Some(FOOD), Some("lunch")),
        tx(3, "20", TransactionType::Expense, "2024-06-01", Some(TRANSPORT), None),
    ];
    let c = FilterCriteria {
        search: Some("grocery".into()),
        ..Default::default()
    };
    let out = engine::filter(&list, &c, &index).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, 1);

    let c = FilterCriteria {
        search: Some("FOO".into()),
        ..Default::default()
    };
    let out = engine::filter(&list, &c, &index).unwrap();
    assert_eq!(out.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2]);
}

#[test]
fn filter_ranges_are_inclusive_and_anded() {
    let cats = categories();
    let index = CategoryIndex::new(&cats);
    let list = vec![
        tx(1, "10", TransactionType::Expense, "2024-06-01", Some(FOOD), None),
        tx(2, "20", TransactionType::Expense, "2024-06-15", Some(FOOD), None),
        tx(3, "30", TransactionType::Expense, "2024-06-30", Some(FOOD), None),
        tx(4, "20", TransactionType::Income, "2024-06-15", Some(SALARY), None),
    ];
    let c = FilterCriteria {
        r#type: Some(TransactionType::Expense),
        start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
        end_date: NaiveDate::from_ymd_opt(2024, 6, 30),
        min_amount: Some(dec("10")),
        max_amount: Some(dec("20")),
        ..Default::default()
    };
    let ids: Vec<i64> = engine::filter(&list, &c, &index)
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);

    let all = engine::filter(&list, &FilterCriteria::default(), &index).unwrap();
    assert_eq!(all.len(), list.len());
}

#[test]
fn inverted_ranges_are_invalid_queries() {
    let cats = categories();
    let index = CategoryIndex::new(&cats);
    let c = FilterCriteria {
        start_date: NaiveDate::from_ymd_opt(2024, 6, 30),
        end_date: NaiveDate::from_ymd_opt(2024, 6, 1),
        ..Default::default()
    };
    assert!(matches!(
        engine::filter(&[], &c, &index),
        Err(Error::InvalidQuery(_))
    ));
    assert!(matches!(
        "transfer".parse::<TransactionType>(),
        Err(Error::InvalidQuery(_))
    ));
    assert_eq!("Income".parse::<TransactionType>().unwrap(), TransactionType::Income);
}

#[test]
fn monthly_trend_buckets_by_transaction_date() {
    let list = vec![
        tx(1, "10", TransactionType::Expense, "2024-03-05", None, None),
        tx(2, "100", TransactionType::Income, "2024-01-20", None, None),
        tx(3, "5", TransactionType::Expense, "2024-01-02", None, None),
        tx(4, "1", TransactionType::Expense, "2023-12-31", None, None),
    ];
    let trend = engine::monthly_trend(&list);
    let months: Vec<&str> = trend.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(months, vec!["2023-12", "2024-01", "2024-03"]);
    assert_eq!(trend[1].income, dec("100"));
    assert_eq!(trend[1].expenses, dec("5"));
    assert_eq!(trend[1].transaction_count, 2);
}

fn arb_transactions() -> impl Strategy<Value = Vec<Transaction>> {
    prop::collection::vec(
        (1i64..1_000_000, any::<bool>(), 0i64..730, prop::option::of(1i64..5)),
        0..60,
    )
    .prop_map(|rows| {
        let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        rows.into_iter()
            .enumerate()
            .map(|(i, (cents, income, offset, cat))| {
                let ty = if income {
                    TransactionType::Income
                } else {
                    TransactionType::Expense
                };
                let date = (base + Duration::days(offset)).to_string();
                let mut t = tx(i as i64 + 1, "1", ty, &date, cat, None);
                t.amount = Decimal::new(cents, 2);
                t
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn balance_is_income_minus_expenses(list in arb_transactions()) {
        let t = engine::totals(&list);
        prop_assert_eq!(t.balance, t.income - t.expenses);
    }

    #[test]
    fn grouping_partitions_the_set(list in arb_transactions()) {
        let cats = categories();
        let index = CategoryIndex::new(&cats);
        let groups = engine::group_by_category(&list, &index);
        let sum: Decimal = groups.values().map(|g| g.total_amount).sum();
        let count: usize = groups.values().map(|g| g.count).sum();
        let t = engine::totals(&list);
        prop_assert_eq!(sum, t.income + t.expenses);
        prop_assert_eq!(count, list.len());
    }

    #[test]
    fn filter_is_idempotent(
        list in arb_transactions(),
        start in 0i64..730,
        len in 0i64..400,
        min_cents in 0i64..500_000,
        income in any::<bool>(),
    ) {
        let cats = categories();
        let index = CategoryIndex::new(&cats);
        let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let c = FilterCriteria {
            r#type: Some(if income { TransactionType::Income } else { TransactionType::Expense }),
            start_date: Some(base + Duration::days(start)),
            end_date: Some(base + Duration::days(start + len)),
            min_amount: Some(Decimal::new(min_cents, 2)),
            ..Default::default()
        };
        let once = engine::filter(&list, &c, &index).unwrap();
        let twice = engine::filter(&once, &c, &index).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn monthly_trend_is_sorted_and_unique(list in arb_transactions()) {
        let trend = engine::monthly_trend(&list);
        for w in trend.windows(2) {
            prop_assert!(w[0].month < w[1].month);
        }
        let count: usize = trend.iter().map(|m| m.transaction_count).sum();
        prop_assert_eq!(count, list.len());
    }
}

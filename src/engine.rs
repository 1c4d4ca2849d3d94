// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Pure aggregation over a transaction collection.
//!
//! Nothing in here mutates its input or performs I/O. Period bucketing always
//! uses the user-assigned `date`, never `created_at`.

use crate::error::{Error, Result};
use crate::models::{
    Budget, BudgetPeriod, Category, CategoryGroup, CategoryUsage, GroupKey, MonthlyTrend,
    Statistics, Totals, Transaction, TransactionStatus, TransactionType, UNCATEGORIZED_LABEL,
};
use crate::utils::{month_end, month_key, month_start, percent_of};
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Read-only id lookup over the category collection.
pub struct CategoryIndex<'a> {
    by_id: HashMap<i64, &'a Category>,
}

impl<'a> CategoryIndex<'a> {
    pub fn new(categories: &'a [Category]) -> Self {
        Self {
            by_id: categories.iter().map(|c| (c.id, c)).collect(),
        }
    }

    pub fn get(&self, id: i64) -> Option<&'a Category> {
        self.by_id.get(&id).copied()
    }

    pub fn name_of(&self, id: Option<i64>) -> &'a str {
        id.and_then(|id| self.get(id))
            .map(|c| c.name.as_str())
            .unwrap_or(UNCATEGORIZED_LABEL)
    }

    /// Resolves a transaction's category, folding missing and orphaned
    /// references into `None`.
    fn resolve(&self, txn: &Transaction) -> Option<i64> {
        let id = txn.category_id?;
        if self.by_id.contains_key(&id) {
            Some(id)
        } else {
            warn!(
                transaction = txn.id,
                category = id,
                "orphaned category reference, grouping as {}",
                UNCATEGORIZED_LABEL
            );
            None
        }
    }
}

pub fn totals(transactions: &[Transaction]) -> Totals {
    let mut t = Totals::default();
    for txn in transactions {
        match txn.r#type {
            TransactionType::Income => t.income += txn.amount,
            TransactionType::Expense => t.expenses += txn.amount,
        }
    }
    t.balance = t.income - t.expenses;
    t
}

/// Filter criteria; every `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub r#type: Option<TransactionType>,
    pub category_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub search: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub status: Option<TransactionStatus>,
}

impl FilterCriteria {
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(Error::invalid_query(format!(
                    "start date {} is after end date {}",
                    start, end
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if min > max {
                return Err(Error::invalid_query(format!(
                    "minimum amount {} is above maximum amount {}",
                    min, max
                )));
            }
        }
        Ok(())
    }

    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    fn matches(&self, txn: &Transaction, needle: Option<&str>, categories: &CategoryIndex) -> bool {
        if self.r#type.is_some_and(|t| t != txn.r#type) {
            return false;
        }
        if self.category_id.is_some() && self.category_id != txn.category_id {
            return false;
        }
        if self.status.is_some_and(|s| s != txn.status) {
            return false;
        }
        if self.start_date.is_some_and(|d| txn.date < d) {
            return false;
        }
        if self.end_date.is_some_and(|d| txn.date > d) {
            return false;
        }
        if self.min_amount.is_some_and(|m| txn.amount < m) {
            return false;
        }
        if self.max_amount.is_some_and(|m| txn.amount > m) {
            return false;
        }
        if let Some(needle) = needle {
            let in_description = txn
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle));
            let in_category = txn
                .category_id
                .and_then(|id| categories.get(id))
                .is_some_and(|c| c.name.to_lowercase().contains(needle));
            if !in_description && !in_category {
                return false;
            }
        }
        true
    }
}

pub fn filter(
    transactions: &[Transaction],
    criteria: &FilterCriteria,
    categories: &CategoryIndex,
) -> Result<Vec<Transaction>> {
    criteria.validate()?;
    let needle = criteria
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    Ok(transactions
        .iter()
        .filter(|t| criteria.matches(t, needle.as_deref(), categories))
        .cloned()
        .collect())
}

/// Newest first; equal dates keep their insertion order.
pub fn sort_by_date_descending(transactions: &[Transaction]) -> Vec<Transaction> {
    let mut out = transactions.to_vec();
    out.sort_by(|a, b| b.date.cmp(&a.date));
    out
}

pub fn group_by_category(
    transactions: &[Transaction],
    categories: &CategoryIndex,
) -> BTreeMap<GroupKey, CategoryGroup> {
    let mut groups: BTreeMap<GroupKey, CategoryGroup> = BTreeMap::new();
    for txn in transactions {
        let category_id = categories.resolve(txn);
        let group = groups
            .entry((txn.r#type, category_id))
            .or_insert_with(|| CategoryGroup {
                category_id,
                category_name: categories.name_of(category_id).to_string(),
                r#type: txn.r#type,
                transactions: Vec::new(),
                total_amount: Decimal::ZERO,
                count: 0,
            });
        group.total_amount += txn.amount;
        group.count += 1;
        group.transactions.push(txn.clone());
    }
    groups
}

pub fn monthly_trend(transactions: &[Transaction]) -> Vec<MonthlyTrend> {
    let mut buckets: BTreeMap<String, MonthlyTrend> = BTreeMap::new();
    for txn in transactions {
        let key = month_key(txn.date);
        let entry = buckets.entry(key.clone()).or_insert_with(|| MonthlyTrend {
            month: key,
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
            transaction_count: 0,
        });
        match txn.r#type {
            TransactionType::Income => entry.income += txn.amount,
            TransactionType::Expense => entry.expenses += txn.amount,
        }
        entry.transaction_count += 1;
    }
    buckets.into_values().collect()
}

/// Summary statistics. Category usage is counted the way `group_by_category`
/// groups, so missing and orphaned references share the Uncategorized slot.
pub fn statistics(transactions: &[Transaction], categories: &CategoryIndex) -> Statistics {
    if transactions.is_empty() {
        return Statistics::default();
    }
    let t = totals(transactions);
    let income_count = transactions
        .iter()
        .filter(|t| t.r#type == TransactionType::Income)
        .count();
    let expense_count = transactions.len() - income_count;

    let avg = |sum: Decimal, n: usize| {
        if n == 0 {
            Decimal::ZERO
        } else {
            sum / Decimal::from(n)
        }
    };

    // first-encountered order is kept so ties resolve to the earliest category
    let mut usage: Vec<(Option<i64>, usize)> = Vec::new();
    let mut position: HashMap<Option<i64>, usize> = HashMap::new();
    let mut largest: Option<&Transaction> = None;
    for txn in transactions {
        let category_id = categories.resolve(txn);
        match position.get(&category_id) {
            Some(&i) => usage[i].1 += 1,
            None => {
                position.insert(category_id, usage.len());
                usage.push((category_id, 1));
            }
        }
        if largest.is_none_or(|l| txn.amount > l.amount) {
            largest = Some(txn);
        }
    }
    let mut most_used: Option<(Option<i64>, usize)> = None;
    for (id, count) in usage {
        if most_used.is_none_or(|(_, best)| count > best) {
            most_used = Some((id, count));
        }
    }

    Statistics {
        total_transactions: transactions.len(),
        avg_transaction_amount: avg(t.income + t.expenses, transactions.len()),
        avg_income_amount: avg(t.income, income_count),
        avg_expense_amount: avg(t.expenses, expense_count),
        most_used_category: most_used.map(|(category_id, count)| CategoryUsage {
            category_id,
            count,
        }),
        largest_transaction: largest.cloned(),
        savings_rate: percent_of(t.income - t.expenses, t.income),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
}

/// One point per calendar day of the month, zero-filled.
pub fn daily_trend(transactions: &[Transaction], year: i32, month: u32) -> Result<Vec<DailyPoint>> {
    let first = month_start(year, month)?;
    let last = month_end(year, month)?;
    let mut points: Vec<DailyPoint> = first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| DailyPoint {
            date,
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
        })
        .collect();
    for txn in transactions {
        if txn.date < first || txn.date > last {
            continue;
        }
        let p = &mut points[(txn.date.day() - 1) as usize];
        match txn.r#type {
            TransactionType::Income => p.income += txn.amount,
            TransactionType::Expense => p.expenses += txn.amount,
        }
    }
    Ok(points)
}

/// The `n` largest expenses, descending; ties keep first-encountered order.
pub fn top_expenses(transactions: &[Transaction], n: usize) -> Vec<Transaction> {
    let mut expenses: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.r#type == TransactionType::Expense)
        .cloned()
        .collect();
    expenses.sort_by(|a, b| b.amount.cmp(&a.amount));
    expenses.truncate(n);
    expenses
}

/// Cumulative balance at the end of each trend month.
pub fn running_balance(trend: &[MonthlyTrend]) -> Vec<(String, Decimal)> {
    let mut acc = Decimal::ZERO;
    trend
        .iter()
        .map(|m| {
            acc += m.income - m.expenses;
            (m.month.clone(), acc)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetProgress {
    pub budget: Budget,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub spent: Decimal,
    pub remaining: Decimal,
    pub percentage: Decimal,
    pub alert: bool,
}

/// The budget period window that contains `on`, clipped to the budget's own
/// start and end dates.
pub fn budget_window(budget: &Budget, on: NaiveDate) -> (NaiveDate, NaiveDate) {
    let mut anchor = on.max(budget.start_date);
    if let Some(end) = budget.end_date {
        anchor = anchor.min(end);
    }
    let (start, end) = match budget.period {
        BudgetPeriod::Daily => (anchor, anchor),
        BudgetPeriod::Weekly => {
            let back = Duration::days(anchor.weekday().num_days_from_monday() as i64);
            let start = anchor.checked_sub_signed(back).unwrap_or(NaiveDate::MIN);
            let end = start
                .checked_add_signed(Duration::days(6))
                .unwrap_or(NaiveDate::MAX);
            (start, end)
        }
        BudgetPeriod::Monthly => {
            let start = anchor.with_day(1).unwrap_or(anchor);
            let end = month_end(anchor.year(), anchor.month()).unwrap_or(anchor);
            (start, end)
        }
        BudgetPeriod::Yearly => (
            NaiveDate::from_ymd_opt(anchor.year(), 1, 1).unwrap_or(anchor),
            NaiveDate::from_ymd_opt(anchor.year(), 12, 31).unwrap_or(anchor),
        ),
    };
    let start = start.max(budget.start_date);
    let end = match budget.end_date {
        Some(e) => end.min(e),
        None => end,
    };
    (start, end)
}

pub fn budget_progress(budget: &Budget, transactions: &[Transaction], today: NaiveDate) -> BudgetProgress {
    let (window_start, window_end) = budget_window(budget, today);
    let spent: Decimal = transactions
        .iter()
        .filter(|t| {
            t.r#type == TransactionType::Expense
                && t.category_id == Some(budget.category_id)
                && t.date >= window_start
                && t.date <= window_end
        })
        .map(|t| t.amount)
        .sum();
    let percentage = percent_of(spent, budget.amount);
    BudgetProgress {
        budget: budget.clone(),
        window_start,
        window_end,
        spent,
        remaining: budget.amount - spent,
        percentage,
        alert: percentage >= budget.alert_threshold,
    }
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Named report shapes assembled from the aggregation engine.
//!
//! Every report goes through the ledger's cache, keyed by its full parameter
//! set. Category listings are cached longer than the aggregates.

use crate::cache::{CATEGORY_TTL_MINUTES, CacheKey, Clock, ReportCache};
use crate::engine::{self, BudgetProgress, CategoryIndex, DailyPoint, FilterCriteria};
use crate::error::{Error, Result};
use crate::models::{
    Budget, Category, MonthlyTrend, Statistics, Totals, Transaction, TransactionType,
};
use crate::utils::{month_end, month_key, month_start, percent_of};
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

pub const TOP_EXPENSES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::invalid_query(format!(
                "period start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn month(year: i32, month: u32) -> Result<Self> {
        Self::new(month_start(year, month)?, month_end(year, month)?)
    }

    pub fn year(year: i32) -> Result<Self> {
        Self::new(month_start(year, 1)?, month_end(year, 12)?)
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The period of equal length ending the day before this one starts.
    pub fn preceding(&self) -> Result<Self> {
        let out_of_range = || {
            Error::invalid_query(format!(
                "no preceding period for {} .. {}",
                self.start, self.end
            ))
        };
        let end = self
            .start
            .checked_sub_signed(Duration::days(1))
            .ok_or_else(out_of_range)?;
        let start = end
            .checked_sub_signed(Duration::days(self.days() - 1))
            .ok_or_else(out_of_range)?;
        Ok(Self { start, end })
    }

    fn criteria(&self) -> FilterCriteria {
        FilterCriteria::default().with_range(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category_id: Option<i64>,
    pub category_name: String,
    pub r#type: TransactionType,
    pub total: Decimal,
    pub count: usize,
    /// Share of all transactions of the same type in the period.
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub summary: Totals,
    pub statistics: Statistics,
    pub category_breakdown: Vec<CategoryBreakdown>,
    pub daily_trend: Vec<DailyPoint>,
    pub top_expenses: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterSummary {
    pub quarter: u8,
    pub income: Decimal,
    pub expenses: Decimal,
    pub balance: Decimal,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearComparison {
    pub previous_year: i32,
    pub previous: Totals,
    pub income_change_pct: Decimal,
    pub expense_change_pct: Decimal,
    pub balance_change: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyReport {
    pub year: i32,
    pub summary: Totals,
    pub months: Vec<MonthlyTrend>,
    pub quarters: Vec<QuarterSummary>,
    pub comparison: YearComparison,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    fn between(previous: Decimal, current: Decimal) -> Self {
        match current.cmp(&previous) {
            std::cmp::Ordering::Greater => TrendDirection::Increasing,
            std::cmp::Ordering::Less => TrendDirection::Decreasing,
            std::cmp::Ordering::Equal => TrendDirection::Stable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReportEntry {
    pub category_id: Option<i64>,
    pub category_name: String,
    pub r#type: TransactionType,
    pub total: Decimal,
    pub count: usize,
    pub percentage: Decimal,
    pub previous_total: Decimal,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReport {
    pub period: ReportPeriod,
    pub r#type: Option<TransactionType>,
    pub totals: Totals,
    pub categories: Vec<CategoryReportEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalancePoint {
    pub month: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendsReport {
    pub period: ReportPeriod,
    pub months: Vec<MonthlyTrend>,
    pub running_balance: Vec<BalancePoint>,
    pub average_income: Decimal,
    pub average_expenses: Decimal,
}

/// Everything the report cache can hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Monthly(MonthlyReport),
    Yearly(YearlyReport),
    Category(CategoryReport),
    Trends(TrendsReport),
    Budgets(Vec<BudgetProgress>),
    Categories(Vec<Category>),
}

trait Cached: Sized + Clone {
    fn into_report(self) -> Report;
    fn from_report(r: Report) -> Option<Self>;
}

macro_rules! cached_variant {
    ($ty:ty, $variant:ident) => {
        impl Cached for $ty {
            fn into_report(self) -> Report {
                Report::$variant(self)
            }
            fn from_report(r: Report) -> Option<Self> {
                match r {
                    Report::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

cached_variant!(MonthlyReport, Monthly);
cached_variant!(YearlyReport, Yearly);
cached_variant!(CategoryReport, Category);
cached_variant!(TrendsReport, Trends);
cached_variant!(Vec<BudgetProgress>, Budgets);
cached_variant!(Vec<Category>, Categories);

pub struct ReportFacade<'a, C: Clock> {
    transactions: &'a [Transaction],
    categories: &'a [Category],
    budgets: &'a [Budget],
    cache: &'a mut ReportCache<Report, C>,
    top_expenses: usize,
}

impl<'a, C: Clock> ReportFacade<'a, C> {
    pub fn new(
        transactions: &'a [Transaction],
        categories: &'a [Category],
        budgets: &'a [Budget],
        cache: &'a mut ReportCache<Report, C>,
    ) -> Self {
        Self {
            transactions,
            categories,
            budgets,
            cache,
            top_expenses: TOP_EXPENSES,
        }
    }

    pub fn with_top_expenses(mut self, n: usize) -> Self {
        self.top_expenses = n;
        self
    }

    fn cached<T, F>(&mut self, key: CacheKey, ttl: Option<Duration>, compute: F) -> Result<T>
    where
        T: Cached,
        F: FnOnce(&Self) -> Result<T>,
    {
        if let Some(hit) = self.cache.get(&key).and_then(T::from_report) {
            return Ok(hit);
        }
        let value = compute(&*self)?;
        let report = value.clone().into_report();
        match ttl {
            Some(ttl) => self.cache.set_with_ttl(key, report, ttl),
            None => self.cache.set(key, report),
        }
        Ok(value)
    }

    fn in_period(&self, period: &ReportPeriod, index: &CategoryIndex) -> Result<Vec<Transaction>> {
        engine::filter(self.transactions, &period.criteria(), index)
    }

    pub fn monthly_report(&mut self, year: i32, month: u32) -> Result<MonthlyReport> {
        let period = ReportPeriod::month(year, month)?;
        let key = CacheKey::with_params(
            "monthly_report",
            [
                ("year", year as i64),
                ("month", month as i64),
                ("top", self.top_expenses as i64),
            ],
        );
        self.cached(key, None, |f| {
            let index = CategoryIndex::new(f.categories);
            let txns = f.in_period(&period, &index)?;
            let summary = engine::totals(&txns);
            let mut category_breakdown: Vec<CategoryBreakdown> =
                engine::group_by_category(&txns, &index)
                    .into_values()
                    .map(|g| {
                        let type_total = match g.r#type {
                            TransactionType::Income => summary.income,
                            TransactionType::Expense => summary.expenses,
                        };
                        CategoryBreakdown {
                            percentage: percent_of(g.total_amount, type_total),
                            category_id: g.category_id,
                            category_name: g.category_name,
                            r#type: g.r#type,
                            total: g.total_amount,
                            count: g.count,
                        }
                    })
                    .collect();
            category_breakdown.sort_by(|a, b| b.total.cmp(&a.total));
            Ok(MonthlyReport {
                year,
                month,
                summary,
                statistics: engine::statistics(&txns, &index),
                category_breakdown,
                daily_trend: engine::daily_trend(&txns, year, month)?,
                top_expenses: engine::top_expenses(&txns, f.top_expenses),
            })
        })
    }

    pub fn yearly_report(&mut self, year: i32) -> Result<YearlyReport> {
        let period = ReportPeriod::year(year)?;
        let previous_period = ReportPeriod::year(year - 1)?;
        let key = CacheKey::with_params("yearly_report", [("year", year)]);
        self.cached(key, None, |f| {
            let index = CategoryIndex::new(f.categories);
            let txns = f.in_period(&period, &index)?;
            let summary = engine::totals(&txns);
            let months = zero_filled_months(&txns, &period)?;
            let quarters = months
                .chunks(3)
                .enumerate()
                .map(|(i, q)| {
                    let income: Decimal = q.iter().map(|m| m.income).sum();
                    let expenses: Decimal = q.iter().map(|m| m.expenses).sum();
                    QuarterSummary {
                        quarter: i as u8 + 1,
                        income,
                        expenses,
                        balance: income - expenses,
                        transaction_count: q.iter().map(|m| m.transaction_count).sum(),
                    }
                })
                .collect();
            let previous = engine::totals(&f.in_period(&previous_period, &index)?);
            Ok(YearlyReport {
                year,
                summary,
                months,
                quarters,
                comparison: YearComparison {
                    previous_year: year - 1,
                    previous,
                    income_change_pct: percent_of(summary.income - previous.income, previous.income),
                    expense_change_pct: percent_of(
                        summary.expenses - previous.expenses,
                        previous.expenses,
                    ),
                    balance_change: summary.balance - previous.balance,
                },
            })
        })
    }

    pub fn category_report(
        &mut self,
        period: ReportPeriod,
        ty: Option<TransactionType>,
    ) -> Result<CategoryReport> {
        let key = CacheKey::with_params(
            "category_report",
            [
                ("start", period.start.to_string()),
                ("end", period.end.to_string()),
                ("type", ty.map(|t| t.as_str().to_string()).unwrap_or_default()),
            ],
        );
        self.cached(key, None, |f| {
            let index = CategoryIndex::new(f.categories);
            let restrict = |p: &ReportPeriod| -> Result<Vec<Transaction>> {
                let mut c = p.criteria();
                c.r#type = ty;
                engine::filter(f.transactions, &c, &index)
            };
            let current = restrict(&period)?;
            let previous = restrict(&period.preceding()?)?;
            let totals = engine::totals(&current);
            let previous_groups = engine::group_by_category(&previous, &index);

            let mut categories: Vec<CategoryReportEntry> = engine::group_by_category(&current, &index)
                .into_iter()
                .map(|(key, g)| {
                    let previous_total = previous_groups
                        .get(&key)
                        .map(|p| p.total_amount)
                        .unwrap_or(Decimal::ZERO);
                    let type_total = match g.r#type {
                        TransactionType::Income => totals.income,
                        TransactionType::Expense => totals.expenses,
                    };
                    CategoryReportEntry {
                        percentage: percent_of(g.total_amount, type_total),
                        trend: TrendDirection::between(previous_total, g.total_amount),
                        previous_total,
                        category_id: g.category_id,
                        category_name: g.category_name,
                        r#type: g.r#type,
                        total: g.total_amount,
                        count: g.count,
                    }
                })
                .collect();
            categories.sort_by(|a, b| b.total.cmp(&a.total));
            Ok(CategoryReport {
                period,
                r#type: ty,
                totals,
                categories,
            })
        })
    }

    pub fn trends_report(&mut self, period: ReportPeriod) -> Result<TrendsReport> {
        let key = CacheKey::with_params(
            "trends_report",
            [
                ("start", period.start.to_string()),
                ("end", period.end.to_string()),
            ],
        );
        self.cached(key, None, |f| {
            let index = CategoryIndex::new(f.categories);
            let txns = f.in_period(&period, &index)?;
            let months = zero_filled_months(&txns, &period)?;
            let running_balance = engine::running_balance(&months)
                .into_iter()
                .map(|(month, balance)| BalancePoint { month, balance })
                .collect();
            let n = Decimal::from(months.len().max(1));
            let average_income = months.iter().map(|m| m.income).sum::<Decimal>() / n;
            let average_expenses = months.iter().map(|m| m.expenses).sum::<Decimal>() / n;
            Ok(TrendsReport {
                period,
                months,
                running_balance,
                average_income,
                average_expenses,
            })
        })
    }

    pub fn budget_report(&mut self, today: NaiveDate) -> Result<Vec<BudgetProgress>> {
        let key = CacheKey::with_params("budget_report", [("today", today.to_string())]);
        self.cached(key, None, |f| {
            Ok(f.budgets
                .iter()
                .map(|b| engine::budget_progress(b, f.transactions, today))
                .collect())
        })
    }

    /// Categories of one type (or all), active ones only unless asked.
    pub fn categories(
        &mut self,
        ty: Option<TransactionType>,
        include_inactive: bool,
    ) -> Result<Vec<Category>> {
        let key = CacheKey::with_params(
            "categories",
            [
                ("type", ty.map(|t| t.as_str().to_string()).unwrap_or_default()),
                ("inactive", include_inactive.to_string()),
            ],
        );
        self.cached(
            key,
            Some(Duration::minutes(CATEGORY_TTL_MINUTES)),
            |f| {
                Ok(f.categories
                    .iter()
                    .filter(|c| ty.is_none_or(|t| c.r#type == t))
                    .filter(|c| include_inactive || c.is_active)
                    .cloned()
                    .collect())
            },
        )
    }
}

/// Monthly trend across every month the period touches, including empty ones.
fn zero_filled_months(transactions: &[Transaction], period: &ReportPeriod) -> Result<Vec<MonthlyTrend>> {
    let mut active: HashMap<String, MonthlyTrend> = engine::monthly_trend(transactions)
        .into_iter()
        .map(|m| (m.month.clone(), m))
        .collect();
    let mut out = Vec::new();
    let mut cursor = month_start(period.start.year(), period.start.month())?;
    while cursor <= period.end {
        let key = month_key(cursor);
        out.push(active.remove(&key).unwrap_or(MonthlyTrend {
            month: key,
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
            transaction_count: 0,
        }));
        let (y, m) = if cursor.month() == 12 {
            (cursor.year() + 1, 1)
        } else {
            (cursor.year(), cursor.month() + 1)
        };
        cursor = month_start(y, m)?;
    }
    Ok(out)
}

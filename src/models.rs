// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::Error;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_CATEGORY_NAME_LEN: usize = 100;

/// Largest accepted single amount (one trillion). Keeps every sum the engine
/// forms far below `Decimal::MAX`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Accepts any casing; the rest of the crate only ever sees the enum.
impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(Error::invalid_query(format!(
                "unrecognized transaction type '{}', expected income|expense",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "cancelled" | "canceled" => Ok(TransactionStatus::Cancelled),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(Error::invalid_query(format!(
                "unrecognized status '{}', expected pending|completed|cancelled|failed",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Daily => "daily",
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
        }
    }
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(BudgetPeriod::Daily),
            "weekly" => Ok(BudgetPeriod::Weekly),
            "monthly" => Ok(BudgetPeriod::Monthly),
            "yearly" => Ok(BudgetPeriod::Yearly),
            other => Err(Error::validation(format!(
                "unrecognized budget period '{}', expected daily|weekly|monthly|yearly",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub amount: Decimal,
    pub r#type: TransactionType,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new transaction; the ledger assigns id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub r#type: TransactionType,
    pub category_id: Option<i64>,
    pub description: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPatch {
    pub amount: Option<Decimal>,
    pub r#type: Option<TransactionType>,
    pub category_id: Option<Option<i64>>,
    pub description: Option<Option<String>>,
    pub date: Option<NaiveDate>,
    pub status: Option<TransactionStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub r#type: TransactionType,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub r#type: TransactionType,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub alert_threshold: Decimal, // percent
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBudget {
    pub category_id: i64,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub alert_threshold: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetPatch {
    pub amount: Option<Decimal>,
    pub period: Option<BudgetPeriod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub alert_threshold: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub income: Decimal,
    pub expenses: Decimal,
    pub balance: Decimal,
}

/// Grouping key: `None` is the synthetic "Uncategorized" bucket.
pub type GroupKey = (TransactionType, Option<i64>);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub category_id: Option<i64>,
    pub category_name: String,
    pub r#type: TransactionType,
    pub transactions: Vec<Transaction>,
    pub total_amount: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub month: String, // YYYY-MM
    pub income: Decimal,
    pub expenses: Decimal,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryUsage {
    pub category_id: Option<i64>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total_transactions: usize,
    pub avg_transaction_amount: Decimal,
    pub avg_income_amount: Decimal,
    pub avg_expense_amount: Decimal,
    pub most_used_category: Option<CategoryUsage>,
    pub largest_transaction: Option<Transaction>,
    pub savings_rate: Decimal,
}

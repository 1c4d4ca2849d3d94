// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! In-memory stores and the `Ledger` context that owns them.
//!
//! Every mutating ledger operation clears the report cache in full, so a read
//! after a write never sees a report computed before it.

use crate::cache::{Clock, ReportCache, SystemClock};
use crate::error::{Error, Result};
use crate::models::{
    Budget, BudgetPatch, Category, CategoryPatch, MAX_AMOUNT, MAX_CATEGORY_NAME_LEN,
    MAX_DESCRIPTION_LEN, NewBudget, NewCategory, NewTransaction, Transaction, TransactionPatch,
    TransactionType,
};
use crate::reports::{Report, ReportFacade};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use tracing::{info, warn};

pub const DEFAULT_ALERT_THRESHOLD: i64 = 80;

/// Insertion-ordered collection with store-assigned ids.
#[derive(Debug, Clone)]
pub struct Store<T> {
    items: Vec<T>,
    next_id: i64,
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
        }
    }
}

pub trait Identified {
    fn id(&self) -> i64;
}

impl Identified for Transaction {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Identified for Category {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Identified for Budget {
    fn id(&self) -> i64 {
        self.id
    }
}

impl<T: Identified> Store<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        let next_id = items.iter().map(|i| i.id()).max().unwrap_or(0) + 1;
        Self { items, next_id }
    }

    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.items.iter().find(|i| i.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn push(&mut self, item: T) {
        self.items.push(item);
    }

    fn get_mut(&mut self, id: i64) -> Option<&mut T> {
        self.items.iter_mut().find(|i| i.id() == id)
    }

    fn remove(&mut self, id: i64) -> Option<T> {
        let pos = self.items.iter().position(|i| i.id() == id)?;
        Some(self.items.remove(pos))
    }
}

pub type TransactionStore = Store<Transaction>;
pub type CategoryStore = Store<Category>;
pub type BudgetStore = Store<Budget>;

impl CategoryStore {
    /// Case-insensitive lookup within a type.
    pub fn find_by_name(&self, name: &str, ty: TransactionType) -> Option<&Category> {
        let needle = name.trim().to_lowercase();
        self.all()
            .iter()
            .find(|c| c.r#type == ty && c.name.to_lowercase() == needle)
    }

    /// Case-insensitive lookup across both types; first match wins.
    pub fn find_any_by_name(&self, name: &str) -> Option<&Category> {
        let needle = name.trim().to_lowercase();
        self.all().iter().find(|c| c.name.to_lowercase() == needle)
    }
}

/// Session context: the stores plus the report cache built over them.
pub struct Ledger<C: Clock = SystemClock> {
    pub(crate) transactions: TransactionStore,
    pub(crate) categories: CategoryStore,
    pub(crate) budgets: BudgetStore,
    pub(crate) cache: ReportCache<Report, C>,
}

impl Ledger<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Ledger<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Ledger<C> {
    pub fn with_clock(clock: C) -> Self {
        Self::from_parts(Vec::new(), Vec::new(), Vec::new(), clock)
    }

    pub fn from_parts(
        transactions: Vec<Transaction>,
        categories: Vec<Category>,
        budgets: Vec<Budget>,
        clock: C,
    ) -> Self {
        Self {
            transactions: Store::from_items(transactions),
            categories: Store::from_items(categories),
            budgets: Store::from_items(budgets),
            cache: ReportCache::with_clock(clock),
        }
    }

    pub fn transactions(&self) -> &TransactionStore {
        &self.transactions
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    pub fn budgets(&self) -> &BudgetStore {
        &self.budgets
    }

    pub fn cache(&self) -> &ReportCache<Report, C> {
        &self.cache
    }

    pub fn today(&self) -> NaiveDate {
        self.cache.clock().now().date_naive()
    }

    pub fn reports(&mut self) -> ReportFacade<'_, C> {
        ReportFacade::new(
            self.transactions.all(),
            self.categories.all(),
            self.budgets.all(),
            &mut self.cache,
        )
    }

    fn validate_transaction(
        &self,
        amount: Decimal,
        ty: TransactionType,
        category_id: Option<i64>,
        description: Option<&str>,
        date: NaiveDate,
    ) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::validation(format!("amount must be positive, got {}", amount)));
        }
        if amount > MAX_AMOUNT {
            return Err(Error::validation(format!(
                "amount {} exceeds the maximum of {}",
                amount, MAX_AMOUNT
            )));
        }
        if let Some(d) = description {
            if d.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(Error::validation(format!(
                    "description longer than {} characters",
                    MAX_DESCRIPTION_LEN
                )));
            }
        }
        let latest = self.today() + Duration::days(1);
        if date > latest {
            return Err(Error::validation(format!(
                "date {} is more than one day in the future",
                date
            )));
        }
        if let Some(cid) = category_id {
            let cat = self.categories.get(cid).ok_or(Error::NotFound {
                kind: "category",
                id: cid,
            })?;
            if cat.r#type != ty {
                return Err(Error::validation(format!(
                    "category '{}' is {} but transaction is {}",
                    cat.name, cat.r#type, ty
                )));
            }
        }
        Ok(())
    }

    pub fn add_transaction(&mut self, new: NewTransaction) -> Result<Transaction> {
        let description = normalize_text(new.description);
        self.validate_transaction(
            new.amount,
            new.r#type,
            new.category_id,
            description.as_deref(),
            new.date,
        )?;
        let now = self.cache.clock().now();
        let txn = Transaction {
            id: self.transactions.allocate_id(),
            amount: new.amount,
            r#type: new.r#type,
            category_id: new.category_id,
            description,
            date: new.date,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        self.transactions.push(txn.clone());
        self.cache.invalidate_all();
        info!(id = txn.id, amount = %txn.amount, kind = %txn.r#type, "transaction added");
        Ok(txn)
    }

    /// Inserts an already-coerced record without the positive-amount check.
    /// Used by imports, where bad amounts have been logged and zeroed.
    pub(crate) fn ingest_transaction(&mut self, mut txn: Transaction) -> Transaction {
        txn.id = self.transactions.allocate_id();
        self.transactions.push(txn.clone());
        txn
    }

    pub(crate) fn after_bulk_mutation(&mut self) {
        self.cache.invalidate_all();
    }

    pub fn update_transaction(&mut self, id: i64, patch: TransactionPatch) -> Result<Transaction> {
        let current = self
            .transactions
            .get(id)
            .cloned()
            .ok_or(Error::NotFound {
                kind: "transaction",
                id,
            })?;
        let mut next = current;
        if let Some(a) = patch.amount {
            next.amount = a;
        }
        if let Some(t) = patch.r#type {
            next.r#type = t;
        }
        if let Some(c) = patch.category_id {
            next.category_id = c;
        }
        if let Some(d) = patch.description {
            next.description = normalize_text(d);
        }
        if let Some(d) = patch.date {
            next.date = d;
        }
        if let Some(s) = patch.status {
            next.status = s;
        }
        self.validate_transaction(
            next.amount,
            next.r#type,
            next.category_id,
            next.description.as_deref(),
            next.date,
        )?;
        next.updated_at = self.cache.clock().now();
        if let Some(slot) = self.transactions.get_mut(id) {
            *slot = next.clone();
        }
        self.cache.invalidate_all();
        info!(id, "transaction updated");
        Ok(next)
    }

    pub fn delete_transaction(&mut self, id: i64) -> Result<Transaction> {
        let removed = self.transactions.remove(id).ok_or(Error::NotFound {
            kind: "transaction",
            id,
        })?;
        self.cache.invalidate_all();
        info!(id, "transaction deleted");
        Ok(removed)
    }

    /// Deletes every listed transaction that exists; unknown ids are skipped.
    pub fn bulk_delete_transactions(&mut self, ids: &[i64]) -> Vec<Transaction> {
        let mut removed = Vec::new();
        for &id in ids {
            match self.transactions.remove(id) {
                Some(t) => removed.push(t),
                None => warn!(id, "bulk delete skipped unknown transaction"),
            }
        }
        self.cache.invalidate_all();
        info!(requested = ids.len(), removed = removed.len(), "bulk delete");
        removed
    }

    fn validate_category_fields(
        &self,
        name: &str,
        ty: TransactionType,
        description: Option<&str>,
        color: Option<&str>,
        exclude: Option<i64>,
    ) -> Result<()> {
        let len = name.chars().count();
        if len == 0 || len > MAX_CATEGORY_NAME_LEN {
            return Err(Error::validation(format!(
                "category name must be 1-{} characters",
                MAX_CATEGORY_NAME_LEN
            )));
        }
        if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN) {
            return Err(Error::validation(format!(
                "description longer than {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }
        if let Some(c) = color {
            if !is_hex_color(c) {
                return Err(Error::validation(format!("invalid hex color '{}'", c)));
            }
        }
        if let Some(existing) = self.categories.find_by_name(name, ty) {
            if Some(existing.id) != exclude {
                return Err(Error::Conflict(format!(
                    "{} category '{}' already exists",
                    ty, existing.name
                )));
            }
        }
        Ok(())
    }

    pub fn add_category(&mut self, new: NewCategory) -> Result<Category> {
        let name = new.name.trim().to_string();
        let description = normalize_text(new.description);
        let color = normalize_text(new.color);
        self.validate_category_fields(
            &name,
            new.r#type,
            description.as_deref(),
            color.as_deref(),
            None,
        )?;
        let cat = Category {
            id: self.categories.allocate_id(),
            name,
            r#type: new.r#type,
            description,
            icon: normalize_text(new.icon),
            color,
            is_default: new.is_default,
            is_active: true,
        };
        self.categories.push(cat.clone());
        self.cache.invalidate_all();
        info!(id = cat.id, name = %cat.name, "category added");
        Ok(cat)
    }

    pub fn update_category(&mut self, id: i64, patch: CategoryPatch) -> Result<Category> {
        let mut next = self.categories.get(id).cloned().ok_or(Error::NotFound {
            kind: "category",
            id,
        })?;
        if let Some(n) = patch.name {
            next.name = n.trim().to_string();
        }
        if let Some(d) = patch.description {
            next.description = normalize_text(d);
        }
        if let Some(i) = patch.icon {
            next.icon = normalize_text(i);
        }
        if let Some(c) = patch.color {
            next.color = normalize_text(c);
        }
        if let Some(a) = patch.is_active {
            next.is_active = a;
        }
        self.validate_category_fields(
            &next.name,
            next.r#type,
            next.description.as_deref(),
            next.color.as_deref(),
            Some(id),
        )?;
        if let Some(slot) = self.categories.get_mut(id) {
            *slot = next.clone();
        }
        self.cache.invalidate_all();
        info!(id, "category updated");
        Ok(next)
    }

    /// Removes a category and its budgets. Transactions pointing at it are
    /// left as they are and fall into the "Uncategorized" bucket from then on.
    pub fn delete_category(&mut self, id: i64) -> Result<Category> {
        let cat = self.categories.get(id).ok_or(Error::NotFound {
            kind: "category",
            id,
        })?;
        if cat.is_default {
            return Err(Error::Conflict(format!(
                "default category '{}' cannot be deleted",
                cat.name
            )));
        }
        let removed = self.categories.remove(id).ok_or(Error::NotFound {
            kind: "category",
            id,
        })?;
        // budgets go with their category, as the budgets table cascades
        let orphaned: Vec<i64> = self
            .budgets
            .all()
            .iter()
            .filter(|b| b.category_id == id)
            .map(|b| b.id)
            .collect();
        for budget_id in &orphaned {
            self.budgets.remove(*budget_id);
        }
        self.cache.invalidate_all();
        info!(id, name = %removed.name, budgets = orphaned.len(), "category deleted");
        Ok(removed)
    }

    fn validate_budget(&self, b: &Budget) -> Result<()> {
        if b.amount <= Decimal::ZERO || b.amount > MAX_AMOUNT {
            return Err(Error::validation(format!(
                "budget amount must be within 0-{}, got {}",
                MAX_AMOUNT, b.amount
            )));
        }
        if self.categories.get(b.category_id).is_none() {
            return Err(Error::NotFound {
                kind: "category",
                id: b.category_id,
            });
        }
        if b.end_date.is_some_and(|e| e < b.start_date) {
            return Err(Error::validation("budget end date is before its start date"));
        }
        if b.alert_threshold < Decimal::ZERO || b.alert_threshold > Decimal::ONE_HUNDRED {
            return Err(Error::validation(format!(
                "alert threshold must be within 0-100, got {}",
                b.alert_threshold
            )));
        }
        Ok(())
    }

    pub fn add_budget(&mut self, new: NewBudget) -> Result<Budget> {
        let mut budget = Budget {
            id: 0,
            category_id: new.category_id,
            amount: new.amount,
            period: new.period,
            start_date: new.start_date,
            end_date: new.end_date,
            alert_threshold: new
                .alert_threshold
                .unwrap_or(Decimal::from(DEFAULT_ALERT_THRESHOLD)),
        };
        self.validate_budget(&budget)?;
        budget.id = self.budgets.allocate_id();
        self.budgets.push(budget.clone());
        self.cache.invalidate_all();
        info!(id = budget.id, category = budget.category_id, "budget added");
        Ok(budget)
    }

    pub fn update_budget(&mut self, id: i64, patch: BudgetPatch) -> Result<Budget> {
        let mut next = self
            .budgets
            .get(id)
            .cloned()
            .ok_or(Error::NotFound { kind: "budget", id })?;
        if let Some(a) = patch.amount {
            next.amount = a;
        }
        if let Some(p) = patch.period {
            next.period = p;
        }
        if let Some(d) = patch.start_date {
            next.start_date = d;
        }
        if let Some(d) = patch.end_date {
            next.end_date = d;
        }
        if let Some(t) = patch.alert_threshold {
            next.alert_threshold = t;
        }
        self.validate_budget(&next)?;
        if let Some(slot) = self.budgets.get_mut(id) {
            *slot = next.clone();
        }
        self.cache.invalidate_all();
        info!(id, "budget updated");
        Ok(next)
    }

    pub fn delete_budget(&mut self, id: i64) -> Result<Budget> {
        let removed = self
            .budgets
            .remove(id)
            .ok_or(Error::NotFound { kind: "budget", id })?;
        self.cache.invalidate_all();
        info!(id, "budget deleted");
        Ok(removed)
    }
}

fn normalize_text(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn is_hex_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

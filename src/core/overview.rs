//! Monthly overview - totals and per-category breakdown for one calendar month.
//!
//! The overview is never stored. [`summarize`] derives it from the records of a
//! month; [`monthly_overview`] fetches those records from the store first, and
//! [`watch_monthly_overview`] keeps re-deriving it as the month's live range
//! query changes. Month bounds come from [`crate::core::calendar::month_bounds`].

use crate::{
    core::{
        calendar::{format_month, format_month_label, month_bounds},
        expense::ExpenseStore,
        live::{ExpenseQuery, LiveQuery},
    },
    entities::expense,
    errors::Result,
};
use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use tracing::{debug, instrument};

/// Aggregate view of one month of expenses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyOverview {
    /// Display label (e.g., "December 2024")
    pub month: String,
    /// Sortable month key (e.g., "2024-12")
    pub month_key: String,
    /// Sum of all amounts in the month, 0.0 when empty
    pub total_amount: f64,
    /// Number of expenses in the month
    pub total_expenses: usize,
    /// The month's expenses, newest first
    pub expenses: Vec<expense::Model>,
    /// Summed amount per category; categories without expenses are absent
    pub category_summary: BTreeMap<String, f64>,
}

/// One row of the per-category breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// Category name
    pub category: String,
    /// Summed amount for the category
    pub total: f64,
}

impl MonthlyOverview {
    /// Overview of a month with no expenses.
    #[must_use]
    pub fn empty<Tz: TimeZone>(reference: &DateTime<Tz>) -> Self
    where
        Tz::Offset: Display,
    {
        summarize(reference, Vec::new())
    }

    /// Categories sorted by summed amount, largest first. Ties keep the order in
    /// which the categories first appear in [`MonthlyOverview::expenses`].
    #[must_use]
    pub fn by_category(&self) -> Vec<CategoryTotal> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut totals: Vec<CategoryTotal> = Vec::new();

        for expense in &self.expenses {
            if let Some(&i) = index.get(expense.category.as_str()) {
                totals[i].total += expense.amount;
            } else {
                index.insert(expense.category.as_str(), totals.len());
                totals.push(CategoryTotal {
                    category: expense.category.clone(),
                    total: expense.amount,
                });
            }
        }

        totals.sort_by(|a, b| b.total.total_cmp(&a.total));
        totals
    }
}

/// Derives the overview of the month containing `reference` from that month's records.
#[must_use]
pub fn summarize<Tz: TimeZone>(
    reference: &DateTime<Tz>,
    expenses: Vec<expense::Model>,
) -> MonthlyOverview
where
    Tz::Offset: Display,
{
    build(format_month_label(reference), format_month(reference), expenses)
}

fn build(month: String, month_key: String, expenses: Vec<expense::Model>) -> MonthlyOverview {
    let total_amount = expenses.iter().map(|e| e.amount).sum();

    let mut category_summary: BTreeMap<String, f64> = BTreeMap::new();
    for expense in &expenses {
        *category_summary.entry(expense.category.clone()).or_insert(0.0) += expense.amount;
    }

    MonthlyOverview {
        month,
        month_key,
        total_amount,
        total_expenses: expenses.len(),
        expenses,
        category_summary,
    }
}

/// Loads the month containing `reference` from the store and summarizes it.
#[instrument(skip(store))]
pub async fn monthly_overview<Tz>(
    store: &ExpenseStore,
    reference: &DateTime<Tz>,
) -> Result<MonthlyOverview>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let (start, end) = month_bounds(reference);
    let expenses = store.list(&ExpenseQuery::DateRange { start, end }).await?;
    debug!(rows = expenses.len(), "Loaded month for overview");
    Ok(summarize(reference, expenses))
}

/// Overview of the current month in the local time zone.
pub async fn current_month_overview(store: &ExpenseStore) -> Result<MonthlyOverview> {
    monthly_overview(store, &Local::now()).await
}

/// Subscribes to the overview of the month containing `reference`.
pub async fn watch_monthly_overview<Tz>(
    store: &ExpenseStore,
    reference: &DateTime<Tz>,
) -> Result<LiveOverview>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let (start, end) = month_bounds(reference);
    let query = store.get_by_date_range(start, end).await?;
    let month = format_month_label(reference);
    let month_key = format_month(reference);
    let current = build(month.clone(), month_key.clone(), query.snapshot().to_vec());

    Ok(LiveOverview {
        query,
        month,
        month_key,
        current,
    })
}

/// A monthly overview that follows the store.
#[derive(Debug)]
pub struct LiveOverview {
    query: LiveQuery,
    month: String,
    month_key: String,
    current: MonthlyOverview,
}

impl LiveOverview {
    /// The latest overview
    #[must_use]
    pub const fn overview(&self) -> &MonthlyOverview {
        &self.current
    }

    /// Waits until the month's records change and returns the new overview.
    /// `None` once the underlying live query has ended.
    pub async fn next(&mut self) -> Option<MonthlyOverview> {
        let expenses = self.query.next().await?;
        self.current = build(self.month.clone(), self.month_key.clone(), expenses);
        Some(self.current.clone())
    }

    /// Ends the subscription.
    pub fn cancel(self) {
        self.query.cancel();
    }
}

//! Shared test utilities for the expense logger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test expenses with sensible defaults.

use crate::{
    core::expense::{ExpenseStore, NewExpense},
    entities,
    errors::Result,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

/// Routes tracing output through the test harness. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = crate::config::database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// An [`ExpenseStore`] over a fresh in-memory database.
pub async fn setup_store() -> Result<ExpenseStore> {
    Ok(ExpenseStore::new(setup_test_db().await?))
}

/// A UTC timestamp with millisecond precision.
///
/// # Panics
/// On an invalid calendar date; test input only.
#[allow(clippy::unwrap_used, clippy::too_many_arguments)]
pub fn at(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    millis: u32,
) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second).unwrap()
        + TimeDelta::milliseconds(i64::from(millis))
}

/// Caller-side input for a new expense dated `date`.
pub fn new_expense(title: &str, amount: f64, category: &str, date: DateTime<Utc>) -> NewExpense {
    NewExpense::new(title, amount, category, date)
}

/// An unsaved record dated `date`, with both bookkeeping timestamps set to `date`.
pub fn expense_on(
    title: &str,
    amount: f64,
    category: &str,
    date: DateTime<Utc>,
) -> entities::expense::Model {
    new_expense(title, amount, category, date).into_record(date)
}

/// A record as it would come back from the store.
///
/// # Defaults
/// * `title`: `"Expense {id}"`
/// * `amount`: 10.0
/// * `category`: `"Other"`
/// * `date`: 2024-12-01 12:00 UTC
pub fn sample_expense(id: i64) -> entities::expense::Model {
    let date = at(2024, 12, 1, 12, 0, 0, 0);
    entities::expense::Model {
        id,
        title: format!("Expense {id}"),
        amount: 10.0,
        category: "Other".to_string(),
        description: None,
        date,
        created_at: date,
        updated_at: date,
    }
}

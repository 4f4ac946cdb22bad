//! Database configuration module for the expense logger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! The `expenses` table is generated from the entity definition with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust model.
//! A secondary index on `date` backs the range queries and date-descending ordering.

use crate::entities::{Expense, expense};
use crate::errors::{Error, Result};
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/expenses.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back
/// to a local `SQLite` file that is created on first use.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`],
/// creating the parent directory of a file-backed `SQLite` database first.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if let Some(dir) = sqlite_parent_dir(&database_url) {
        std::fs::create_dir_all(dir).map_err(|e| Error::Config {
            message: format!("Failed to create database directory {}: {e}", dir.display()),
        })?;
    }
    connect(&database_url).await
}

/// Directory holding the file of a `sqlite://` URL, `None` for in-memory or
/// non-`SQLite` URLs and for files in the working directory.
fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
}

/// Establishes a connection to an explicit database URL.
#[instrument]
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Opening database connection");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates the `expenses` table and its date index if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut expense_table = schema.create_table_from_entity(Expense);
    expense_table.if_not_exists();
    db.execute(builder.build(&expense_table)).await?;

    let date_index = Index::create()
        .if_not_exists()
        .name("idx_expenses_date")
        .table(Expense)
        .col(expense::Column::Date)
        .to_owned();
    db.execute(builder.build(&date_index)).await?;

    info!("Database tables ensured");
    Ok(())
}

//! Unified error type for the expense logger.
//!
//! Store failures, lookups that miss, and input validation all surface through
//! [`Error`]. Quota exhaustion is not an error; see
//! [`crate::core::admission::AddExpenseResult`].

use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying storage failure (I/O, corruption, constraint violation)
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Point lookup or update by id found no row
    #[error("Expense not found: {id}")]
    ExpenseNotFound {
        /// The identifier that was looked up
        id: i64,
    },

    /// Amount was zero, negative, or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Any other rejected input (blank title or category)
    #[error("Validation error: {message}")]
    Validation {
        /// Why the input was rejected
        message: String,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

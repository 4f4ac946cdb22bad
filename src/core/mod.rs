//! Core logic - storage, live queries, monthly aggregation, and entry admission.

/// Add-expense use case and the tier-based daily quota
pub mod admission;
/// Day and month boundaries, month keys and display formatting
pub mod calendar;
/// The expense store: point operations, range totals, and the single writer
pub mod expense;
/// Live subscriptions to list queries
pub mod live;
/// Monthly overview aggregation
pub mod overview;

pub use admission::{AddExpense, AddExpenseResult, AdmissionPolicy};
pub use expense::{ExpenseStore, NEW_EXPENSE_ID, NewExpense, SUGGESTED_CATEGORIES, StoreWriter};
pub use live::{ExpenseQuery, LiveQuery};
pub use overview::{CategoryTotal, LiveOverview, MonthlyOverview};

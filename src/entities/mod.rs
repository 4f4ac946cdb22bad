//! Entity module - Contains the SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod expense;

pub use expense::{Column as ExpenseColumn, Entity as Expense, Model as ExpenseModel};

//! Expense entity - The single persisted record of the expense logger.
//!
//! Each expense has a title, a positive amount, a free-text category, an optional
//! description, and the user-assigned `date` the money was spent. `created_at` and
//! `updated_at` are bookkeeping timestamps and are independent of `date`.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    /// Unique identifier, assigned by the store (`0` means "not yet stored")
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Short human-readable title (e.g., "Lunch with team")
    pub title: String,
    /// Amount spent, always positive
    pub amount: f64,
    /// Category name, usually one of [`crate::core::expense::SUGGESTED_CATEGORIES`]
    pub category: String,
    /// Optional free-form notes
    pub description: Option<String>,
    /// When the expense happened
    pub date: DateTimeUtc,
    /// When the row was first written
    pub created_at: DateTimeUtc,
    /// When the row was last written
    pub updated_at: DateTimeUtc,
}

/// `Expense` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

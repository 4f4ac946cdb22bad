//! Live queries over the expense table.
//!
//! A [`LiveQuery`] holds the latest result of an [`ExpenseQuery`] and re-runs the
//! query whenever the store commits a write. It only yields when the result
//! actually changed. A failed re-query ends the subscription; it never yields a
//! partial result.

use crate::{
    entities::{Expense, expense},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, QueryOrder, prelude::*};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, trace};

/// The shape of a list query against the store. All variants order by `date`
/// descending (newest first), then by id descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseQuery {
    /// Every expense
    All,
    /// Expenses whose `date` lies in `[start, end]`
    DateRange {
        /// Inclusive lower bound
        start: DateTime<Utc>,
        /// Inclusive upper bound
        end: DateTime<Utc>,
    },
    /// Expenses whose category matches exactly
    Category(String),
}

impl ExpenseQuery {
    pub(crate) async fn fetch<C>(&self, db: &C) -> Result<Vec<expense::Model>>
    where
        C: ConnectionTrait,
    {
        let select = match self {
            Self::All => Expense::find(),
            Self::DateRange { start, end } => {
                Expense::find().filter(expense::Column::Date.between(*start, *end))
            }
            Self::Category(category) => {
                Expense::find().filter(expense::Column::Category.eq(category.as_str()))
            }
        };

        select
            .order_by_desc(expense::Column::Date)
            .order_by_desc(expense::Column::Id)
            .all(db)
            .await
            .map_err(Into::into)
    }
}

/// A subscription to the result of an [`ExpenseQuery`].
///
/// Dropping the subscription (or calling [`LiveQuery::cancel`]) releases it.
#[derive(Debug)]
pub struct LiveQuery {
    query: ExpenseQuery,
    db: Arc<DatabaseConnection>,
    changes: watch::Receiver<u64>,
    current: Vec<expense::Model>,
    terminated: bool,
}

impl LiveQuery {
    /// Marks the current revision as seen, then loads the initial snapshot, so
    /// any write committed after this call wakes [`LiveQuery::next`].
    pub(crate) async fn start(
        query: ExpenseQuery,
        db: Arc<DatabaseConnection>,
        mut changes: watch::Receiver<u64>,
    ) -> Result<Self> {
        changes.mark_unchanged();
        let current = query.fetch(db.as_ref()).await?;
        debug!(?query, rows = current.len(), "Live query started");
        Ok(Self {
            query,
            db,
            changes,
            current,
            terminated: false,
        })
    }

    /// The query this subscription follows
    #[must_use]
    pub const fn query(&self) -> &ExpenseQuery {
        &self.query
    }

    /// The most recent result (the initial snapshot until something changes)
    #[must_use]
    pub fn snapshot(&self) -> &[expense::Model] {
        &self.current
    }

    /// Whether the subscription has ended because of a store failure or store shutdown
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Waits for the next committed write that changes this query's result and
    /// returns the new result.
    ///
    /// Returns `None` once the store has been dropped or a re-query failed; after
    /// that every call returns `None`.
    pub async fn next(&mut self) -> Option<Vec<expense::Model>> {
        while !self.terminated {
            if self.changes.changed().await.is_err() {
                debug!(query = ?self.query, "Store closed, ending live query");
                self.terminated = true;
                break;
            }

            match self.query.fetch(self.db.as_ref()).await {
                Ok(rows) if rows == self.current => {
                    trace!(query = ?self.query, "Write did not affect live query");
                }
                Ok(rows) => {
                    self.current.clone_from(&rows);
                    return Some(rows);
                }
                Err(e) => {
                    error!(query = ?self.query, "Live query failed, ending subscription: {e}");
                    self.terminated = true;
                }
            }
        }
        None
    }

    /// Ends the subscription. No further notifications are delivered.
    pub fn cancel(self) {
        debug!(query = ?self.query, "Live query cancelled");
    }
}

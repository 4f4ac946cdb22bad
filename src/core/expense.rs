//! Expense store - Durable storage and retrieval of expense records.
//!
//! [`ExpenseStore`] wraps a `SeaORM` connection and is the only component that
//! writes the `expenses` table. Writes are serialized through a single writer
//! lock ([`StoreWriter`]); reads never take it. After every committed write the
//! store bumps a revision on a `watch` channel, which wakes every
//! [`LiveQuery`] so it can re-run its query.
//!
//! Input validation (finite positive amount, non-blank title and category) is
//! enforced here, on insert and update, rather than left to callers.

use crate::{
    core::live::{ExpenseQuery, LiveQuery},
    entities::{Expense, expense},
    errors::{Error, Result},
};
use chrono::{DateTime, SubsecRound, Utc};
use sea_orm::{
    ActiveValue::NotSet, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info, instrument, warn};

/// Id a caller passes to [`ExpenseStore::insert`] to ask for a freshly assigned id.
pub const NEW_EXPENSE_ID: i64 = 0;

/// Categories offered when recording an expense. Storage accepts any non-blank text.
pub const SUGGESTED_CATEGORIES: [&str; 9] = [
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Entertainment",
    "Bills & Utilities",
    "Healthcare",
    "Travel",
    "Education",
    "Other",
];

/// Caller-facing input for a new expense.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// Short title
    pub title: String,
    /// Amount spent, must be positive
    pub amount: f64,
    /// Category name
    pub category: String,
    /// Optional notes
    pub description: Option<String>,
    /// When the expense happened
    pub date: DateTime<Utc>,
}

impl NewExpense {
    /// Creates an expense without a description.
    pub fn new(
        title: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            amount,
            category: category.into(),
            description: None,
            date,
        }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builds an unsaved record (id [`NEW_EXPENSE_ID`]) stamped with `now` as
    /// both bookkeeping timestamps.
    #[must_use]
    pub fn into_record(self, now: DateTime<Utc>) -> expense::Model {
        expense::Model {
            id: NEW_EXPENSE_ID,
            title: self.title,
            amount: self.amount,
            category: self.category,
            description: self.description,
            date: self.date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Rejects records that must never be stored.
///
/// # Errors
/// - `Error::InvalidAmount` if the amount is zero, negative, NaN, or infinite
/// - `Error::Validation` if the title or category is blank
pub fn validate_expense(record: &expense::Model) -> Result<()> {
    if !record.amount.is_finite() || record.amount <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: record.amount,
        });
    }

    if record.title.trim().is_empty() {
        return Err(Error::Validation {
            message: "Expense title cannot be empty".to_string(),
        });
    }

    if record.category.trim().is_empty() {
        return Err(Error::Validation {
            message: "Expense category cannot be empty".to_string(),
        });
    }

    Ok(())
}

#[derive(Debug)]
struct StoreInner {
    db: Arc<DatabaseConnection>,
    writer: Mutex<()>,
    revision: watch::Sender<u64>,
}

/// Handle to the expense table. Cloning is cheap; clones share the connection,
/// the writer lock, and the change notifications.
#[derive(Debug, Clone)]
pub struct ExpenseStore {
    inner: Arc<StoreInner>,
}

impl ExpenseStore {
    /// Creates a store over an open connection. Tables must already exist, see
    /// [`crate::config::database::create_tables`].
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                db: Arc::new(db),
                writer: Mutex::new(()),
                revision,
            }),
        }
    }

    /// The underlying connection
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.inner.db
    }

    /// Number of live queries currently subscribed
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.revision.receiver_count()
    }

    /// Wakes every live query after a committed write.
    pub(crate) fn notify(&self) {
        self.inner.revision.send_modify(|revision| *revision += 1);
    }

    /// Acquires the single writer. Held across a read-then-write sequence, it keeps
    /// other writers out until it is dropped.
    pub async fn writer(&self) -> StoreWriter<'_> {
        StoreWriter {
            store: self,
            _guard: self.inner.writer.lock().await,
            dirty: false,
        }
    }

    /// Subscribes to an arbitrary query.
    pub async fn subscribe(&self, query: ExpenseQuery) -> Result<LiveQuery> {
        LiveQuery::start(
            query,
            Arc::clone(&self.inner.db),
            self.inner.revision.subscribe(),
        )
        .await
    }

    /// Live list of all expenses, newest first.
    pub async fn get_all(&self) -> Result<LiveQuery> {
        self.subscribe(ExpenseQuery::All).await
    }

    /// Live list of expenses dated within `[start, end]`, newest first.
    pub async fn get_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<LiveQuery> {
        self.subscribe(ExpenseQuery::DateRange { start, end }).await
    }

    /// Live list of expenses in exactly this category, newest first.
    pub async fn get_by_category(&self, category: &str) -> Result<LiveQuery> {
        self.subscribe(ExpenseQuery::Category(category.to_string()))
            .await
    }

    /// One-shot result of a query.
    pub async fn list(&self, query: &ExpenseQuery) -> Result<Vec<expense::Model>> {
        query.fetch(self.connection()).await
    }

    /// Finds an expense by id.
    ///
    /// # Errors
    /// `Error::ExpenseNotFound` if no row has this id.
    pub async fn get_by_id(&self, id: i64) -> Result<expense::Model> {
        self.find_by_id(id)
            .await?
            .ok_or(Error::ExpenseNotFound { id })
    }

    /// Finds an expense by id, `None` if it does not exist.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<expense::Model>> {
        Expense::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(Into::into)
    }

    /// Sum of amounts dated within `[start, end]`; `0.0` when nothing matches.
    pub async fn get_total_amount(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<f64> {
        total_amount(self.connection(), start, end).await
    }

    /// Number of expenses dated within `[start, end]`.
    pub async fn get_count(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<u64> {
        count(self.connection(), start, end).await
    }

    /// Stores a record and returns its id. See [`StoreWriter::insert`].
    pub async fn insert(&self, record: expense::Model) -> Result<i64> {
        self.writer().await.insert(record).await
    }

    /// Replaces a stored record. See [`StoreWriter::update`].
    pub async fn update(&self, record: expense::Model) -> Result<expense::Model> {
        self.writer().await.update(record).await
    }

    /// Removes the row with the record's id; no-op if it is already gone.
    pub async fn delete(&self, record: &expense::Model) -> Result<()> {
        self.writer().await.delete_by_id(record.id).await
    }

    /// Removes the row with this id; no-op if absent.
    pub async fn delete_by_id(&self, id: i64) -> Result<()> {
        self.writer().await.delete_by_id(id).await
    }

    /// Removes every expense and returns how many rows were deleted.
    pub async fn delete_all(&self) -> Result<u64> {
        self.writer().await.delete_all().await
    }
}

/// Exclusive write access to the store. Live queries are notified once, when
/// the writer is dropped, if anything was committed.
#[derive(Debug)]
pub struct StoreWriter<'a> {
    store: &'a ExpenseStore,
    _guard: MutexGuard<'a, ()>,
    dirty: bool,
}

impl StoreWriter<'_> {
    fn db(&self) -> &DatabaseConnection {
        &self.store.inner.db
    }

    /// Same as [`ExpenseStore::get_count`], read while holding the writer.
    pub async fn get_count(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<u64> {
        count(self.db(), start, end).await
    }

    /// Stores a record and returns its id.
    ///
    /// With id [`NEW_EXPENSE_ID`] the store assigns a fresh id. Any other id is an
    /// upsert: an existing row with that id is replaced in full, otherwise the
    /// row is inserted under that id. The record's fields, bookkeeping timestamps
    /// included, are stored as given, with timestamps truncated to whole milliseconds.
    ///
    /// # Errors
    /// Validation errors (see [`validate_expense`]) or `Error::Database`.
    #[instrument(skip(self, record), fields(id = record.id))]
    pub async fn insert(&mut self, record: expense::Model) -> Result<i64> {
        validate_expense(&record)?;

        let requested_id = record.id;
        let mut active = expense::ActiveModel {
            id: NotSet,
            title: Set(record.title),
            amount: Set(record.amount),
            category: Set(record.category),
            description: Set(record.description),
            date: Set(to_millis(record.date)),
            created_at: Set(to_millis(record.created_at)),
            updated_at: Set(to_millis(record.updated_at)),
        };

        let id = if requested_id == NEW_EXPENSE_ID {
            active.insert(self.db()).await?.id
        } else {
            active.id = Set(requested_id);
            let txn = self.db().begin().await?;
            let replaced = Expense::delete_by_id(requested_id).exec(&txn).await?;
            let inserted = active.insert(&txn).await?;
            txn.commit().await?;
            if replaced.rows_affected > 0 {
                debug!(id = requested_id, "Replaced existing expense");
            }
            inserted.id
        };

        self.dirty = true;
        info!(id, "Expense stored");
        Ok(id)
    }

    /// Replaces the stored record with the same id and refreshes `updated_at`.
    ///
    /// # Errors
    /// - `Error::ExpenseNotFound` if no row has this id
    /// - Validation errors (see [`validate_expense`]) or `Error::Database`
    #[instrument(skip(self, record), fields(id = record.id))]
    pub async fn update(&mut self, record: expense::Model) -> Result<expense::Model> {
        validate_expense(&record)?;
        let id = record.id;

        let active = expense::ActiveModel {
            id: Set(id),
            title: Set(record.title),
            amount: Set(record.amount),
            category: Set(record.category),
            description: Set(record.description),
            date: Set(to_millis(record.date)),
            created_at: Set(to_millis(record.created_at)),
            updated_at: Set(to_millis(Utc::now())),
        };

        match active.update(self.db()).await {
            Ok(updated) => {
                self.dirty = true;
                info!(id, "Expense updated");
                Ok(updated)
            }
            Err(DbErr::RecordNotUpdated) => {
                warn!(id, "Update of missing expense");
                Err(Error::ExpenseNotFound { id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the row with this id; no-op if absent.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&mut self, id: i64) -> Result<()> {
        let result = Expense::delete_by_id(id).exec(self.db()).await?;
        if result.rows_affected > 0 {
            self.dirty = true;
            info!(id, "Expense deleted");
        } else {
            debug!(id, "Delete of missing expense ignored");
        }
        Ok(())
    }

    /// Removes every expense and returns how many rows were deleted.
    #[instrument(skip(self))]
    pub async fn delete_all(&mut self) -> Result<u64> {
        let result = Expense::delete_many().exec(self.db()).await?;
        if result.rows_affected > 0 {
            self.dirty = true;
        }
        info!(rows = result.rows_affected, "All expenses deleted");
        Ok(result.rows_affected)
    }
}

impl Drop for StoreWriter<'_> {
    fn drop(&mut self) {
        if self.dirty {
            self.store.notify();
        }
    }
}

/// Timestamps are kept at millisecond precision, the resolution of the day and
/// month bounds.
fn to_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(3)
}

async fn total_amount<C>(db: &C, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<f64>
where
    C: ConnectionTrait,
{
    let total: Option<Option<f64>> = Expense::find()
        .select_only()
        .column_as(Expr::col(expense::Column::Amount).sum(), "total")
        .filter(expense::Column::Date.between(start, end))
        .into_tuple()
        .one(db)
        .await?;

    Ok(total.flatten().unwrap_or(0.0))
}

async fn count<C>(db: &C, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<u64>
where
    C: ConnectionTrait,
{
    Expense::find()
        .filter(expense::Column::Date.between(start, end))
        .count(db)
        .await
        .map_err(Into::into)
}

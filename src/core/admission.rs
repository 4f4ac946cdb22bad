//! Entry admission - Daily quota for new expenses, tied to the product tier.
//!
//! [`AdmissionPolicy`] answers whether one more expense may be added given how
//! many were recorded today. [`AddExpense`] is the add-expense use case: it runs
//! the check and the insert while holding the store's single writer, so two
//! concurrent adds cannot both slip under the limit.

use crate::{
    config::tier::TierConfig,
    core::{
        calendar::day_bounds,
        expense::{ExpenseStore, NewExpense},
    },
    errors::Result,
};
use chrono::{DateTime, Local, TimeZone, Utc};
use tracing::{error, info, warn};

/// Decides whether a new expense is admitted under the configured tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    tier: TierConfig,
}

impl AdmissionPolicy {
    /// Creates a policy for a tier loaded at startup.
    #[must_use]
    pub const fn new(tier: TierConfig) -> Self {
        Self { tier }
    }

    /// The tier this policy enforces
    #[must_use]
    pub const fn tier(&self) -> TierConfig {
        self.tier
    }

    /// Paid tiers always admit; free tiers admit while `current_daily_count` is
    /// below `max_daily_entries`.
    #[must_use]
    pub fn admit(&self, current_daily_count: u64) -> bool {
        self.tier.is_paid_version || current_daily_count < u64::from(self.tier.max_daily_entries)
    }

    /// Entries still allowed today, `None` for paid tiers.
    #[must_use]
    pub fn remaining(&self, current_daily_count: u64) -> Option<u64> {
        (!self.tier.is_paid_version)
            .then(|| u64::from(self.tier.max_daily_entries).saturating_sub(current_daily_count))
    }
}

/// Outcome of an add-expense request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddExpenseResult {
    /// Stored under this id
    Success(i64),
    /// Today's quota is used up; nothing was written
    QuotaExceeded,
    /// Validation or storage failed; nothing was written
    Failure(String),
}

/// The add-expense use case.
#[derive(Debug, Clone)]
pub struct AddExpense {
    store: ExpenseStore,
    policy: AdmissionPolicy,
}

impl AddExpense {
    /// Creates the use case over a store and a policy.
    #[must_use]
    pub const fn new(store: ExpenseStore, policy: AdmissionPolicy) -> Self {
        Self { store, policy }
    }

    /// Adds an expense if today's quota allows it, "today" being the local calendar day.
    pub async fn execute(&self, expense: NewExpense) -> AddExpenseResult {
        self.execute_at(expense, &Local::now()).await
    }

    /// Adds an expense if the quota of the calendar day containing `now` allows it.
    /// `now` also stamps the record's bookkeeping timestamps.
    pub async fn execute_at<Tz: TimeZone>(
        &self,
        expense: NewExpense,
        now: &DateTime<Tz>,
    ) -> AddExpenseResult {
        match self.try_add(expense, now).await {
            Ok(Some(id)) => AddExpenseResult::Success(id),
            Ok(None) => {
                warn!(
                    max_daily_entries = self.policy.tier.max_daily_entries,
                    "Daily expense limit reached"
                );
                AddExpenseResult::QuotaExceeded
            }
            Err(e) => {
                error!("Failed to add expense: {e}");
                AddExpenseResult::Failure(e.to_string())
            }
        }
    }

    async fn try_add<Tz: TimeZone>(
        &self,
        expense: NewExpense,
        now: &DateTime<Tz>,
    ) -> Result<Option<i64>> {
        let mut writer = self.store.writer().await;

        if !self.policy.tier.is_paid_version {
            let (start, end) = day_bounds(now);
            let today = writer.get_count(start, end).await?;
            if !self.policy.admit(today) {
                return Ok(None);
            }
            info!(today, remaining = ?self.policy.remaining(today + 1), "Expense admitted");
        }

        let record = expense.into_record(now.with_timezone(&Utc));
        writer.insert(record).await.map(Some)
    }
}

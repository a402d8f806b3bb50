//! Storage contracts the engine depends on.
//!
//! The engine only ever holds these as `Arc<dyn ...>`: [`sql`] provides the
//! sea-orm implementations, tests wrap them to inject failures.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Budget, ReportSummary, ResultEngine, Transaction};

pub mod sql;

#[async_trait]
pub trait BudgetRepository: Send + Sync {
    /// Creates the budget or replaces the one stored for the same user and
    /// category, atomically. Returns the stored row.
    async fn upsert(&self, budget: &Budget) -> ResultEngine<Budget>;

    async fn get_by_category(&self, user_id: Uuid, category: &str)
    -> ResultEngine<Option<Budget>>;

    async fn list(&self, user_id: Uuid) -> ResultEngine<Vec<Budget>>;
}

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn add(&self, transaction: &Transaction) -> ResultEngine<()>;

    async fn list(&self, user_id: Uuid) -> ResultEngine<Vec<Transaction>>;

    /// All-time spend of a category. Zero when there is none.
    async fn sum_by_category(&self, user_id: Uuid, category: &str) -> ResultEngine<Decimal>;

    /// Spend of a category with `from <= date < to`.
    async fn sum_by_category_and_period(
        &self,
        user_id: Uuid,
        category: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Decimal>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Spend per category with `from <= date < to`, budgeted or not.
    /// Categories without spend are absent.
    async fn category_totals(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Vec<ReportSummary>>;
}

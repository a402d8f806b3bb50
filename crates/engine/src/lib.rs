//! Budget-aware ledger engine.
//!
//! [`Engine`] admits expense transactions against per-category budgets,
//! imports batches with bounded parallelism and computes per-category
//! spending reports behind a cache-aside layer. Every operation takes a
//! [`RequestContext`] carrying the caller's identity, deadline and
//! cancellation signal.

pub use budgets::{Budget, NewBudget};
pub use context::RequestContext;
pub use error::EngineError;
pub use expenses::{NewTransaction, Transaction};
pub use ops::{Engine, EngineBuilder};
pub use period::{BudgetPeriod, PeriodWindow};
pub use report::{BulkImportResult, BulkItemError, CategoryFailure, ReportOutcome, ReportSummary};
pub use repository::{BudgetRepository, ExpenseRepository, ReportRepository};

pub mod cache;
pub mod money;
pub mod period;
pub mod repository;

mod budgets;
mod context;
mod error;
mod expenses;
mod ops;
mod report;

pub type ResultEngine<T> = Result<T, EngineError>;

//! The module contains the errors the engine can throw.
//!
//! Errors fall in three classes:
//!
//! - client errors ([`Validation`], [`BudgetNotFound`], [`BudgetExceeded`],
//!   [`InvalidPeriod`], [`InvalidDate`], [`Unauthenticated`]) returned to the
//!   caller unchanged and never worth retrying;
//! - internal errors ([`Internal`], [`Database`]) the caller may retry;
//! - context errors ([`DeadlineExceeded`], [`Canceled`]) raised when the
//!   request context fires before the work completes.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`BudgetNotFound`]: EngineError::BudgetNotFound
//!  [`BudgetExceeded`]: EngineError::BudgetExceeded
//!  [`InvalidPeriod`]: EngineError::InvalidPeriod
//!  [`InvalidDate`]: EngineError::InvalidDate
//!  [`Unauthenticated`]: EngineError::Unauthenticated
//!  [`Internal`]: EngineError::Internal
//!  [`Database`]: EngineError::Database
//!  [`DeadlineExceeded`]: EngineError::DeadlineExceeded
//!  [`Canceled`]: EngineError::Canceled
use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

use crate::BulkImportResult;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },
    #[error("budget not found for category \"{0}\"")]
    BudgetNotFound(String),
    #[error(
        "budget exceeded for category {category}: limit={limit:.2} current={current:.2} amount={amount:.2}"
    )]
    BudgetExceeded {
        category: String,
        limit: Decimal,
        current: Decimal,
        amount: Decimal,
    },
    #[error("unknown budget period: \"{0}\"")]
    InvalidPeriod(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("internal error: {0}")]
    Internal(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("request canceled")]
    Canceled,
    #[error(
        "bulk import interrupted after {} of {} items: {cause}",
        .partial.processed(),
        .partial.total()
    )]
    BulkIncomplete {
        partial: Box<BulkImportResult>,
        cause: Box<EngineError>,
    },
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    pub(crate) fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Storage and cache transport failures. The engine never retries them
    /// itself; callers may.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Internal(_) | Self::Database(_))
    }

    /// Errors raised because the request context fired.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::DeadlineExceeded | Self::Canceled)
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Validation {
                    field: fa,
                    message: ma,
                },
                Self::Validation {
                    field: fb,
                    message: mb,
                },
            ) => fa == fb && ma == mb,
            (Self::BudgetNotFound(a), Self::BudgetNotFound(b)) => a == b,
            (
                Self::BudgetExceeded {
                    category: ca,
                    limit: la,
                    current: cua,
                    amount: aa,
                },
                Self::BudgetExceeded {
                    category: cb,
                    limit: lb,
                    current: cub,
                    amount: ab,
                },
            ) => ca == cb && la == lb && cua == cub && aa == ab,
            (Self::InvalidPeriod(a), Self::InvalidPeriod(b)) => a == b,
            (Self::InvalidDate(a), Self::InvalidDate(b)) => a == b,
            (Self::Unauthenticated, Self::Unauthenticated) => true,
            (Self::Internal(a), Self::Internal(b)) => a == b,
            (Self::DeadlineExceeded, Self::DeadlineExceeded) => true,
            (Self::Canceled, Self::Canceled) => true,
            (
                Self::BulkIncomplete {
                    partial: pa,
                    cause: ca,
                },
                Self::BulkIncomplete {
                    partial: pb,
                    cause: cb,
                },
            ) => pa == pb && ca == cb,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn budget_exceeded_message_uses_two_decimals() {
        let err = EngineError::BudgetExceeded {
            category: "food".to_string(),
            limit: dec!(100),
            current: dec!(80),
            amount: dec!(30.5),
        };
        assert_eq!(
            err.to_string(),
            "budget exceeded for category food: limit=100.00 current=80.00 amount=30.50"
        );
    }

    #[test]
    fn only_transport_failures_are_retriable() {
        assert!(EngineError::Internal("boom".to_string()).is_retriable());
        assert!(EngineError::Database(DbErr::Custom("boom".to_string())).is_retriable());
        assert!(!EngineError::BudgetNotFound("food".to_string()).is_retriable());
        assert!(!EngineError::validation("amount", "must be positive").is_retriable());
        assert!(!EngineError::DeadlineExceeded.is_retriable());
    }
}

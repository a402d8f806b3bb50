//! Report and bulk import value objects. None of these are persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spend of one category over a report window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub category: String,
    pub total: Decimal,
}

/// A category whose total could not be computed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFailure {
    pub category: String,
    pub error: String,
}

/// Result of a report computation.
///
/// `totals` order is unspecified. An outcome with failures is never cached.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub totals: Vec<ReportSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<CategoryFailure>,
}

impl ReportOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_for(&self, category: &str) -> Option<Decimal> {
        self.totals
            .iter()
            .find(|summary| summary.category == category)
            .map(|summary| summary.total)
    }
}

/// One rejected item of a bulk import. `index` is the position of the item
/// in the submitted list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemError {
    pub index: usize,
    pub error: String,
}

/// Aggregate of a bulk import.
///
/// `accepted + rejected + not_attempted` always equals the number of
/// submitted items; `not_attempted` is zero unless the request context fired.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkImportResult {
    pub accepted: u64,
    pub rejected: u64,
    pub not_attempted: u64,
    pub errors: Vec<BulkItemError>,
}

impl BulkImportResult {
    pub fn processed(&self) -> u64 {
        self.accepted + self.rejected
    }

    pub fn total(&self) -> u64 {
        self.processed() + self.not_attempted
    }
}

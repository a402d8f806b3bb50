//! Request and response bodies of the HTTP API.
//!
//! Amounts are accepted as JSON numbers or strings and always returned as
//! strings with two fractional digits, so that no precision is lost on the
//! way out. Dates travel as `YYYY-MM-DD` strings and are parsed by the
//! server, which reports malformed ones as invalid dates.

pub mod transaction {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub amount: Decimal,
        pub category: String,
        #[serde(default)]
        pub description: String,
        /// `YYYY-MM-DD`.
        pub date: Option<String>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Transaction {
        pub id: Uuid,
        pub amount: Decimal,
        pub category: String,
        pub description: String,
        pub date: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct BulkNew {
        pub transactions: Vec<TransactionNew>,
        /// Parallel workers; the server picks a default when absent.
        pub workers: Option<usize>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BulkError {
        pub index: usize,
        pub error: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BulkResult {
        pub accepted: u64,
        pub rejected: u64,
        #[serde(default)]
        pub not_attempted: u64,
        pub errors: Vec<BulkError>,
        /// Set when the import stopped before every item was processed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub incomplete: Option<String>,
    }
}

pub mod budget {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        pub category: String,
        pub limit: Decimal,
        /// `daily`, `weekly`, `monthly`, or empty for no reset.
        #[serde(default)]
        pub period: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Budget {
        pub category: String,
        pub limit: Decimal,
        pub period: String,
    }
}

pub mod report {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;
    use serde::{Deserialize, Serialize};

    /// Query of both report routes. Bounds are `YYYY-MM-DD`, `to` exclusive.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ReportRange {
        pub from: String,
        pub to: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryFailure {
        pub category: String,
        pub error: String,
    }

    /// Category to total.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ReportSummary {
        pub totals: BTreeMap<String, Decimal>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub failures: Vec<CategoryFailure>,
    }
}

/// Error body of every non-2xx response.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

//! Budget periods and the calendar windows they cover.
//!
//! A budget limit applies to the spend inside one [`PeriodWindow`], computed
//! from the budget's [`BudgetPeriod`] and the date of the transaction being
//! admitted. Windows are half-open: `from` is included, `to` is not.
//!
//! All boundaries are plain calendar dates; no timezone normalization happens.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// How often a budget limit resets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    /// No reset: spend is summed over all time.
    #[default]
    Unbounded,
    Daily,
    /// Monday to Sunday.
    Weekly,
    Monthly,
}

impl BudgetPeriod {
    /// The canonical string stored in the database. Unbounded is the empty
    /// string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unbounded => "",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Returns the window containing `reference`, or `None` for unbounded
    /// budgets.
    pub fn window(self, reference: NaiveDate) -> Option<PeriodWindow> {
        let (from, to) = match self {
            Self::Unbounded => return None,
            Self::Daily => (reference, reference.checked_add_days(Days::new(1))?),
            Self::Weekly => {
                let offset = u64::from(reference.weekday().num_days_from_monday());
                let monday = reference.checked_sub_days(Days::new(offset))?;
                (monday, monday.checked_add_days(Days::new(7))?)
            }
            Self::Monthly => {
                let first = reference.with_day(1)?;
                (first, first.checked_add_months(Months::new(1))?)
            }
        };
        Some(PeriodWindow { from, to })
    }
}

impl FromStr for BudgetPeriod {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" => Ok(Self::Unbounded),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(EngineError::InvalidPeriod(other.to_string())),
        }
    }
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open calendar interval `[from, to)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl PeriodWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date < self.to
    }
}

/// Resolves a raw period unit against a reference date.
///
/// `Ok(None)` means the budget is unbounded.
pub fn resolve(period: &str, reference: NaiveDate) -> ResultEngine<Option<PeriodWindow>> {
    let period: BudgetPeriod = period.parse()?;
    Ok(period.window(reference))
}

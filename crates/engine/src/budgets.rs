//! Budgets: one spending limit per user and category.

use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    BudgetPeriod, EngineError, ResultEngine,
    money::{from_minor, to_minor},
};

/// A stored budget.
///
/// `(user_id, category)` is unique: setting a budget for an existing
/// category replaces it in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub limit: Decimal,
    pub period: BudgetPeriod,
}

/// Input for [`Engine::set_budget`](crate::Engine::set_budget).
///
/// `period` is the raw unit (`""`, `daily`, `weekly`, `monthly`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewBudget {
    pub category: String,
    pub limit: Decimal,
    pub period: String,
}

impl NewBudget {
    pub fn new(category: impl Into<String>, limit: Decimal, period: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            limit,
            period: period.into(),
        }
    }

    /// Validates the input and builds the budget owned by `user_id`.
    pub(crate) fn into_budget(self, user_id: Uuid) -> ResultEngine<Budget> {
        let category = self.category.trim();
        if category.is_empty() {
            return Err(EngineError::validation("category", "must not be empty"));
        }
        to_minor(self.limit, "limit")?;
        let period: BudgetPeriod = self.period.parse().map_err(|_| {
            EngineError::validation("period", "can be either daily, weekly or monthly")
        })?;

        Ok(Budget {
            id: Uuid::new_v4(),
            user_id,
            category: category.to_string(),
            limit: self.limit,
            period,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub limit_minor: i64,
    pub period: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&Budget> for ActiveModel {
    type Error = EngineError;

    fn try_from(budget: &Budget) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(budget.id),
            user_id: ActiveValue::Set(budget.user_id),
            category: ActiveValue::Set(budget.category.clone()),
            limit_minor: ActiveValue::Set(to_minor(budget.limit, "limit")?),
            period: ActiveValue::Set(budget.period.as_str().to_string()),
        })
    }
}

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            category: model.category,
            limit: from_minor(model.limit_minor),
            period: model.period.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn validate(category: &str, limit: Decimal, period: &str) -> ResultEngine<Budget> {
        NewBudget::new(category, limit, period).into_budget(Uuid::new_v4())
    }

    #[test]
    fn valid_budgets() {
        let budget = validate("food", dec!(100), "monthly").unwrap();
        assert_eq!(budget.period, BudgetPeriod::Monthly);
        let budget = validate(" food ", dec!(100), "").unwrap();
        assert_eq!(budget.category, "food");
        assert_eq!(budget.period, BudgetPeriod::Unbounded);
    }

    #[test]
    fn empty_category() {
        assert_eq!(
            validate("  ", dec!(100), "monthly"),
            Err(EngineError::validation("category", "must not be empty"))
        );
    }

    #[test]
    fn non_positive_limit() {
        for limit in [Decimal::ZERO, dec!(-10)] {
            assert_eq!(
                validate("food", limit, "monthly"),
                Err(EngineError::validation("limit", "must be positive"))
            );
        }
    }

    #[test]
    fn invalid_period() {
        assert_eq!(
            validate("food", dec!(100), "yearly"),
            Err(EngineError::validation(
                "period",
                "can be either daily, weekly or monthly"
            ))
        );
    }

    #[test]
    fn corrupt_stored_period_is_invalid_period() {
        let model = Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category: "food".to_string(),
            limit_minor: 10_000,
            period: "fortnightly".to_string(),
        };
        assert_eq!(
            Budget::try_from(model),
            Err(EngineError::InvalidPeriod("fortnightly".to_string()))
        );
    }
}

//! Expense transactions.
//!
//! A `Transaction` is immutable once persisted: the engine only ever inserts
//! them, after admission against the category budget.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    money::{from_minor, to_minor},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
}

/// Input for admission. `date` is optional so that a missing date surfaces as
/// a validation error rather than a parse failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub date: Option<NaiveDate>,
}

impl NewTransaction {
    pub fn new(
        amount: Decimal,
        category: impl Into<String>,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            amount,
            category: category.into(),
            description: description.into(),
            date: Some(date),
        }
    }

    /// Validates the input and assigns a fresh identity.
    pub(crate) fn into_transaction(self, user_id: Uuid) -> ResultEngine<Transaction> {
        to_minor(self.amount, "amount")?;
        let category = self.category.trim();
        if category.is_empty() {
            return Err(EngineError::validation("category", "must not be empty"));
        }
        let date = self
            .date
            .ok_or_else(|| EngineError::validation("date", "must not be empty"))?;

        Ok(Transaction {
            id: Uuid::new_v4(),
            user_id,
            amount: self.amount,
            category: category.to_string(),
            description: self.description,
            date,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_minor: i64,
    pub category: String,
    pub description: String,
    pub spent_on: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&Transaction> for ActiveModel {
    type Error = EngineError;

    fn try_from(tx: &Transaction) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(tx.id),
            user_id: ActiveValue::Set(tx.user_id),
            amount_minor: ActiveValue::Set(to_minor(tx.amount, "amount")?),
            category: ActiveValue::Set(tx.category.clone()),
            description: ActiveValue::Set(tx.description.clone()),
            spent_on: ActiveValue::Set(tx.date),
        })
    }
}

impl From<Model> for Transaction {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            amount: from_minor(model.amount_minor),
            category: model.category,
            description: model.description,
            date: model.spent_on,
        }
    }
}

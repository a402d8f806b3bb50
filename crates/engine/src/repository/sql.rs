//! sea-orm implementations of the repository contracts.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::OnConflict,
};
use uuid::Uuid;

use super::{BudgetRepository, ExpenseRepository, ReportRepository};
use crate::{
    Budget, EngineError, ReportSummary, ResultEngine, Transaction, budgets, expenses,
    money::from_minor,
};

#[derive(Clone, Debug)]
pub struct SqlBudgets {
    database: DatabaseConnection,
}

impl SqlBudgets {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

#[async_trait]
impl BudgetRepository for SqlBudgets {
    async fn upsert(&self, budget: &Budget) -> ResultEngine<Budget> {
        let model = budgets::ActiveModel::try_from(budget)?;
        budgets::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([budgets::Column::UserId, budgets::Column::Category])
                    .update_columns([budgets::Column::LimitMinor, budgets::Column::Period])
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;

        self.get_by_category(budget.user_id, &budget.category)
            .await?
            .ok_or_else(|| {
                EngineError::Internal(format!("budget {} vanished after upsert", budget.category))
            })
    }

    async fn get_by_category(
        &self,
        user_id: Uuid,
        category: &str,
    ) -> ResultEngine<Option<Budget>> {
        budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::Category.eq(category))
            .one(&self.database)
            .await?
            .map(Budget::try_from)
            .transpose()
    }

    async fn list(&self, user_id: Uuid) -> ResultEngine<Vec<Budget>> {
        budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .order_by_asc(budgets::Column::Category)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Budget::try_from)
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct SqlExpenses {
    database: DatabaseConnection,
}

impl SqlExpenses {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

#[async_trait]
impl ExpenseRepository for SqlExpenses {
    async fn add(&self, transaction: &Transaction) -> ResultEngine<()> {
        let model = expenses::ActiveModel::try_from(transaction)?;
        expenses::Entity::insert(model)
            .exec_without_returning(&self.database)
            .await?;
        Ok(())
    }

    async fn list(&self, user_id: Uuid) -> ResultEngine<Vec<Transaction>> {
        Ok(expenses::Entity::find()
            .filter(expenses::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::from)
            .collect())
    }

    async fn sum_by_category(&self, user_id: Uuid, category: &str) -> ResultEngine<Decimal> {
        let total = expenses::Entity::find()
            .select_only()
            .column_as(expenses::Column::AmountMinor.sum(), "total")
            .filter(expenses::Column::UserId.eq(user_id))
            .filter(expenses::Column::Category.eq(category))
            .into_tuple::<Option<i64>>()
            .one(&self.database)
            .await?;
        Ok(from_minor(total.flatten().unwrap_or_default()))
    }

    async fn sum_by_category_and_period(
        &self,
        user_id: Uuid,
        category: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Decimal> {
        let total = expenses::Entity::find()
            .select_only()
            .column_as(expenses::Column::AmountMinor.sum(), "total")
            .filter(expenses::Column::UserId.eq(user_id))
            .filter(expenses::Column::Category.eq(category))
            .filter(expenses::Column::SpentOn.gte(from))
            .filter(expenses::Column::SpentOn.lt(to))
            .into_tuple::<Option<i64>>()
            .one(&self.database)
            .await?;
        Ok(from_minor(total.flatten().unwrap_or_default()))
    }
}

#[derive(Clone, Debug)]
pub struct SqlReports {
    database: DatabaseConnection,
}

impl SqlReports {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

#[async_trait]
impl ReportRepository for SqlReports {
    async fn category_totals(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Vec<ReportSummary>> {
        let rows = expenses::Entity::find()
            .select_only()
            .column(expenses::Column::Category)
            .column_as(expenses::Column::AmountMinor.sum(), "total")
            .filter(expenses::Column::UserId.eq(user_id))
            .filter(expenses::Column::SpentOn.gte(from))
            .filter(expenses::Column::SpentOn.lt(to))
            .group_by(expenses::Column::Category)
            .order_by_asc(expenses::Column::Category)
            .into_tuple::<(String, Option<i64>)>()
            .all(&self.database)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(category, total)| ReportSummary {
                category,
                total: from_minor(total.unwrap_or_default()),
            })
            .collect())
    }
}

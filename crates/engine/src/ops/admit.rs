use crate::{EngineError, NewTransaction, RequestContext, ResultEngine, Transaction};

use super::Engine;

impl Engine {
    /// Validates and admits a single transaction against its category budget,
    /// then drops the user's cached reports.
    ///
    /// Fails with `BudgetNotFound` when the category has no budget and with
    /// `BudgetExceeded` when the spend already recorded in the budget window
    /// plus `input.amount` would go over the limit. Nothing is written in
    /// either case.
    ///
    /// The request context is honored up to the insert, not during it.
    pub async fn add_transaction(
        &self,
        ctx: &RequestContext,
        input: NewTransaction,
    ) -> ResultEngine<Transaction> {
        let transaction = self.admit(ctx, input).await?;
        self.invalidate_reports(ctx.user_id()).await;
        Ok(transaction)
    }

    /// Admission without cache invalidation.
    pub(super) async fn admit(
        &self,
        ctx: &RequestContext,
        input: NewTransaction,
    ) -> ResultEngine<Transaction> {
        let transaction = input.into_transaction(ctx.user_id())?;
        let user_id = transaction.user_id;
        let category = transaction.category.as_str();

        // Only categories with a budget ever get a lock entry.
        if ctx
            .run(self.budgets.get_by_category(user_id, category))
            .await?
            .is_none()
        {
            return Err(EngineError::BudgetNotFound(category.to_string()));
        }
        let _guard = self.locks.acquire(ctx, user_id, category).await?;

        // Re-read under the lock: the limit may have changed meanwhile.
        let budget = ctx
            .run(self.budgets.get_by_category(user_id, category))
            .await?
            .ok_or_else(|| EngineError::BudgetNotFound(category.to_string()))?;

        let spent = match budget.period.window(transaction.date) {
            Some(window) => {
                ctx.run(self.expenses.sum_by_category_and_period(
                    user_id,
                    category,
                    window.from,
                    window.to,
                ))
                .await?
            }
            None => {
                ctx.run(self.expenses.sum_by_category(user_id, category))
                    .await?
            }
        };

        if spent + transaction.amount > budget.limit {
            return Err(EngineError::BudgetExceeded {
                category: category.to_string(),
                limit: budget.limit,
                current: spent,
                amount: transaction.amount,
            });
        }

        // Last point where the context may abort. A started insert always
        // runs to completion so a committed row is never reported as failed.
        ctx.check()?;
        self.expenses.add(&transaction).await?;
        tracing::debug!(%user_id, category, amount = %transaction.amount, "transaction admitted");
        Ok(transaction)
    }
}

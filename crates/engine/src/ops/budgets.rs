use crate::{Budget, NewBudget, RequestContext, ResultEngine, cache::budgets_key};

use super::Engine;

impl Engine {
    /// Creates or replaces the budget of `input.category`.
    ///
    /// Drops the cached budget list and every cached report of the user.
    pub async fn set_budget(&self, ctx: &RequestContext, input: NewBudget) -> ResultEngine<Budget> {
        let user_id = ctx.user_id();
        let budget = input.into_budget(user_id)?;
        let stored = ctx.run(self.budgets.upsert(&budget)).await?;

        self.cache.delete(&[budgets_key(user_id)]).await;
        self.invalidate_reports(user_id).await;
        tracing::debug!(%user_id, category = %stored.category, "budget set");
        Ok(stored)
    }

    /// Lists the user's budgets, cache-aside.
    pub async fn list_budgets(&self, ctx: &RequestContext) -> ResultEngine<Vec<Budget>> {
        let key = budgets_key(ctx.user_id());
        if let Some(budgets) = self.cache_get(ctx, &key).await? {
            return Ok(budgets);
        }

        let budgets = ctx.run(self.budgets.list(ctx.user_id())).await?;
        self.cache_put(ctx, &key, &budgets, self.ttls.budgets).await?;
        Ok(budgets)
    }
}

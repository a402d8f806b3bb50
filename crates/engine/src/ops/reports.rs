use std::collections::BTreeSet;

use chrono::NaiveDate;
use tokio::task::JoinSet;

use crate::{
    CategoryFailure, EngineError, ReportOutcome, ReportSummary, RequestContext, ResultEngine,
    cache::report_key,
};

use super::Engine;

fn check_bounds(from: NaiveDate, to: NaiveDate) -> ResultEngine<()> {
    if to < from {
        return Err(EngineError::validation("to", "must not be before from"));
    }
    Ok(())
}

impl Engine {
    /// Spend per budgeted category over `[from, to)`.
    ///
    /// Served from the cache when possible. Otherwise every category total is
    /// computed in its own task; categories whose total fails are reported in
    /// [`ReportOutcome::failures`] and such an outcome is not cached.
    pub async fn report_summary(
        &self,
        ctx: &RequestContext,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<ReportOutcome> {
        check_bounds(from, to)?;
        let user_id = ctx.user_id();
        let key = report_key(user_id, from, to);
        if let Some(totals) = self.cache_get::<Vec<ReportSummary>>(ctx, &key).await? {
            return Ok(ReportOutcome {
                totals,
                failures: Vec::new(),
            });
        }

        let budgets = ctx.run(self.budgets.list(user_id)).await?;
        let mut pending: BTreeSet<String> = BTreeSet::new();
        let mut set = JoinSet::new();
        for budget in budgets {
            pending.insert(budget.category.clone());
            let expenses = self.expenses.clone();
            let ctx = ctx.clone();
            set.spawn(async move {
                let total = ctx
                    .run(expenses.sum_by_category_and_period(user_id, &budget.category, from, to))
                    .await;
                (budget.category, total)
            });
        }

        let mut outcome = ReportOutcome::default();
        while let Some(joined) = set.join_next().await {
            let (category, total) = match joined {
                Ok(done) => done,
                Err(err) => {
                    tracing::error!("report task failed: {err}");
                    continue;
                }
            };
            pending.remove(&category);
            match total {
                Ok(total) => outcome.totals.push(ReportSummary { category, total }),
                Err(err) if err.is_interruption() => return Err(err),
                Err(err) => {
                    tracing::warn!(%user_id, category = %category, "report total failed: {err}");
                    outcome.failures.push(CategoryFailure {
                        category,
                        error: err.to_string(),
                    });
                }
            }
        }
        // Categories whose task panicked never reported back.
        outcome
            .failures
            .extend(pending.into_iter().map(|category| CategoryFailure {
                category,
                error: "task failed".to_string(),
            }));

        outcome.totals.sort_by(|a, b| a.category.cmp(&b.category));
        outcome.failures.sort_by(|a, b| a.category.cmp(&b.category));

        if outcome.is_complete() {
            self.cache_put(ctx, &key, &outcome.totals, self.ttls.report)
                .await?;
        }
        Ok(outcome)
    }

    /// Spend per category over `[from, to)` from a single grouped query,
    /// including categories without a budget. Never cached.
    pub async fn spending_totals(
        &self,
        ctx: &RequestContext,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Vec<ReportSummary>> {
        check_bounds(from, to)?;
        ctx.run(self.reports.category_totals(ctx.user_id(), from, to))
            .await
    }
}

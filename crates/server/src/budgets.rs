//! Budgets API endpoints

use api_types::budget::{Budget as BudgetView, BudgetNew};
use axum::{Extension, Json, extract::State};
use engine::{Budget, NewBudget, RequestContext};

use crate::{ServerError, server::ServerState};

fn view(budget: Budget) -> BudgetView {
    BudgetView {
        category: budget.category,
        limit: budget.limit,
        period: budget.period.as_str().to_string(),
    }
}

pub async fn set(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetNew>,
) -> Result<Json<BudgetView>, ServerError> {
    let input = NewBudget::new(payload.category, payload.limit, payload.period);
    let budget = state.engine.set_budget(&ctx, input).await?;
    Ok(Json(view(budget)))
}

pub async fn list(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<BudgetView>>, ServerError> {
    let budgets = state.engine.list_budgets(&ctx).await?;
    Ok(Json(budgets.into_iter().map(view).collect()))
}

//! Reports API endpoints

use api_types::report::{CategoryFailure, ReportRange, ReportSummary};
use axum::{
    Extension, Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::NaiveDate;
use engine::{EngineError, RequestContext};

use crate::{ServerError, server::ServerState, transactions::parse_date};

/// Parses both bounds before any work is done.
fn bounds(
    range: Result<Query<ReportRange>, QueryRejection>,
) -> Result<(NaiveDate, NaiveDate), ServerError> {
    let Query(range) = range.map_err(|err| ServerError::Generic(err.body_text()))?;
    let bound = |name: &str, raw: &str| -> Result<NaiveDate, ServerError> {
        parse_date(Some(raw))
            .map_err(|err| EngineError::InvalidDate(format!("{name}: {err}")))?
            .ok_or_else(|| EngineError::InvalidDate(format!("{name}: missing")).into())
    };
    Ok((bound("from", &range.from)?, bound("to", &range.to)?))
}

pub async fn summary(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<ServerState>,
    range: Result<Query<ReportRange>, QueryRejection>,
) -> Result<Json<ReportSummary>, ServerError> {
    let (from, to) = bounds(range)?;
    let outcome = state.engine.report_summary(&ctx, from, to).await?;
    Ok(Json(ReportSummary {
        totals: outcome
            .totals
            .into_iter()
            .map(|summary| (summary.category, summary.total))
            .collect(),
        failures: outcome
            .failures
            .into_iter()
            .map(|failure| CategoryFailure {
                category: failure.category,
                error: failure.error,
            })
            .collect(),
    }))
}

/// Spend of every category, budgeted or not.
pub async fn totals(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<ServerState>,
    range: Result<Query<ReportRange>, QueryRejection>,
) -> Result<Json<ReportSummary>, ServerError> {
    let (from, to) = bounds(range)?;
    let totals = state.engine.spending_totals(&ctx, from, to).await?;
    Ok(Json(ReportSummary {
        totals: totals
            .into_iter()
            .map(|summary| (summary.category, summary.total))
            .collect(),
        failures: Vec::new(),
    }))
}

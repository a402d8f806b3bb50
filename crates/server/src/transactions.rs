//! Transactions API endpoints

use api_types::transaction::{
    BulkError, BulkNew, BulkResult, Transaction as TransactionView, TransactionNew,
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::NaiveDate;
use engine::{BulkImportResult, EngineError, NewTransaction, RequestContext, Transaction};

use crate::{ServerError, server::ServerState};

/// Workers of a bulk import when the request does not say.
const DEFAULT_BULK_WORKERS: usize = 4;

/// Parses a `YYYY-MM-DD` date. Absent or blank dates are left to validation.
pub(crate) fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("\"{raw}\" is not a YYYY-MM-DD date"))
}

fn new_transaction(payload: TransactionNew, date: Option<NaiveDate>) -> NewTransaction {
    NewTransaction {
        amount: payload.amount,
        category: payload.category,
        description: payload.description,
        date,
    }
}

fn view(transaction: Transaction) -> TransactionView {
    TransactionView {
        id: transaction.id,
        amount: transaction.amount,
        category: transaction.category,
        description: transaction.description,
        date: transaction.date.format("%Y-%m-%d").to_string(),
    }
}

pub(crate) fn bulk_body(result: BulkImportResult, incomplete: Option<String>) -> BulkResult {
    BulkResult {
        accepted: result.accepted,
        rejected: result.rejected,
        not_attempted: result.not_attempted,
        errors: result
            .errors
            .into_iter()
            .map(|entry| BulkError {
                index: entry.index,
                error: entry.error,
            })
            .collect(),
        incomplete,
    }
}

pub async fn create(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let date = parse_date(payload.date.as_deref()).map_err(EngineError::InvalidDate)?;
    let transaction = state
        .engine
        .add_transaction(&ctx, new_transaction(payload, date))
        .await?;
    Ok((StatusCode::CREATED, Json(view(transaction))))
}

pub async fn list(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<TransactionView>>, ServerError> {
    let transactions = state.engine.list_transactions(&ctx).await?;
    Ok(Json(transactions.into_iter().map(view).collect()))
}

/// Every item date is parsed before any admission: one malformed date
/// rejects the whole request.
pub async fn bulk(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<ServerState>,
    Json(payload): Json<BulkNew>,
) -> Result<Json<BulkResult>, ServerError> {
    let items = payload
        .transactions
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let date = parse_date(item.date.as_deref())
                .map_err(|err| EngineError::InvalidDate(format!("item {index}: {err}")))?;
            Ok(new_transaction(item, date))
        })
        .collect::<Result<Vec<_>, EngineError>>()?;

    let workers = payload
        .workers
        .unwrap_or(DEFAULT_BULK_WORKERS)
        .min(state.max_bulk_workers);
    let result = state
        .engine
        .bulk_add_transactions(&ctx, items, workers)
        .await?;
    Ok(Json(bulk_body(result, None)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_are_iso_days() {
        assert_eq!(
            parse_date(Some("2025-02-15")),
            Ok(NaiveDate::from_ymd_opt(2025, 2, 15))
        );
        assert_eq!(parse_date(None), Ok(None));
        assert_eq!(parse_date(Some("  ")), Ok(None));
        assert!(parse_date(Some("15/02/2025")).is_err());
        assert!(parse_date(Some("2025-02-30")).is_err());
    }
}

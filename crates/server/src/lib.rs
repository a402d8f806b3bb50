use api_types::ErrorBody;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

pub use identity::{Identity, IdentitySettings, TOKEN_HEADER, TokenSigner, USER_HEADER};
pub use server::{ServerSettings, ServerState, router, run_with_listener};

mod budgets;
mod identity;
mod reports;
mod server;
mod transactions;

pub mod types {
    pub mod transaction {
        pub use api_types::transaction::{BulkError, BulkNew, BulkResult, Transaction, TransactionNew};
    }

    pub mod budget {
        pub use api_types::budget::{Budget, BudgetNew};
    }

    pub mod report {
        pub use api_types::report::{CategoryFailure, ReportRange, ReportSummary};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation { .. } | EngineError::InvalidPeriod(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::InvalidDate(_) => StatusCode::BAD_REQUEST,
        EngineError::Unauthenticated => StatusCode::UNAUTHORIZED,
        EngineError::BudgetNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::BudgetExceeded { .. } => StatusCode::CONFLICT,
        EngineError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        EngineError::Canceled => StatusCode::REQUEST_TIMEOUT,
        EngineError::Internal(_) | EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::BulkIncomplete { cause, .. } => status_for_engine_error(cause),
    }
}

fn message_for_engine_error(err: &EngineError) -> String {
    match err {
        EngineError::Internal(_) | EngineError::Database(_) => {
            tracing::error!("internal error: {err}");
            "internal server error".to_string()
        }
        EngineError::BulkIncomplete { cause, .. } => message_for_engine_error(cause),
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ServerError::Engine(EngineError::BulkIncomplete { partial, cause }) => {
                let status = status_for_engine_error(&cause);
                let message = message_for_engine_error(&cause);
                let body = transactions::bulk_body(*partial, Some(message));
                (status, Json(body)).into_response()
            }
            ServerError::Engine(err) => {
                let field = match &err {
                    EngineError::Validation { field, .. } => Some(field.clone()),
                    _ => None,
                };
                let body = ErrorBody {
                    error: message_for_engine_error(&err),
                    field,
                };
                (status_for_engine_error(&err), Json(body)).into_response()
            }
            ServerError::Generic(error) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { error, field: None })).into_response()
            }
        }
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

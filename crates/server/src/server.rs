use std::{future::Future, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use engine::Engine;
use serde::Deserialize;
use tokio::time::Instant;

use crate::{
    ServerError, budgets,
    identity::{Identity, IdentitySettings},
    reports, transactions,
};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
    /// Deadline applied to every request.
    pub request_timeout_ms: u64,
    /// Upper bound on the workers of one bulk import.
    pub max_bulk_workers: usize,
    pub identity: IdentitySettings,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_ms: 2000,
            max_bulk_workers: 32,
            identity: IdentitySettings::default(),
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    identity: Identity,
    request_timeout: Duration,
    pub(crate) max_bulk_workers: usize,
}

impl ServerState {
    pub fn new(engine: Engine, settings: &ServerSettings) -> Self {
        Self {
            engine: Arc::new(engine),
            identity: Identity::from_settings(&settings.identity),
            request_timeout: Duration::from_millis(settings.request_timeout_ms),
            max_bulk_workers: settings.max_bulk_workers.max(1),
        }
    }
}

/// Resolves the caller and attaches its `RequestContext`, deadline included.
async fn identify(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let ctx = state
        .identity
        .resolve(request.headers())?
        .with_timeout(state.request_timeout);
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "request"
    );
    response
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/transactions",
            post(transactions::create).get(transactions::list),
        )
        .route("/transactions/bulk", post(transactions::bulk))
        .route("/budgets", put(budgets::set).get(budgets::list))
        .route("/reports/summary", get(reports::summary))
        .route("/reports/totals", get(reports::totals))
        .route_layer(middleware::from_fn_with_state(state.clone(), identify))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Serves until `shutdown` resolves, then drains in-flight requests.
pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

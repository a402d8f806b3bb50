use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::NaiveDate;
use engine::{Engine, ExpenseRepository, ResultEngine, Transaction, repository::sql::SqlExpenses};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{Value, json};
use server::{
    IdentitySettings, ServerSettings, ServerState, TOKEN_HEADER, TokenSigner, USER_HEADER, router,
};
use tower::ServiceExt;
use uuid::Uuid;

async fn database() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn app_with(settings: ServerSettings) -> Router {
    let engine = Engine::builder()
        .database(database().await)
        .build()
        .await
        .unwrap();
    router(ServerState::new(engine, &settings))
}

/// Expense store whose inserts take `delay`.
struct SlowInserts {
    inner: SqlExpenses,
    delay: Duration,
}

#[async_trait]
impl ExpenseRepository for SlowInserts {
    async fn add(&self, transaction: &Transaction) -> ResultEngine<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.add(transaction).await
    }

    async fn list(&self, user_id: Uuid) -> ResultEngine<Vec<Transaction>> {
        self.inner.list(user_id).await
    }

    async fn sum_by_category(&self, user_id: Uuid, category: &str) -> ResultEngine<Decimal> {
        self.inner.sum_by_category(user_id, category).await
    }

    async fn sum_by_category_and_period(
        &self,
        user_id: Uuid,
        category: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ResultEngine<Decimal> {
        self.inner
            .sum_by_category_and_period(user_id, category, from, to)
            .await
    }
}

async fn app() -> Router {
    app_with(ServerSettings::default()).await
}

async fn send_with(
    app: &Router,
    method: Method,
    uri: &str,
    header: Option<(&str, String)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((name, value)) = header {
        builder = builder.header(name, value);
    }
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Uuid,
    body: Option<Value>,
) -> (StatusCode, Value) {
    send_with(app, method, uri, Some((USER_HEADER, user.to_string())), body).await
}

async fn set_budget(app: &Router, user: Uuid, category: &str, limit: &str, period: &str) {
    let (status, _) = send(
        app,
        Method::PUT,
        "/budgets",
        user,
        Some(json!({ "category": category, "limit": limit, "period": period })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

fn expense(amount: &str, category: &str, date: &str) -> Value {
    json!({ "amount": amount, "category": category, "description": "", "date": date })
}

#[tokio::test]
async fn requests_without_identity_are_unauthenticated() {
    let app = app().await;
    let (status, body) = send_with(&app, Method::GET, "/budgets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _) = send_with(
        &app,
        Method::GET,
        "/budgets",
        Some((USER_HEADER, "alice".to_string())),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admission_over_http() {
    let app = app().await;
    let user = Uuid::new_v4();
    set_budget(&app, user, "food", "100", "monthly").await;

    for _ in 0..2 {
        let (status, body) = send(
            &app,
            Method::POST,
            "/transactions",
            user,
            Some(expense("40", "food", "2025-02-10")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["category"], "food");
        assert_eq!(body["date"], "2025-02-10");
    }

    let (status, body) = send(
        &app,
        Method::POST,
        "/transactions",
        user,
        Some(expense("30", "food", "2025-02-11")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "budget exceeded for category food: limit=100.00 current=80.00 amount=30.00"
    );

    let (status, body) = send(&app, Method::GET, "/transactions", user, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_category_and_bad_input() {
    let app = app().await;
    let user = Uuid::new_v4();

    let (status, _) = send(
        &app,
        Method::POST,
        "/transactions",
        user,
        Some(expense("1", "travel", "2025-02-10")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/transactions",
        user,
        Some(expense("1", "travel", "10-02-2025")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid date"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/transactions",
        user,
        Some(json!({ "amount": "1", "category": "travel" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "date");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/budgets",
        user,
        Some(json!({ "category": "food", "limit": "100", "period": "yearly" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "period");
}

#[tokio::test]
async fn bulk_reports_per_item_errors() {
    let app = app().await;
    let user = Uuid::new_v4();
    set_budget(&app, user, "food", "100", "").await;

    let items = json!({
        "transactions": [
            expense("60", "food", "2025-02-01"),
            expense("5", "travel", "2025-02-01"),
            expense("0", "food", "2025-02-01"),
            expense("30", "food", "2025-02-02"),
        ],
        "workers": 1,
    });
    let (status, body) = send(&app, Method::POST, "/transactions/bulk", user, Some(items)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], 2);
    assert_eq!(body["rejected"], 2);
    assert_eq!(body["not_attempted"], 0);
    let indices: Vec<u64> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["index"].as_u64().unwrap())
        .collect();
    assert_eq!(indices, vec![1, 2]);
}

#[tokio::test]
async fn bulk_with_a_malformed_date_is_rejected_whole() {
    let app = app().await;
    let user = Uuid::new_v4();
    set_budget(&app, user, "food", "100", "").await;

    let items = json!({
        "transactions": [
            expense("10", "food", "2025-02-01"),
            expense("10", "food", "2025-02-31"),
        ],
    });
    let (status, body) = send(&app, Method::POST, "/transactions/bulk", user, Some(items)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("item 1"));

    let (_, body) = send(&app, Method::GET, "/transactions", user, None).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn report_summary_and_totals() {
    let app = app().await;
    let user = Uuid::new_v4();
    set_budget(&app, user, "food", "100", "monthly").await;
    set_budget(&app, user, "rent", "1000", "monthly").await;
    for (amount, date) in [("12.50", "2025-02-01"), ("7.25", "2025-02-28"), ("3", "2025-03-01")] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/transactions",
            user,
            Some(expense(amount, "food", date)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        Method::GET,
        "/reports/summary?from=2025-02-01&to=2025-03-01",
        user,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totals"]["food"], "19.75");
    assert_eq!(body["totals"]["rent"], "0.00");
    assert!(body.get("failures").is_none());

    let (status, body) = send(
        &app,
        Method::GET,
        "/reports/totals?from=2025-02-01&to=2025-03-02",
        user,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totals"]["food"], "22.75");
    assert!(body["totals"].get("rent").is_none());
}

#[tokio::test]
async fn report_bounds_are_checked_first() {
    let app = app().await;
    let user = Uuid::new_v4();

    let (status, body) = send(
        &app,
        Method::GET,
        "/reports/summary?from=2025-03-01&to=2025-02-01",
        user,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "to");

    let (status, _) = send(
        &app,
        Method::GET,
        "/reports/summary?from=yesterday&to=2025-02-01",
        user,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/reports/totals?from=2025-02-01", user, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_token_identity() {
    let secret = "0123456789abcdef0123456789abcdef";
    let app = app_with(ServerSettings {
        identity: IdentitySettings::SignedToken {
            secret: secret.to_string(),
        },
        ..ServerSettings::default()
    })
    .await;
    let user = Uuid::new_v4();

    let (status, _) = send(&app, Method::GET, "/budgets", user, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = TokenSigner::new(secret.as_bytes())
        .issue(user, Duration::from_secs(60))
        .unwrap();
    let (status, body) = send_with(
        &app,
        Method::GET,
        "/budgets",
        Some((TOKEN_HEADER, token)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn bulk_cut_off_by_the_deadline_returns_the_partial_result() {
    let db = database().await;
    let slow = SlowInserts {
        inner: SqlExpenses::new(db.clone()),
        delay: Duration::from_millis(300),
    };
    let engine = Engine::builder()
        .database(db)
        .expense_repository(Arc::new(slow))
        .build()
        .await
        .unwrap();
    let settings = ServerSettings {
        request_timeout_ms: 450,
        ..ServerSettings::default()
    };
    let app = router(ServerState::new(engine, &settings));
    let user = Uuid::new_v4();
    set_budget(&app, user, "food", "100", "").await;

    let items = json!({
        "transactions": (0..5).map(|_| expense("1", "food", "2025-02-01")).collect::<Vec<_>>(),
        "workers": 1,
    });
    let (status, body) = send(&app, Method::POST, "/transactions/bulk", user, Some(items)).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["incomplete"], "deadline exceeded");
    assert_eq!(body["accepted"], 2);
    assert_eq!(body["rejected"], 0);
    assert_eq!(body["not_attempted"], 3);
    assert_eq!(body["errors"], json!([]));

    let (_, listed) = send(&app, Method::GET, "/transactions", user, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

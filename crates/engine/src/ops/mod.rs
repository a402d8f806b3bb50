use std::{fmt, sync::Arc, time::Duration};

use dashmap::DashMap;
use sea_orm::DatabaseConnection;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    EngineError, RequestContext, ResultEngine,
    cache::{Cache, CacheTtls, NoCache, report_pattern},
    repository::{
        BudgetRepository, ExpenseRepository, ReportRepository,
        sql::{SqlBudgets, SqlExpenses, SqlReports},
    },
};

mod admit;
mod budgets;
mod bulk;
mod reports;
mod transactions;

/// The budget-aware transaction engine.
///
/// Cloning is cheap and clones share repositories, cache and admission locks.
#[derive(Clone)]
pub struct Engine {
    budgets: Arc<dyn BudgetRepository>,
    expenses: Arc<dyn ExpenseRepository>,
    reports: Arc<dyn ReportRepository>,
    cache: Arc<dyn Cache>,
    ttls: CacheTtls,
    locks: Arc<AdmissionLocks>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("cache", &self.cache.name())
            .field("ttls", &self.ttls)
            .field("locks", &self.locks.inner.len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Drops every cached report window of the user. Runs outside the
    /// request context: once a write has committed this always completes.
    async fn invalidate_reports(&self, user_id: Uuid) {
        let pattern = report_pattern(user_id);
        self.cache.delete_by_pattern(&pattern).await;
        tracing::debug!(%user_id, "cache invalidate {pattern}");
    }

    /// Cache read honoring the context. Corrupt payloads count as a miss.
    async fn cache_get<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        key: &str,
    ) -> ResultEngine<Option<T>> {
        let Some(bytes) = ctx.run(async { Ok(self.cache.get(key).await) }).await? else {
            tracing::debug!("cache miss {key}");
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                tracing::debug!("cache hit {key}");
                Ok(Some(value))
            }
            Err(err) => {
                tracing::warn!("corrupt cache entry {key}: {err}");
                Ok(None)
            }
        }
    }

    async fn cache_put<T: Serialize>(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> ResultEngine<()> {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!("cache entry {key} not serializable: {err}");
                return Ok(());
            }
        };
        ctx.run(async {
            self.cache.set(key, bytes, ttl).await;
            Ok(())
        })
        .await?;
        tracing::debug!("cache set {key} ttl={ttl:?}");
        Ok(())
    }
}

/// One async mutex per `(user, category)`, created on first use.
///
/// Admission holds the lock from the budget lookup until the insert so that
/// two concurrent admissions cannot both pass the limit check. The locks are
/// process-local.
#[derive(Debug, Default)]
pub(crate) struct AdmissionLocks {
    inner: DashMap<(Uuid, String), Arc<Mutex<()>>>,
}

impl AdmissionLocks {
    async fn acquire(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        category: &str,
    ) -> ResultEngine<OwnedMutexGuard<()>> {
        let lock = self
            .inner
            .entry((user_id, category.to_string()))
            .or_default()
            .clone();
        ctx.run(async { Ok(lock.lock_owned().await) }).await
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    budgets: Option<Arc<dyn BudgetRepository>>,
    expenses: Option<Arc<dyn ExpenseRepository>>,
    reports: Option<Arc<dyn ReportRepository>>,
    cache: Option<Arc<dyn Cache>>,
    ttls: CacheTtls,
}

impl EngineBuilder {
    /// Pass the required database. Installs the sea-orm repositories.
    pub fn database(self, db: DatabaseConnection) -> EngineBuilder {
        self.budget_repository(Arc::new(SqlBudgets::new(db.clone())))
            .expense_repository(Arc::new(SqlExpenses::new(db.clone())))
            .report_repository(Arc::new(SqlReports::new(db)))
    }

    pub fn budget_repository(mut self, repository: Arc<dyn BudgetRepository>) -> EngineBuilder {
        self.budgets = Some(repository);
        self
    }

    pub fn expense_repository(mut self, repository: Arc<dyn ExpenseRepository>) -> EngineBuilder {
        self.expenses = Some(repository);
        self
    }

    pub fn report_repository(mut self, repository: Arc<dyn ReportRepository>) -> EngineBuilder {
        self.reports = Some(repository);
        self
    }

    /// Pass the cache selected at startup. Defaults to [`NoCache`].
    pub fn cache(mut self, cache: Arc<dyn Cache>) -> EngineBuilder {
        self.cache = Some(cache);
        self
    }

    pub fn ttls(mut self, ttls: CacheTtls) -> EngineBuilder {
        self.ttls = ttls;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let missing = |name: &str| EngineError::Internal(format!("{name} repository not set"));
        Ok(Engine {
            budgets: self.budgets.ok_or_else(|| missing("budget"))?,
            expenses: self.expenses.ok_or_else(|| missing("expense"))?,
            reports: self.reports.ok_or_else(|| missing("report"))?,
            cache: self.cache.unwrap_or_else(|| Arc::new(NoCache)),
            ttls: self.ttls,
            locks: Arc::new(AdmissionLocks::default()),
        })
    }
}

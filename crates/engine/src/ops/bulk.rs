use std::{
    iter::Enumerate,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    vec,
};

use tokio::task::JoinSet;

use crate::{
    BulkImportResult, BulkItemError, EngineError, NewTransaction, RequestContext, ResultEngine,
};

use super::Engine;

/// Message recorded for items that failed on storage.
const INTERNAL_ITEM_ERROR: &str = "internal error";

type Queue = Mutex<Enumerate<vec::IntoIter<NewTransaction>>>;

#[derive(Debug, Default)]
struct Tally {
    accepted: AtomicU64,
    rejected: AtomicU64,
    errors: Mutex<Vec<BulkItemError>>,
}

impl Tally {
    fn accept(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Internal failures are logged and recorded without their detail.
    fn reject(&self, index: usize, err: &EngineError) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        let error = if err.is_retriable() {
            tracing::error!(index, "bulk item failed: {err}");
            INTERNAL_ITEM_ERROR.to_string()
        } else {
            err.to_string()
        };
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(BulkItemError { index, error });
    }

    fn snapshot(&self, total: usize) -> BulkImportResult {
        let accepted = self.accepted.load(Ordering::Relaxed);
        let rejected = self.rejected.load(Ordering::Relaxed);
        let mut errors = std::mem::take(
            &mut *self.errors.lock().unwrap_or_else(PoisonError::into_inner),
        );
        errors.sort_by_key(|entry| entry.index);
        BulkImportResult {
            accepted,
            rejected,
            not_attempted: (total as u64).saturating_sub(accepted + rejected),
            errors,
        }
    }
}

impl Engine {
    /// Admits a batch with up to `workers` parallel workers.
    ///
    /// Every item goes through the same admission as
    /// [`add_transaction`](Engine::add_transaction); per-item failures are
    /// recorded against the item's position and never stop the batch. The
    /// user's cached reports are dropped once, after the last worker is done.
    ///
    /// When the context fires, workers stop pulling items and the call fails
    /// with `BulkIncomplete` carrying the partial aggregate. An item cut off
    /// mid-admission counts as rejected; an item whose insert has started is
    /// always finished.
    pub async fn bulk_add_transactions(
        &self,
        ctx: &RequestContext,
        items: Vec<NewTransaction>,
        workers: usize,
    ) -> ResultEngine<BulkImportResult> {
        ctx.check()?;
        let total = items.len();
        let workers = workers.clamp(1, total.max(1));
        let queue: Arc<Queue> = Arc::new(Mutex::new(items.into_iter().enumerate()));
        let tally = Arc::new(Tally::default());

        let mut set = JoinSet::new();
        for _ in 0..workers {
            let engine = self.clone();
            let ctx = ctx.clone();
            let queue = Arc::clone(&queue);
            let tally = Arc::clone(&tally);
            set.spawn(async move { engine.drain(&ctx, &queue, &tally).await });
        }

        let mut interruption = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(None) => {}
                Ok(Some(cause)) => {
                    interruption.get_or_insert(cause);
                }
                Err(err) => {
                    tracing::error!("bulk worker failed: {err}");
                    interruption.get_or_insert(EngineError::Internal(err.to_string()));
                }
            }
        }

        self.invalidate_reports(ctx.user_id()).await;

        let result = tally.snapshot(total);
        tracing::info!(
            user_id = %ctx.user_id(),
            workers,
            accepted = result.accepted,
            rejected = result.rejected,
            not_attempted = result.not_attempted,
            "bulk import finished"
        );
        match interruption {
            None => Ok(result),
            Some(cause) => Err(EngineError::BulkIncomplete {
                partial: Box::new(result),
                cause: Box::new(cause),
            }),
        }
    }

    /// Worker loop: pulls items until the queue is empty or the context
    /// fires. Returns the interruption, if any.
    async fn drain(
        &self,
        ctx: &RequestContext,
        queue: &Queue,
        tally: &Tally,
    ) -> Option<EngineError> {
        loop {
            if let Err(err) = ctx.check() {
                return Some(err);
            }
            let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
            let (index, item) = next?;
            match self.admit(ctx, item).await {
                Ok(_) => tally.accept(),
                Err(err) => {
                    tally.reject(index, &err);
                    if err.is_interruption() {
                        return Some(err);
                    }
                }
            }
        }
    }
}

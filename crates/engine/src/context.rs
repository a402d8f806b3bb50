//! Per-request context: the caller's identity plus its deadline and
//! cancellation signal.
//!
//! The user id is taken on trust. Whoever builds the context (the transport
//! layer) is responsible for having authenticated it.

use std::{future::Future, time::Duration};

use tokio::{sync::watch, time::Instant};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug)]
pub struct RequestContext {
    user_id: Uuid,
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl RequestContext {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            deadline: None,
            cancel: None,
        }
    }

    /// Builds a context from the raw identity field forwarded by the
    /// upstream identity check. Absent or malformed values are
    /// `Unauthenticated`.
    pub fn from_identity(value: Option<&str>) -> ResultEngine<Self> {
        let value = value
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(EngineError::Unauthenticated)?;
        let user_id = Uuid::parse_str(value).map_err(|_| EngineError::Unauthenticated)?;
        Ok(Self::new(user_id))
    }

    /// Sets the deadline `timeout` from now, keeping an earlier one.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// The context is canceled once `true` is sent on the channel.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails if the context already fired.
    pub fn check(&self) -> ResultEngine<()> {
        if let Some(cancel) = &self.cancel
            && *cancel.borrow()
        {
            return Err(EngineError::Canceled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(EngineError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Runs `work` until it completes or the context fires, whichever comes
    /// first. On interruption `work` is dropped.
    pub async fn run<T, F>(&self, work: F) -> ResultEngine<T>
    where
        F: Future<Output = ResultEngine<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            result = work => result,
            _ = self.expired() => Err(EngineError::DeadlineExceeded),
            _ = self.canceled() => Err(EngineError::Canceled),
        }
    }

    async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }

    async fn canceled(&self) {
        let Some(mut cancel) = self.cancel.clone() else {
            return std::future::pending().await;
        };
        loop {
            if *cancel.borrow_and_update() {
                return;
            }
            // A dropped sender can never cancel.
            if cancel.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

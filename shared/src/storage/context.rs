//! Cancellable request context.
//!
//! A `QueryContext` travels with every metrics query from the API layer down
//! to the storage reader. It carries a request identifier, an optional
//! deadline, and a cancellation signal shared by all of its clones. Only
//! readers interpret it; the query service forwards it untouched.

use super::metrics_reader::MetricsStoreError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Request-scoped context passed to every reader call.
#[derive(Debug, Clone)]
pub struct QueryContext {
    request_id: String,
    deadline: Option<Instant>,
    cancelled: watch::Receiver<bool>,
}

/// Handle used to cancel a `QueryContext` and all of its clones.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signals cancellation to every clone of the associated context.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl QueryContext {
    /// Creates a context that can be cancelled through the returned handle.
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> (Self, CancelHandle) {
        let (sender, cancelled) = watch::channel(false);
        let ctx = Self {
            request_id: request_id.into(),
            deadline: None,
            cancelled,
        };
        (ctx, CancelHandle { sender })
    }

    /// Creates a context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background(request_id: impl Into<String>) -> Self {
        // Dropping the handle leaves the flag permanently false.
        Self::new(request_id).0
    }

    /// Bounds the context by a timeout measured from now.
    ///
    /// A timeout too large to represent as an instant leaves the context
    /// unchanged.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Bounds the context by a deadline.
    ///
    /// An earlier deadline already present on the context is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Returns the request identifier.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once the context was cancelled or its deadline passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Checks whether the context is still live.
    ///
    /// # Errors
    ///
    /// Returns `MetricsStoreError::Cancelled` if the context was cancelled, or
    /// `MetricsStoreError::DeadlineExceeded` if its deadline has passed.
    pub fn check(&self) -> Result<(), MetricsStoreError> {
        if *self.cancelled.borrow() {
            return Err(MetricsStoreError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(MetricsStoreError::DeadlineExceeded)
            }
            _ => Ok(()),
        }
    }

    /// Resolves once the context is done, yielding the reason.
    ///
    /// Never resolves for a background context.
    pub async fn done(&self) -> MetricsStoreError {
        let mut cancelled = self.cancelled.clone();
        let signalled = async move {
            loop {
                if *cancelled.borrow_and_update() {
                    return;
                }
                if cancelled.changed().await.is_err() {
                    // Handle dropped without cancelling.
                    std::future::pending::<()>().await;
                }
            }
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                () = signalled => MetricsStoreError::Cancelled,
                () = tokio::time::sleep_until(deadline) => MetricsStoreError::DeadlineExceeded,
            },
            None => {
                signalled.await;
                MetricsStoreError::Cancelled
            }
        }
    }

    /// Runs a future to completion unless the context finishes first.
    ///
    /// # Errors
    ///
    /// Returns the future's own error, or `Cancelled`/`DeadlineExceeded`
    /// when the context finishes before the future does.
    pub async fn run<F, T>(&self, future: F) -> Result<T, MetricsStoreError>
    where
        F: Future<Output = Result<T, MetricsStoreError>>,
    {
        self.check()?;
        tokio::select! {
            result = future => result,
            reason = self.done() => Err(reason),
        }
    }
}

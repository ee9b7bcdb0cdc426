//! Scope - the cancellable lifetime every operation runs within.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::StoreError;

/// A cancellable lifetime with an optional deadline.
///
/// Cloning is cheap; clones and derived scopes observe the same cancellation.
/// Dropping the [`Canceller`] without calling `cancel` leaves the scope live.
#[derive(Debug, Clone)]
pub struct Scope {
    cancelled: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Cancels the [`Scope`] it was created with, and every scope derived from it.
#[derive(Debug)]
pub struct Canceller {
    sender: watch::Sender<bool>,
}

impl Scope {
    /// A new live scope without a deadline, plus its canceller.
    pub fn new() -> (Scope, Canceller) {
        let (sender, cancelled) = watch::channel(false);
        (
            Scope {
                cancelled,
                deadline: None,
            },
            Canceller { sender },
        )
    }

    /// A derived scope that also expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Scope {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A derived scope that also expires at `deadline`. The earlier of this
    /// deadline and the parent's wins.
    pub fn with_deadline(&self, deadline: Instant) -> Scope {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Scope {
            cancelled: self.cancelled.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolves once the scope is cancelled. Never resolves if the canceller
    /// is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut cancelled = self.cancelled.clone();
        loop {
            if *cancelled.borrow_and_update() {
                return;
            }
            if cancelled.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Drive `operation` to completion unless the scope is cancelled or its
    /// deadline passes first. The losing future is dropped, which aborts it.
    pub async fn run<F>(&self, operation: F) -> Result<F::Output, StoreError>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if matches!(self.deadline, Some(deadline) if deadline <= Instant::now()) {
            return Err(StoreError::DeadlineExceeded);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(StoreError::Cancelled),
            _ = expire(self.deadline) => Err(StoreError::DeadlineExceeded),
            output = operation => Ok(output),
        }
    }
}

impl Canceller {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

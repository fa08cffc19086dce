//! Cancellable execution context
//!
//! Every mapper operation takes a [`Context`] and forwards it untouched to the
//! executor. The mapper itself never waits on it; executors race their work
//! against [`Context::done`] and fail with a [`ContextError`] once the context
//! is cancelled or its deadline passes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// [`CancelHandle::cancel`] was called
    #[error("context canceled")]
    Canceled,
    /// The deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Execution context carrying an optional cancellation signal and deadline
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: Option<watch::Receiver<bool>>,
    parent: Option<Arc<Context>>,
    deadline: Option<Instant>,
}

/// Cancels the context it was created with (and all its clones)
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel the context. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Context {
    /// A context that never ends
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a cancellable context. Cancelling `self` also cancels the child.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancel: Some(rx),
            parent: Some(Arc::new(self.clone())),
            deadline: self.deadline,
        };
        (ctx, CancelHandle { tx })
    }

    /// Derive a context that expires at `deadline` (or earlier, if this one does)
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            cancel: self.cancel.clone(),
            parent: self.parent.clone(),
            deadline: Some(deadline),
        }
    }

    /// Derive a context that expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn is_canceled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
            || self.parent.as_ref().is_some_and(|parent| parent.is_canceled())
    }

    /// Non-blocking check: `Some` once the context has ended
    pub fn err(&self) -> Option<ContextError> {
        if self.is_canceled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves when the context ends. Never resolves for a background context.
    pub fn done(&self) -> Pin<Box<dyn Future<Output = ContextError> + Send + '_>> {
        Box::pin(async move {
            let canceled = async {
                if let Some(rx) = &self.cancel {
                    let mut rx = rx.clone();
                    if rx.wait_for(|canceled| *canceled).await.is_ok() {
                        return;
                    }
                }
                // Handle dropped without cancelling: can no longer be canceled.
                std::future::pending::<()>().await
            };
            let parent = async {
                match &self.parent {
                    Some(parent) => parent.done().await,
                    None => std::future::pending().await,
                }
            };
            let expired = async {
                match self.deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;
                _ = canceled => ContextError::Canceled,
                err = parent => err,
                _ = expired => ContextError::DeadlineExceeded,
            }
        })
    }
}

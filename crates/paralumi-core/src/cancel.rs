use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{ParalumiError, Result};

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Run-scoped cancellation flag. Clones share the same flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender is owned by every clone, so this only happens during
                // teardown; never resolve.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// RunContext
// ---------------------------------------------------------------------------

/// Threaded through every backend call of a run: cancellation plus an
/// optional per-call timeout.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancel: CancelToken,
    call_timeout: Option<Duration>,
}

impl RunContext {
    pub fn new(cancel: CancelToken, call_timeout: Option<Duration>) -> Self {
        Self {
            cancel,
            call_timeout,
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Drive one backend call. The call future is dropped as soon as the run
    /// is cancelled or the timeout elapses, which kills any subprocess it
    /// owns.
    pub async fn call<T, F>(&self, call: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ParalumiError::Cancelled { call: call.into() });
        }

        let guarded = async {
            match self.call_timeout {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(res) => res,
                    Err(_) => Err(ParalumiError::Timeout {
                        call: call.into(),
                        after: limit,
                    }),
                },
                None => fut.await,
            }
        };

        tokio::select! {
            res = guarded => res,
            _ = self.cancel.cancelled() => Err(ParalumiError::Cancelled { call: call.into() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn call_passes_through_result() {
        let ctx = RunContext::default();
        let value = ctx.call("noop", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn call_fails_fast_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let ctx = RunContext::new(token, None);
        let err = ctx
            .call("list environments", async { Ok::<_, ParalumiError>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, ParalumiError::Cancelled { call } if call == "list environments"));
    }

    #[tokio::test]
    async fn cancelling_interrupts_in_flight_call() {
        let token = CancelToken::new();
        let ctx = RunContext::new(token.clone(), None);

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = ctx
            .call("preview", async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, ParalumiError>(())
            })
            .await
            .unwrap_err();
        canceller.await.unwrap();
        assert!(matches!(err, ParalumiError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn call_times_out() {
        let ctx = RunContext::new(CancelToken::new(), Some(Duration::from_millis(10)));
        let err = ctx
            .call("get config value", async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, ParalumiError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ParalumiError::Timeout { .. }));
    }
}

use super::machine::Resume;
use super::scheduler::{Poller, Shared};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Holds the poller's periodic loop suspended until dropped.
///
/// Guards nest: the loop restarts with the last request only once every
/// outstanding guard is gone.
#[must_use = "polling resumes as soon as the guard is dropped"]
pub struct PauseGuard<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Drop for PauseGuard<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        match inner.machine.pause_released() {
            Resume::Ready => {
                tracing::debug!(poller = %self.shared.label, "Last pause released, resuming");
                self.shared.launch(&mut inner);
            }
            Resume::Pending(remaining) => {
                tracing::debug!(poller = %self.shared.label, remaining, "Pause released");
            }
            Resume::Unbalanced => {
                tracing::warn!(poller = %self.shared.label, "Pause released while not paused");
            }
        }
    }
}

impl<T, E> Poller<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// Suspends periodic polling, cancelling any in-flight fetch.
    pub fn pause(&self) -> PauseGuard<T, E> {
        let mut inner = self.shared.lock();
        let holders = inner.machine.pause_acquired();
        self.shared.cancel(&mut inner);
        tracing::debug!(poller = %self.shared.label, holders, "Polling paused");

        PauseGuard {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Runs one mutating operation with polling suspended and returns its result.
    ///
    /// `op` starts only after a cancelled fetch has been dropped.
    pub async fn mutate<Fut, R>(&self, op: Fut) -> R
    where
        Fut: Future<Output = R>,
    {
        let _guard = self.pause();
        let _quiet = self.shared.quiesce().await;
        op.await
    }

    /// Spawns `op` with polling suspended and reports its outcome to callbacks.
    ///
    /// The pause is taken before this returns and `op` is first polled once
    /// the cancelled fetch has been dropped, so the two never overlap.
    /// `on_complete` follows `on_success`; it is not called on error. Polling resumes after the callbacks have run, whichever way the
    /// operation went.
    pub fn subscribe_data_change<Fut, R, Er, S, F, C>(
        &self,
        op: Fut,
        on_success: S,
        on_error: F,
        on_complete: C,
    ) -> JoinHandle<()>
    where
        Fut: Future<Output = Result<R, Er>> + Send + 'static,
        R: Send + 'static,
        Er: Send + 'static,
        S: FnOnce(R) + Send + 'static,
        F: FnOnce(Er) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let guard = self.pause();
        tokio::spawn(async move {
            let quiet = guard.shared.quiesce().await;
            match op.await {
                Ok(value) => {
                    on_success(value);
                    on_complete();
                }
                Err(error) => on_error(error),
            }
            drop(quiet);
            drop(guard);
        })
    }
}

use super::machine::{Generation, PollMachine, PollState};
use super::request::PollRequest;
use crate::core::cache::ResultCache;
use crate::core::errors::PollerError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tokio::task::JoinHandle;

pub(super) struct PollerInner<T, E> {
    pub(super) machine: PollMachine,
    pub(super) request: Option<PollRequest<T, E>>,
    task: Option<JoinHandle<()>>,
}

pub(super) struct Shared<T, E> {
    pub(super) label: String,
    inner: Mutex<PollerInner<T, E>>,
    cache: Option<ResultCache<T>>,
    /// Held exclusively by a cycle from fetch issue until its outcome is
    /// applied, and shared by one-off mutations. An aborted cycle only
    /// gives it up once its fetch future has been dropped.
    fetch_gate: Arc<RwLock<()>>,
}

impl<T, E> Shared<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    pub(super) fn lock(&self) -> MutexGuard<'_, PollerInner<T, E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a fresh cycle chain for the stored request, unless paused.
    pub(super) fn launch(self: &Arc<Self>, inner: &mut PollerInner<T, E>) {
        let Some(request) = inner.request.clone() else {
            return;
        };

        let Some(generation) = inner.machine.start() else {
            tracing::debug!(poller = %self.label, "Poller paused, deferring start");
            return;
        };

        if let Some(task) = inner.task.take() {
            task.abort();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(poller = %self.label, "No Tokio runtime available, poller stays idle");
            inner.machine.release();
            return;
        };

        tracing::debug!(
            poller = %self.label,
            %generation,
            delay_ms = request.delay.as_millis() as u64,
            "Starting poll cycle"
        );
        inner.task = Some(runtime.spawn(run_cycles(Arc::clone(self), generation, request)));
    }

    pub(super) fn cancel(&self, inner: &mut PollerInner<T, E>) {
        if let Some(task) = inner.task.take() {
            task.abort();
        }
    }

    /// Waits until no periodic fetch is in flight. Mutations hold the
    /// returned guard while their operation runs.
    pub(super) async fn quiesce(&self) -> OwnedRwLockReadGuard<()> {
        Arc::clone(&self.fetch_gate).read_owned().await
    }

    /// Caches `payload` unless the cycle was superseded while delivering it.
    fn store_result(&self, generation: Generation, request: &PollRequest<T, E>, payload: T) {
        let (Some(cache), Some(key)) = (&self.cache, &request.cache_key) else {
            return;
        };
        if !self.lock().machine.is_current(generation) {
            tracing::debug!(poller = %self.label, %generation, "Cycle superseded during delivery, not caching");
            return;
        }
        cache.insert(key.clone(), payload);
    }
}

/// One fetch, one delivery, one delay, repeated until the generation is superseded.
async fn run_cycles<T, E>(
    shared: Arc<Shared<T, E>>,
    generation: Generation,
    request: PollRequest<T, E>,
) where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    loop {
        let slot = Arc::clone(&shared.fetch_gate).write_owned().await;
        if !shared.lock().machine.is_current(generation) {
            return;
        }

        let outcome = request.run_fetch().await;

        let current = {
            let mut inner = shared.lock();
            match &outcome {
                Ok(_) => inner.machine.fetch_resolved(generation),
                Err(_) => inner.machine.fetch_rejected(generation),
            }
        };

        if !current {
            tracing::debug!(poller = %shared.label, %generation, "Dropping result from cancelled cycle");
            return;
        }

        match outcome {
            Ok(payload) => {
                let cached = request.cache_key.as_ref().map(|_| payload.clone());
                (request.on_success)(payload);
                if let Some(payload) = cached {
                    shared.store_result(generation, &request, payload);
                }
            }
            Err(error) => {
                tracing::debug!(poller = %shared.label, %generation, "Fetch failed, retrying after delay");
                (request.on_error)(error);
            }
        }

        drop(slot);
        tokio::time::sleep(request.delay).await;

        if !shared.lock().machine.timer_fired(generation) {
            return;
        }
    }
}

/// Periodically re-fetches a data source and delivers each result to callbacks.
///
/// At most one fetch per poller is ever outstanding: the next fetch is issued
/// only after the previous one has been delivered and the delay has elapsed.
/// Failures go to the error callback and never stop the loop. Dropping the
/// poller releases it.
pub struct Poller<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    pub(super) shared: Arc<Shared<T, E>>,
}

impl<T, E> Poller<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// A poller without a cache; cache keys on its requests are ignored.
    pub fn new(label: impl Into<String>) -> Self {
        Self::build(label.into(), None)
    }

    pub fn with_cache(label: impl Into<String>, cache: ResultCache<T>) -> Self {
        Self::build(label.into(), Some(cache))
    }

    fn build(label: String, cache: Option<ResultCache<T>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                label,
                inner: Mutex::new(PollerInner {
                    machine: PollMachine::new(),
                    request: None,
                    task: None,
                }),
                cache,
                fetch_gate: Arc::new(RwLock::new(())),
            }),
        }
    }

    pub fn state(&self) -> PollState {
        self.shared.lock().machine.state()
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state(), PollState::Paused(_))
    }

    /// Replaces the stored request and restarts polling from scratch.
    ///
    /// A fresh cache entry for the request's key is delivered to `on_success`
    /// before this returns; the network fetch still runs and its result
    /// follows. While paused the request is only stored and runs on resume.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, request: PollRequest<T, E>) -> Result<(), PollerError> {
        if request.delay.is_zero() {
            return Err(PollerError::ZeroDelay);
        }

        if request.load_from_cache {
            self.deliver_cached(&request);
        }

        let mut inner = self.shared.lock();
        inner.request = Some(request);
        self.shared.launch(&mut inner);
        Ok(())
    }

    fn deliver_cached(&self, request: &PollRequest<T, E>) {
        let (Some(cache), Some(key)) = (&self.shared.cache, &request.cache_key) else {
            return;
        };

        if let Some(payload) = cache.get(key) {
            tracing::debug!(poller = %self.shared.label, %key, "Delivering cached payload");
            (request.on_success)(payload);
        }
    }

    /// Stops polling. A fetch still in flight is dropped and never delivered.
    ///
    /// The stored request is forgotten, so a pause released afterwards does
    /// not revive the loop. Safe to call any number of times.
    pub fn release(&self) {
        let mut inner = self.shared.lock();
        inner.machine.release();
        inner.request = None;
        self.shared.cancel(&mut inner);
    }
}

impl<T, E> Drop for Poller<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    fn drop(&mut self) {
        self.release();
    }
}

use crate::core::errors::PollerError;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub type FetchFuture<T, E> = BoxFuture<'static, Result<T, E>>;

type FetchFn<T, E> = Arc<dyn Fn() -> FetchFuture<T, E> + Send + Sync>;
type Callback<V> = Arc<dyn Fn(V) + Send + Sync>;

struct FetchTimeout<E> {
    after: Duration,
    into_error: Arc<dyn Fn(PollerError) -> E + Send + Sync>,
}

impl<E> Clone for FetchTimeout<E> {
    fn clone(&self) -> Self {
        Self {
            after: self.after,
            into_error: Arc::clone(&self.into_error),
        }
    }
}

/// Everything one polling loop needs: cadence, how to fetch, where results go.
///
/// The poller keeps the most recent request so it can restart the loop with
/// exactly the same parameters after a pause.
pub struct PollRequest<T, E> {
    pub(crate) delay: Duration,
    fetch: FetchFn<T, E>,
    pub(crate) on_success: Callback<T>,
    pub(crate) on_error: Callback<E>,
    pub(crate) cache_key: Option<String>,
    pub(crate) load_from_cache: bool,
    timeout: Option<FetchTimeout<E>>,
}

impl<T, E> Clone for PollRequest<T, E> {
    fn clone(&self) -> Self {
        Self {
            delay: self.delay,
            fetch: Arc::clone(&self.fetch),
            on_success: Arc::clone(&self.on_success),
            on_error: Arc::clone(&self.on_error),
            cache_key: self.cache_key.clone(),
            load_from_cache: self.load_from_cache,
            timeout: self.timeout.clone(),
        }
    }
}

impl<T: 'static, E: 'static> PollRequest<T, E> {
    /// `delay` is measured from the end of one fetch to the start of the next.
    pub fn new<F, Fut, S>(delay: Duration, fetch: F, on_success: S) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        Self {
            delay,
            fetch: Arc::new(move || fetch().boxed()),
            on_success: Arc::new(on_success),
            on_error: Arc::new(|_: E| {}),
            cache_key: None,
            load_from_cache: true,
            timeout: None,
        }
    }

    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(on_error);
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Whether `start` delivers a fresh cached payload before the first fetch resolves.
    pub fn load_from_cache(mut self, load: bool) -> Self {
        self.load_from_cache = load;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub(crate) async fn run_fetch(&self) -> Result<T, E> {
        let fetch = (self.fetch)();
        let Some(timeout) = &self.timeout else {
            return fetch.await;
        };

        match tokio::time::timeout(timeout.after, fetch).await {
            Ok(result) => result,
            Err(_) => Err((timeout.into_error)(PollerError::FetchTimeout(timeout.after))),
        }
    }
}

impl<T: 'static, E: From<PollerError> + 'static> PollRequest<T, E> {
    /// Bounds each fetch. A fetch that overruns is dropped and reported
    /// through `on_error` as [`PollerError::FetchTimeout`].
    pub fn timeout(mut self, after: Duration) -> Self {
        self.timeout = Some(FetchTimeout {
            after,
            into_error: Arc::new(<E as From<PollerError>>::from),
        });
        self
    }
}

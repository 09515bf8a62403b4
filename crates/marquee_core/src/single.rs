//! Single-shot fetch-and-cache of one result set.

use std::sync::Arc;

use marquee_logging::{mq_debug, mq_warn, TARGET_CONTROLLER};
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::source::SourceSlot;
use crate::{ControllerError, FetchError, FetchHandle, LoadOutcome, OnceSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Fetch once as soon as the controller is created.
    pub auto_fetch: bool,
    /// Drop responses that arrive after `reset()`, `replace_source()` or a
    /// newer `refetch()`.
    pub discard_stale: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            auto_fetch: true,
            discard_stale: true,
        }
    }
}

/// Snapshot of a single result set.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    data: Option<Vec<T>>,
    loading: bool,
    error: Option<FetchError>,
    generation: u64,
    latest_request: u64,
}

impl<T> FetchState<T> {
    fn initial() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            generation: 0,
            latest_request: 0,
        }
    }

    /// `None` until the first successful fetch and again after `reset()`.
    pub fn data(&self) -> Option<&[T]> {
        self.data.as_deref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy)]
struct Ticket {
    request: u64,
    generation: u64,
}

struct Inner<T> {
    source: SourceSlot<dyn OnceSource<T>>,
    state: watch::Sender<FetchState<T>>,
    options: FetchOptions,
    runtime: Handle,
}

/// Wraps one async producer call and publishes its result.
pub struct SingleFetchController<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SingleFetchController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SingleFetchController<T>
where
    T: Send + Sync + 'static,
{
    /// Must be called from within a Tokio runtime.
    pub fn new<S>(source: S, options: FetchOptions) -> Result<Self, ControllerError>
    where
        S: OnceSource<T> + 'static,
    {
        Self::with_source(Arc::new(source), options)
    }

    pub fn with_source(
        source: Arc<dyn OnceSource<T>>,
        options: FetchOptions,
    ) -> Result<Self, ControllerError> {
        let runtime = Handle::try_current().map_err(|_| ControllerError::NoRuntime)?;
        let (state, _) = watch::channel(FetchState::initial());
        let controller = Self {
            inner: Arc::new(Inner {
                source: SourceSlot::new(source),
                state,
                options,
                runtime,
            }),
        };
        if options.auto_fetch {
            drop(controller.refetch());
        }
        Ok(controller)
    }

    /// Starts a fetch. `loading` is set and `error` cleared before this
    /// returns; the previous `data` stays visible until the new result lands.
    pub fn refetch(&self) -> FetchHandle {
        let mut ticket = Ticket {
            request: 0,
            generation: 0,
        };
        self.inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
            state.latest_request += 1;
            ticket = Ticket {
                request: state.latest_request,
                generation: state.generation,
            };
        });
        mq_debug!(
            target: TARGET_CONTROLLER,
            "single fetch request={} generation={}",
            ticket.request,
            ticket.generation
        );

        let source = self.inner.source.get();
        let inner = Arc::clone(&self.inner);
        let join = self.inner.runtime.spawn(async move {
            let guard = InFlight::new(inner, ticket);
            let result = source.fetch().await;
            guard.settle(result)
        });
        FetchHandle::running(join)
    }

    /// Clears `data` and `error`. Leaves `loading` alone.
    pub fn reset(&self) {
        self.inner.state.send_modify(|state| {
            state.data = None;
            state.error = None;
            state.generation += 1;
        });
    }

    /// Installs a new producer. Responses from the previous one become stale.
    pub fn replace_source(&self, source: Arc<dyn OnceSource<T>>) {
        self.inner.source.replace(source);
        self.inner.state.send_modify(|state| state.generation += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.inner.state.subscribe()
    }

    pub fn inspect<R>(&self, f: impl FnOnce(&FetchState<T>) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.inner.runtime
    }
}

impl<T> SingleFetchController<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn state(&self) -> FetchState<T> {
        self.inner.state.borrow().clone()
    }

    /// Waits until no request is in flight and returns that state.
    pub async fn settled(&self) -> FetchState<T> {
        let mut rx = self.inner.state.subscribe();
        if let Ok(state) = rx.wait_for(|state| !state.loading).await {
            return state.clone();
        }
        self.state()
    }
}

struct InFlight<T> {
    inner: Arc<Inner<T>>,
    ticket: Ticket,
    armed: bool,
}

impl<T> InFlight<T> {
    fn new(inner: Arc<Inner<T>>, ticket: Ticket) -> Self {
        Self {
            inner,
            ticket,
            armed: true,
        }
    }

    fn settle(mut self, result: Result<Vec<T>, FetchError>) -> LoadOutcome {
        self.armed = false;
        let ticket = self.ticket;
        let discard_stale = self.inner.options.discard_stale;
        let mut outcome = LoadOutcome::Stale;
        self.inner.state.send_modify(|state| {
            let latest = state.latest_request == ticket.request;
            if latest || !discard_stale {
                state.loading = false;
            }
            let current = latest && state.generation == ticket.generation;
            if discard_stale && !current {
                return;
            }
            outcome = match result {
                Ok(items) => {
                    let count = items.len();
                    state.data = Some(items);
                    LoadOutcome::Loaded { items: count }
                }
                Err(err) => {
                    state.error = Some(err.clone());
                    LoadOutcome::Failed(err)
                }
            };
        });
        match &outcome {
            LoadOutcome::Stale => mq_debug!(
                target: TARGET_CONTROLLER,
                "discarding stale single fetch request={}",
                ticket.request
            ),
            LoadOutcome::Failed(err) => {
                mq_warn!(target: TARGET_CONTROLLER, "single fetch failed: {}", err)
            }
            _ => {}
        }
        outcome
    }
}

impl<T> Drop for InFlight<T> {
    fn drop(&mut self) {
        if self.armed {
            let request = self.ticket.request;
            mq_warn!(target: TARGET_CONTROLLER, "single producer ended without a result");
            self.inner.state.send_modify(|state| {
                if state.latest_request == request {
                    state.loading = false;
                }
            });
        }
    }
}

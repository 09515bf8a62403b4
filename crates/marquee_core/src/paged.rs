//! Incremental "load more" pagination over a [`PageSource`].
//!
//! At most one producer call runs per controller. The re-entrancy check and
//! the flag update happen in a single `send_if_modified` step on the watched
//! state, so the guard holds on a multi-threaded runtime as well.

use std::sync::Arc;

use marquee_logging::{mq_debug, mq_warn, TARGET_CONTROLLER};
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::source::SourceSlot;
use crate::{ControllerError, FetchError, FetchHandle, LoadOutcome, PageSource};

/// Which class of request is in flight. `Loading` and `LoadingMore` can
/// never coexist because they are one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    /// First page (initial load or refetch).
    Loading,
    /// A subsequent page being appended.
    LoadingMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagedOptions {
    /// Load page 1 as soon as the controller is created.
    pub auto_fetch: bool,
    /// Let `refetch()` re-open pagination after an empty page was seen.
    pub refetch_resets_has_more: bool,
    /// Clear a stored error when a new request starts instead of when it succeeds.
    pub clear_error_on_start: bool,
    /// Drop responses that arrive after `reset()` or `replace_source()`.
    pub discard_stale: bool,
}

impl Default for PagedOptions {
    fn default() -> Self {
        Self {
            auto_fetch: true,
            refetch_resets_has_more: false,
            clear_error_on_start: false,
            discard_stale: true,
        }
    }
}

/// Snapshot of a paginated list.
#[derive(Debug, Clone, PartialEq)]
pub struct PageState<T> {
    data: Vec<T>,
    page: u32,
    activity: Activity,
    has_more: bool,
    error: Option<FetchError>,
    generation: u64,
}

impl<T> PageState<T> {
    fn initial() -> Self {
        Self {
            data: Vec::new(),
            page: 1,
            activity: Activity::Idle,
            has_more: true,
            error: None,
            generation: 0,
        }
    }

    /// Items accumulated across all merged pages.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Highest page index merged into `data`.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn loading(&self) -> bool {
        self.activity == Activity::Loading
    }

    pub fn loading_more(&self) -> bool {
        self.activity == Activity::LoadingMore
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    /// Bumped by `reset()` and `replace_source()`.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Page { number: u32, append: bool },
    Next,
}

#[derive(Debug, Clone, Copy)]
struct Ticket {
    page: u32,
    append: bool,
    generation: u64,
}

struct Inner<T> {
    source: SourceSlot<dyn PageSource<T>>,
    state: watch::Sender<PageState<T>>,
    options: PagedOptions,
    runtime: Handle,
}

/// Paginated fetch controller.
///
/// Cloning yields another handle onto the same state and producer.
pub struct PaginatedFetchController<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for PaginatedFetchController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PaginatedFetchController<T>
where
    T: Send + Sync + 'static,
{
    /// Creates a controller bound to `source`.
    ///
    /// Must be called from within a Tokio runtime; producer calls are spawned
    /// onto it.
    pub fn new<S>(source: S, options: PagedOptions) -> Result<Self, ControllerError>
    where
        S: PageSource<T> + 'static,
    {
        Self::with_source(Arc::new(source), options)
    }

    pub fn with_source(
        source: Arc<dyn PageSource<T>>,
        options: PagedOptions,
    ) -> Result<Self, ControllerError> {
        let runtime = Handle::try_current().map_err(|_| ControllerError::NoRuntime)?;
        let (state, _) = watch::channel(PageState::initial());
        let controller = Self {
            inner: Arc::new(Inner {
                source: SourceSlot::new(source),
                state,
                options,
                runtime,
            }),
        };
        if options.auto_fetch {
            // Detached: state observers see the result.
            drop(controller.load_page(1, false));
        }
        Ok(controller)
    }

    /// Fetches `page` and either appends it or replaces the list.
    ///
    /// Pages are numbered from 1; page 0 is skipped. Dropped without a
    /// producer call when any request is already in flight.
    pub fn load_page(&self, page: u32, append: bool) -> FetchHandle {
        self.start(Target::Page {
            number: page,
            append,
        })
    }

    /// Appends the next page unless pagination is exhausted or a request is
    /// in flight.
    pub fn load_more(&self) -> FetchHandle {
        self.start(Target::Next)
    }

    /// Re-fetches page 1 and replaces the list.
    pub fn refetch(&self) -> FetchHandle {
        self.start(Target::Page {
            number: 1,
            append: false,
        })
    }

    /// Clears the list and re-opens pagination. An in-flight request is not
    /// cancelled.
    pub fn reset(&self) {
        self.inner.state.send_modify(|state| {
            state.data.clear();
            state.page = 1;
            state.has_more = true;
            state.error = None;
            state.generation += 1;
        });
    }

    /// Installs a new producer. Responses from the previous one become stale.
    pub fn replace_source(&self, source: Arc<dyn PageSource<T>>) {
        self.inner.source.replace(source);
        self.inner.state.send_modify(|state| state.generation += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<PageState<T>> {
        self.inner.state.subscribe()
    }

    /// Runs `f` against the current state without cloning it.
    pub fn inspect<R>(&self, f: impl FnOnce(&PageState<T>) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    fn start(&self, target: Target) -> FetchHandle {
        let options = self.inner.options;
        let mut ticket = None;
        self.inner.state.send_if_modified(|state| {
            if state.activity != Activity::Idle {
                return false;
            }
            let (page, append) = match target {
                Target::Page { number: 0, .. } => return false,
                Target::Page { number, append } => (number, append),
                Target::Next if state.has_more => match state.page.checked_add(1) {
                    Some(next) => (next, true),
                    None => return false,
                },
                Target::Next => return false,
            };
            state.activity = if append {
                Activity::LoadingMore
            } else {
                Activity::Loading
            };
            if options.clear_error_on_start {
                state.error = None;
            }
            if !append && page == 1 && options.refetch_resets_has_more {
                state.has_more = true;
            }
            ticket = Some(Ticket {
                page,
                append,
                generation: state.generation,
            });
            true
        });

        let Some(ticket) = ticket else {
            mq_debug!(target: TARGET_CONTROLLER, "paged load {:?} skipped", target);
            return FetchHandle::skipped();
        };

        mq_debug!(
            target: TARGET_CONTROLLER,
            "paged load page={} append={} generation={}",
            ticket.page,
            ticket.append,
            ticket.generation
        );
        let source = self.inner.source.get();
        let inner = Arc::clone(&self.inner);
        let join = self.inner.runtime.spawn(async move {
            let guard = InFlight::new(inner);
            let result = source.fetch_page(ticket.page).await;
            guard.settle(ticket, result)
        });
        FetchHandle::running(join)
    }
}

impl<T> PaginatedFetchController<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn state(&self) -> PageState<T> {
        self.inner.state.borrow().clone()
    }

    /// Waits until no request is in flight and returns that state.
    pub async fn settled(&self) -> PageState<T> {
        let mut rx = self.inner.state.subscribe();
        if let Ok(state) = rx.wait_for(|state| state.activity == Activity::Idle).await {
            return state.clone();
        }
        self.state()
    }
}

/// Releases the in-flight flag on every exit path, including a panicking
/// producer.
struct InFlight<T> {
    inner: Arc<Inner<T>>,
    armed: bool,
}

impl<T> InFlight<T> {
    fn new(inner: Arc<Inner<T>>) -> Self {
        Self { inner, armed: true }
    }

    fn settle(mut self, ticket: Ticket, result: Result<Vec<T>, FetchError>) -> LoadOutcome {
        self.armed = false;
        let discard_stale = self.inner.options.discard_stale;
        let mut outcome = LoadOutcome::Stale;
        self.inner.state.send_modify(|state| {
            state.activity = Activity::Idle;
            if discard_stale && state.generation != ticket.generation {
                return;
            }
            outcome = match result {
                Ok(items) if items.is_empty() => {
                    state.has_more = false;
                    state.error = None;
                    LoadOutcome::Exhausted
                }
                Ok(items) => {
                    let count = items.len();
                    if ticket.append {
                        state.data.extend(items);
                    } else {
                        state.data = items;
                    }
                    state.page = ticket.page;
                    state.error = None;
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
                "discarding stale page {} from generation {}",
                ticket.page,
                ticket.generation
            ),
            LoadOutcome::Failed(err) => mq_warn!(
                target: TARGET_CONTROLLER,
                "page {} failed: {}",
                ticket.page,
                err
            ),
            _ => {}
        }
        outcome
    }
}

impl<T> Drop for InFlight<T> {
    fn drop(&mut self) {
        if self.armed {
            mq_warn!(target: TARGET_CONTROLLER, "page producer ended without a result");
            self.inner
                .state
                .send_modify(|state| state.activity = Activity::Idle);
        }
    }
}

//! Debounced query-driven refetching for live search.
//!
//! Every edit installs a producer for the new query and restarts a
//! trailing-edge timer. Only the last edit inside a quiet period reaches the
//! network; an empty query resets the results instead of fetching.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use marquee_logging::{mq_debug, mq_trace, TARGET_CONTROLLER};
use tokio::task::JoinHandle;

use crate::{LoadOutcome, OnceSource, SearchAnalytics, SingleFetchController};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Builds the producer for one query.
pub type SourceFactory<T> = Arc<dyn Fn(&str) -> Arc<dyn OnceSource<T>> + Send + Sync>;

pub struct SearchCoordinator<T> {
    controller: SingleFetchController<T>,
    factory: SourceFactory<T>,
    delay: Duration,
    analytics: Option<Arc<dyn SearchAnalytics<T>>>,
    pending: Mutex<Pending>,
    query: Mutex<String>,
}

/// Timer for the latest edit and the trimmed query whose source is installed.
#[derive(Default)]
struct Pending {
    timer: Option<JoinHandle<()>>,
    installed: Option<String>,
}

impl<T> SearchCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        controller: SingleFetchController<T>,
        factory: SourceFactory<T>,
        delay: Duration,
    ) -> Self {
        Self {
            controller,
            factory,
            delay,
            analytics: None,
            pending: Mutex::new(Pending::default()),
            query: Mutex::new(String::new()),
        }
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn SearchAnalytics<T>>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn controller(&self) -> &SingleFetchController<T> {
        &self.controller
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The query text as last edited, untrimmed.
    pub fn query(&self) -> String {
        self.query
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records an edit of the query field.
    ///
    /// Edits that only change surrounding whitespace keep the current timer
    /// and any fetch already running for that query.
    pub fn query_changed(&self, text: impl Into<String>) {
        let text = text.into();
        let trimmed = text.trim().to_string();
        *self.query.lock().unwrap_or_else(PoisonError::into_inner) = text;

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.installed.as_deref() == Some(trimmed.as_str()) {
            mq_trace!(target: TARGET_CONTROLLER, "search query unchanged");
            return;
        }
        if let Some(previous) = pending.timer.take() {
            mq_trace!(target: TARGET_CONTROLLER, "debounce restarted");
            previous.abort();
        }

        self.controller.replace_source((self.factory)(&trimmed));
        pending.installed = Some(trimmed.clone());

        let controller = self.controller.clone();
        let analytics = self.analytics.clone();
        let delay = self.delay;
        let task = self.controller.runtime().spawn(async move {
            tokio::time::sleep(delay).await;
            if trimmed.is_empty() {
                mq_debug!(target: TARGET_CONTROLLER, "search cleared; resetting results");
                controller.reset();
                return;
            }
            mq_debug!(target: TARGET_CONTROLLER, "search firing for {:?}", trimmed);
            let outcome = controller.refetch().await;
            if !matches!(outcome, LoadOutcome::Loaded { items } if items > 0) {
                return;
            }
            if let Some(analytics) = analytics {
                let first = controller.inspect(|state| {
                    state.data().and_then(|items| items.first()).cloned()
                });
                if let Some(first) = first {
                    analytics.record_search(&trimmed, &first);
                }
            }
        });
        pending.timer = Some(task);
    }

    /// Cancels a pending timer. A fetch that already started still completes.
    pub fn shutdown(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.installed = None;
        if let Some(task) = pending.timer.take() {
            task.abort();
        }
    }
}

impl<T> Drop for SearchCoordinator<T> {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = pending.timer.take() {
            task.abort();
        }
    }
}

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::{FailureKind, FetchError};

/// How a single producer call ended, as seen by whoever awaited it.
///
/// The same information is also reflected in the controller state; callers
/// that only render state can ignore the outcome entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// `items` elements were merged into the controller's data.
    Loaded { items: usize },
    /// The producer returned an empty page; `has_more` is now false.
    Exhausted,
    /// The producer failed; the error is stored in the state as well.
    Failed(FetchError),
    /// The call was dropped by the re-entrancy guard or `has_more` gate.
    Skipped,
    /// The response arrived after a reset or source change and was discarded.
    Stale,
}

enum HandleState {
    Ready(Option<LoadOutcome>),
    Running(JoinHandle<LoadOutcome>),
}

/// Awaitable handle for a fetch started by a controller.
///
/// The fetch is already running when the handle is returned. Dropping the
/// handle detaches from it; the request still completes and updates state.
#[must_use = "the fetch runs regardless; await the handle to observe its outcome"]
pub struct FetchHandle {
    state: HandleState,
}

impl FetchHandle {
    pub(crate) fn skipped() -> Self {
        Self {
            state: HandleState::Ready(Some(LoadOutcome::Skipped)),
        }
    }

    pub(crate) fn running(join: JoinHandle<LoadOutcome>) -> Self {
        Self {
            state: HandleState::Running(join),
        }
    }

    /// True when the guard rejected the call and no producer call was made.
    pub fn is_skipped(&self) -> bool {
        matches!(
            self.state,
            HandleState::Ready(Some(LoadOutcome::Skipped))
        )
    }
}

impl Future for FetchHandle {
    type Output = LoadOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<LoadOutcome> {
        match &mut self.get_mut().state {
            HandleState::Ready(outcome) => {
                Poll::Ready(outcome.take().unwrap_or(LoadOutcome::Skipped))
            }
            HandleState::Running(join) => Pin::new(join).poll(cx).map(|joined| {
                joined.unwrap_or_else(|err| {
                    LoadOutcome::Failed(FetchError::new(FailureKind::Aborted, err.to_string()))
                })
            }),
        }
    }
}

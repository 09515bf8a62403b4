//! Marquee core: fetch controllers for remote list data.
//!
//! [`SingleFetchController`] caches one result set, [`PaginatedFetchController`]
//! accumulates pages behind a single-request guard, and [`SearchCoordinator`]
//! debounces query edits into refetches. None of them perform IO themselves;
//! producers are supplied through [`PageSource`] and [`OnceSource`].
mod analytics;
mod error;
mod handle;
mod paged;
mod search;
mod single;
mod source;

pub use analytics::SearchAnalytics;
pub use error::{ControllerError, FailureKind, FetchError};
pub use handle::{FetchHandle, LoadOutcome};
pub use paged::{Activity, PageState, PagedOptions, PaginatedFetchController};
pub use search::{SearchCoordinator, SourceFactory, DEFAULT_DEBOUNCE};
pub use single::{FetchOptions, FetchState, SingleFetchController};
pub use source::{once_fn, page_fn, OnceFn, OnceSource, PageFn, PageSource};

//! Producer traits: the seam between the controllers and whatever performs
//! the network round trip.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use crate::FetchError;

/// Fetches one page of items. An empty page signals end of data.
#[async_trait::async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(&self, page: u32) -> Result<Vec<T>, FetchError>;
}

/// Fetches one complete result set.
#[async_trait::async_trait]
pub trait OnceSource<T>: Send + Sync {
    async fn fetch(&self) -> Result<Vec<T>, FetchError>;
}

/// Adapter returned by [`page_fn`].
pub struct PageFn<F, T> {
    f: F,
    _item: PhantomData<fn() -> T>,
}

/// Wraps an async closure taking a page number into a [`PageSource`].
///
/// ```ignore
/// let source = page_fn(move |page| {
///     let client = client.clone();
///     async move { client.fetch_movies("", page).await }
/// });
/// ```
pub fn page_fn<F, Fut, T>(f: F) -> PageFn<F, T>
where
    F: Fn(u32) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>, FetchError>> + Send,
{
    PageFn {
        f,
        _item: PhantomData,
    }
}

#[async_trait::async_trait]
impl<F, Fut, T> PageSource<T> for PageFn<F, T>
where
    F: Fn(u32) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>, FetchError>> + Send,
    T: Send,
{
    async fn fetch_page(&self, page: u32) -> Result<Vec<T>, FetchError> {
        (self.f)(page).await
    }
}

/// Adapter returned by [`once_fn`].
pub struct OnceFn<F, T> {
    f: F,
    _item: PhantomData<fn() -> T>,
}

/// Wraps an async closure into a [`OnceSource`].
pub fn once_fn<F, Fut, T>(f: F) -> OnceFn<F, T>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>, FetchError>> + Send,
{
    OnceFn {
        f,
        _item: PhantomData,
    }
}

#[async_trait::async_trait]
impl<F, Fut, T> OnceSource<T> for OnceFn<F, T>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>, FetchError>> + Send,
    T: Send,
{
    async fn fetch(&self) -> Result<Vec<T>, FetchError> {
        (self.f)().await
    }
}

/// Replaceable producer shared by a controller and its in-flight tasks.
pub(crate) struct SourceSlot<S: ?Sized> {
    current: Mutex<Arc<S>>,
}

impl<S: ?Sized> SourceSlot<S> {
    pub(crate) fn new(source: Arc<S>) -> Self {
        Self {
            current: Mutex::new(source),
        }
    }

    pub(crate) fn get(&self) -> Arc<S> {
        let guard = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub(crate) fn replace(&self, source: Arc<S>) {
        let mut guard = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = source;
    }
}

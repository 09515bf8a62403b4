//! Producers that plug [`MovieClient`] into the fetch controllers.

use std::sync::Arc;

use marquee_core::{FetchError, OnceSource, PageSource};

use crate::{Movie, MovieClient};

/// Browse listing ordered by popularity.
#[derive(Clone)]
pub struct DiscoverPages {
    client: Arc<MovieClient>,
}

impl DiscoverPages {
    pub fn new(client: Arc<MovieClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl PageSource<Movie> for DiscoverPages {
    async fn fetch_page(&self, page: u32) -> Result<Vec<Movie>, FetchError> {
        self.client.fetch_movies("", page).await
    }
}

/// Paginated title search for a fixed query.
#[derive(Clone)]
pub struct SearchPages {
    client: Arc<MovieClient>,
    query: String,
}

impl SearchPages {
    pub fn new(client: Arc<MovieClient>, query: impl Into<String>) -> Self {
        Self {
            client,
            query: query.into(),
        }
    }
}

#[async_trait::async_trait]
impl PageSource<Movie> for SearchPages {
    async fn fetch_page(&self, page: u32) -> Result<Vec<Movie>, FetchError> {
        self.client.fetch_movies(&self.query, page).await
    }
}

/// First page of a title search, used for live search results.
#[derive(Clone)]
pub struct SearchOnce {
    client: Arc<MovieClient>,
    query: String,
}

impl SearchOnce {
    pub fn new(client: Arc<MovieClient>, query: impl Into<String>) -> Self {
        Self {
            client,
            query: query.into(),
        }
    }
}

#[async_trait::async_trait]
impl OnceSource<Movie> for SearchOnce {
    async fn fetch(&self) -> Result<Vec<Movie>, FetchError> {
        self.client.fetch_movies(&self.query, 1).await
    }
}

/// Source factory for a [`marquee_core::SearchCoordinator`].
pub fn search_factory(client: Arc<MovieClient>) -> marquee_core::SourceFactory<Movie> {
    Arc::new(move |query: &str| {
        Arc::new(SearchOnce::new(client.clone(), query)) as Arc<dyn OnceSource<Movie>>
    })
}

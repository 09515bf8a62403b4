use std::time::Duration;

use marquee_core::{FailureKind, FetchError};
use marquee_logging::{mq_debug, mq_warn, TARGET_API};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::types::MoviePage;
use crate::{Movie, MovieDetails, MovieId};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Connection settings for the movie catalogue, passed in explicitly by the
/// front end.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiConfigError {
    #[error("invalid base url {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("base url {0:?} cannot carry a path")]
    OpaqueBaseUrl(String),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP client for the discover, search and details endpoints.
#[derive(Debug, Clone)]
pub struct MovieClient {
    base: Url,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl MovieClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiConfigError> {
        let trimmed = config.base_url.trim_end_matches('/');
        let base = Url::parse(trimmed).map_err(|source| ApiConfigError::InvalidBaseUrl {
            url: config.base_url.clone(),
            source,
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiConfigError::OpaqueBaseUrl(config.base_url));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            base,
            api_key: config.api_key.filter(|key| !key.trim().is_empty()),
            http,
        })
    }

    /// Fetches one listing page. A blank query browses by popularity;
    /// anything else searches by title.
    pub async fn fetch_movies(&self, query: &str, page: u32) -> Result<Vec<Movie>, FetchError> {
        let url = self.movies_url(query, page);
        let listing: MoviePage = self.get_json(url).await?;
        Ok(listing.results)
    }

    pub async fn fetch_movie_details(&self, id: MovieId) -> Result<MovieDetails, FetchError> {
        let url = self.endpoint(&["movie", &id.to_string()]);
        self.get_json(url).await
    }

    fn movies_url(&self, query: &str, page: u32) -> Url {
        let query = query.trim();
        let page = page.to_string();
        if query.is_empty() {
            let mut url = self.endpoint(&["discover", "movie"]);
            url.query_pairs_mut()
                .append_pair("sort_by", "popularity.desc")
                .append_pair("page", &page);
            url
        } else {
            let mut url = self.endpoint(&["search", "movie"]);
            url.query_pairs_mut()
                .append_pair("query", query)
                .append_pair("page", &page);
            url
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` rejected cannot-be-a-base urls, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<R: DeserializeOwned>(&self, url: Url) -> Result<R, FetchError> {
        mq_debug!(target: TARGET_API, "GET {}", url);
        let mut request = self.http.get(url.clone()).header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            mq_warn!(target: TARGET_API, "GET {} answered {}", url.path(), status);
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("request to {} failed with {}", url.path(), status),
            ));
        }

        response.json::<R>().await.map_err(map_reqwest_error)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Decode, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidUrl, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

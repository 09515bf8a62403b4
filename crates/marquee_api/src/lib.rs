//! Marquee API: the HTTP page-fetcher for the movie catalogue.
mod client;
mod sources;
mod types;

pub use client::{ApiConfig, ApiConfigError, MovieClient, DEFAULT_BASE_URL};
pub use sources::{search_factory, DiscoverPages, SearchOnce, SearchPages};
pub use types::{Genre, Movie, MovieDetails, MovieId, ProductionCompany, SpokenLanguage};

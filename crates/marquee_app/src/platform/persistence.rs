//! Trending searches: which movie topped the results for each search term,
//! and how often that term was searched. Persisted as RON next to the app.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use marquee_api::{Movie, MovieId};
use marquee_core::{FetchError, OnceSource, SearchAnalytics};
use marquee_logging::{mq_error, mq_info, mq_warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

const STATE_FILENAME: &str = ".marquee_trending.ron";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state directory missing or not writable: {0}")]
    StateDir(String),
    #[error("failed to serialize trending searches: {0}")]
    Serialize(#[from] ron::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingMovie {
    pub search_term: String,
    pub movie_id: MovieId,
    pub title: String,
    pub poster_path: Option<String>,
    pub count: u32,
    /// RFC 3339 timestamp of the latest search for this term.
    pub last_searched: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedState {
    searches: Vec<TrendingMovie>,
}

pub struct TrendingStore {
    dir: PathBuf,
    limit: usize,
    state: Mutex<PersistedState>,
}

impl TrendingStore {
    /// Opens the store in `dir`. Unreadable state starts empty.
    pub fn open(dir: PathBuf, limit: usize) -> Self {
        let state = load_state(&dir);
        Self {
            dir,
            limit,
            state: Mutex::new(state),
        }
    }

    /// Counts one search for `query` whose first result was `movie`.
    pub fn record(&self, query: &str, movie: &Movie) -> Result<(), StoreError> {
        let term = normalize_term(query);
        if term.is_empty() {
            return Ok(());
        }
        let now = Utc::now().to_rfc3339();
        let snapshot = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match state
                .searches
                .iter_mut()
                .find(|entry| entry.search_term == term)
            {
                Some(entry) => {
                    entry.count += 1;
                    entry.movie_id = movie.id;
                    entry.title = movie.title.clone();
                    entry.poster_path = movie.poster_path.clone();
                    entry.last_searched = now;
                }
                None => state.searches.push(TrendingMovie {
                    search_term: term,
                    movie_id: movie.id,
                    title: movie.title.clone(),
                    poster_path: movie.poster_path.clone(),
                    count: 1,
                    last_searched: now,
                }),
            }
            state.clone()
        };
        save_state(&self.dir, &snapshot)
    }

    /// Most searched terms first; ties go to the most recent search.
    pub fn top(&self, limit: usize) -> Vec<TrendingMovie> {
        let mut searches = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .searches
            .clone();
        searches.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| b.last_searched.cmp(&a.last_searched))
        });
        searches.truncate(limit);
        searches
    }
}

impl SearchAnalytics<Movie> for TrendingStore {
    fn record_search(&self, query: &str, first: &Movie) {
        if let Err(err) = self.record(query, first) {
            mq_error!("Failed to record search {:?}: {}", query, err);
        }
    }
}

#[async_trait::async_trait]
impl OnceSource<TrendingMovie> for TrendingStore {
    async fn fetch(&self) -> Result<Vec<TrendingMovie>, FetchError> {
        Ok(self.top(self.limit))
    }
}

fn normalize_term(query: &str) -> String {
    query.trim().to_lowercase()
}

fn load_state(dir: &Path) -> PersistedState {
    let path = dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return PersistedState::default();
        }
        Err(err) => {
            mq_warn!("Failed to read trending searches from {:?}: {}", path, err);
            return PersistedState::default();
        }
    };

    match ron::from_str(&content) {
        Ok(state) => {
            mq_info!("Loaded trending searches from {:?}", path);
            state
        }
        Err(err) => {
            mq_warn!("Failed to parse trending searches from {:?}: {}", path, err);
            PersistedState::default()
        }
    }
}

fn save_state(dir: &Path, state: &PersistedState) -> Result<(), StoreError> {
    let content = ron::ser::to_string_pretty(state, ron::ser::PrettyConfig::new())?;
    write_atomically(dir, STATE_FILENAME, &content)?;
    Ok(())
}

/// Writes `{dir}/{filename}` through a temp file and a rename.
fn write_atomically(dir: &Path, filename: &str, content: &str) -> Result<PathBuf, StoreError> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| StoreError::StateDir(e.to_string()))?;
    } else if !dir.is_dir() {
        return Err(StoreError::StateDir(format!("{:?} is not a directory", dir)));
    }

    let target = dir.join(filename);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(&target).map_err(|e| StoreError::Io(e.error))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn movie(id: MovieId, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            overview: String::new(),
            poster_path: Some(format!("/{id}.jpg")),
            backdrop_path: None,
            release_date: None,
            vote_average: 0.0,
            vote_count: 0,
            popularity: 0.0,
            genre_ids: Vec::new(),
            original_language: "en".to_string(),
            adult: false,
        }
    }

    #[test]
    fn counts_searches_per_term_and_ranks_them() {
        let temp = TempDir::new().unwrap();
        let store = TrendingStore::open(temp.path().to_path_buf(), 5);

        store.record("Batman", &movie(268, "Batman")).unwrap();
        store.record("  batman ", &movie(268, "Batman")).unwrap();
        store.record("alien", &movie(348, "Alien")).unwrap();

        let top = store.top(5);
        let ranked: Vec<_> = top
            .iter()
            .map(|entry| (entry.search_term.as_str(), entry.count))
            .collect();
        assert_eq!(ranked, vec![("batman", 2), ("alien", 1)]);
        assert_eq!(store.top(1).len(), 1);
    }

    #[test]
    fn blank_terms_are_ignored() {
        let temp = TempDir::new().unwrap();
        let store = TrendingStore::open(temp.path().to_path_buf(), 5);
        store.record("   ", &movie(1, "Nothing")).unwrap();
        assert!(store.top(5).is_empty());
        assert!(!temp.path().join(STATE_FILENAME).exists());
    }

    #[test]
    fn searches_survive_reopening() {
        let temp = TempDir::new().unwrap();
        {
            let store = TrendingStore::open(temp.path().to_path_buf(), 5);
            store.record_search("dune", &movie(438631, "Dune"));
        }

        let reopened = TrendingStore::open(temp.path().to_path_buf(), 5);
        let top = reopened.top(5);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].movie_id, 438631);
        assert_eq!(top[0].poster_path.as_deref(), Some("/438631.jpg"));
    }

    #[test]
    fn corrupt_state_starts_empty() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(STATE_FILENAME), "not ron at all (").unwrap();
        let store = TrendingStore::open(temp.path().to_path_buf(), 5);
        assert!(store.top(5).is_empty());
    }

    #[test]
    fn state_dir_that_is_a_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("not_a_dir");
        fs::write(&file_path, "x").unwrap();

        let store = TrendingStore::open(file_path.clone(), 5);
        let result = store.record("dune", &movie(1, "Dune"));
        assert!(matches!(result, Err(StoreError::StateDir(_))));
    }

    #[tokio::test]
    async fn serves_the_top_entries_as_a_source() {
        let temp = TempDir::new().unwrap();
        let store = TrendingStore::open(temp.path().to_path_buf(), 1);
        store.record("dune", &movie(1, "Dune")).unwrap();
        store.record("alien", &movie(2, "Alien")).unwrap();
        store.record("alien", &movie(2, "Alien")).unwrap();

        let listed = store.fetch().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Alien");
    }
}

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::init_logging;
use marquee_core::{
    once_fn, FetchError, FetchOptions, OnceSource, SearchAnalytics, SearchCoordinator,
    SingleFetchController, SourceFactory,
};
use pretty_assertions::assert_eq;

const DELAY: Duration = Duration::from_millis(40);

/// Queries that actually reached the producer, in order.
type FetchLog = Arc<Mutex<Vec<String>>>;

fn catalogue(log: FetchLog) -> SourceFactory<String> {
    Arc::new(move |query: &str| {
        let query = query.to_string();
        let log = log.clone();
        let source = once_fn(move || {
            let query = query.clone();
            let log = log.clone();
            async move {
                log.lock().unwrap().push(query.clone());
                if query == "slow" {
                    tokio::time::sleep(DELAY * 8).await;
                }
                if query == "nothing" {
                    return Ok(Vec::new());
                }
                Ok::<_, FetchError>(vec![format!("{query}-1"), format!("{query}-2")])
            }
        });
        Arc::new(source) as Arc<dyn OnceSource<String>>
    })
}

fn coordinator(log: FetchLog) -> SearchCoordinator<String> {
    let idle = once_fn(|| async { Ok::<Vec<String>, FetchError>(Vec::new()) });
    let options = FetchOptions {
        auto_fetch: false,
        ..FetchOptions::default()
    };
    let controller = SingleFetchController::new(idle, options).unwrap();
    SearchCoordinator::new(controller, catalogue(log), DELAY)
}

async fn quiet_period() {
    tokio::time::sleep(DELAY * 3).await;
}

#[derive(Default)]
struct RecordingAnalytics {
    seen: Mutex<Vec<(String, String)>>,
}

impl SearchAnalytics<String> for RecordingAnalytics {
    fn record_search(&self, query: &str, first: &String) {
        self.seen
            .lock()
            .unwrap()
            .push((query.to_string(), first.clone()));
    }
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_collapse_into_one_fetch() {
    init_logging();
    let log = FetchLog::default();
    let search = coordinator(log.clone());

    search.query_changed("b");
    search.query_changed("ba");
    search.query_changed("bat");
    tokio::time::sleep(search.delay() / 2).await;
    assert!(log.lock().unwrap().is_empty());

    quiet_period().await;
    let state = search.controller().settled().await;

    assert_eq!(*log.lock().unwrap(), vec!["bat".to_string()]);
    assert_eq!(
        state.data(),
        Some(&["bat-1".to_string(), "bat-2".to_string()][..])
    );
    assert_eq!(search.query(), "bat");
}

#[tokio::test(start_paused = true)]
async fn clearing_the_query_resets_without_fetching() {
    init_logging();
    let log = FetchLog::default();
    let search = coordinator(log.clone());

    search.query_changed("bat");
    quiet_period().await;
    search.controller().settled().await;
    assert!(search.controller().state().data().is_some());

    search.query_changed("   ");
    quiet_period().await;

    assert_eq!(search.controller().state().data(), None);
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_coordinator_cancels_the_timer() {
    init_logging();
    let log = FetchLog::default();
    let search = coordinator(log.clone());
    let controller = search.controller().clone();

    search.query_changed("bat");
    drop(search);
    quiet_period().await;

    assert!(log.lock().unwrap().is_empty());
    assert_eq!(controller.state().data(), None);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_the_timer() {
    init_logging();
    let log = FetchLog::default();
    let search = coordinator(log.clone());

    search.query_changed("bat");
    search.shutdown();
    quiet_period().await;

    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn analytics_sees_each_settled_non_empty_search_once() {
    init_logging();
    let log = FetchLog::default();
    let analytics = Arc::new(RecordingAnalytics::default());
    let search = coordinator(log.clone()).with_analytics(analytics.clone());

    search.query_changed("  bat ");
    quiet_period().await;
    search.query_changed("nothing");
    quiet_period().await;
    search.query_changed("");
    quiet_period().await;
    search.query_changed("cat");
    quiet_period().await;

    assert_eq!(
        *analytics.seen.lock().unwrap(),
        vec![
            ("bat".to_string(), "bat-1".to_string()),
            ("cat".to_string(), "cat-1".to_string()),
        ]
    );
    assert_eq!(*log.lock().unwrap(), vec!["bat", "nothing", "cat"]);
}

#[tokio::test(start_paused = true)]
async fn slow_response_for_a_superseded_query_is_discarded() {
    init_logging();
    let log = FetchLog::default();
    let search = coordinator(log.clone());

    search.query_changed("slow");
    tokio::time::sleep(DELAY * 2).await;
    assert!(search.controller().state().loading());

    search.query_changed("fast");
    quiet_period().await;
    let state = search.controller().state();
    assert_eq!(
        state.data(),
        Some(&["fast-1".to_string(), "fast-2".to_string()][..])
    );

    // Let the slow request land; it must not overwrite the newer results.
    tokio::time::sleep(DELAY * 8).await;
    let state = search.controller().state();
    assert_eq!(
        state.data(),
        Some(&["fast-1".to_string(), "fast-2".to_string()][..])
    );
    assert!(!state.loading());
    assert_eq!(*log.lock().unwrap(), vec!["slow", "fast"]);
}

#[tokio::test(start_paused = true)]
async fn whitespace_only_edit_keeps_the_running_fetch() {
    init_logging();
    let log = FetchLog::default();
    let search = coordinator(log.clone());

    search.query_changed("slow");
    tokio::time::sleep(DELAY * 2).await;
    assert!(search.controller().state().loading());

    search.query_changed("slow ");
    assert_eq!(search.query(), "slow ");
    tokio::time::sleep(DELAY * 8).await;

    let state = search.controller().state();
    assert_eq!(
        state.data(),
        Some(&["slow-1".to_string(), "slow-2".to_string()][..])
    );
    assert!(!state.loading());
    assert_eq!(*log.lock().unwrap(), vec!["slow"]);
}

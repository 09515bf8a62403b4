use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use marquee_api::{search_factory, DiscoverPages, MovieClient, MovieId, SearchOnce};
use marquee_core::{
    FetchOptions, PagedOptions, PaginatedFetchController, SearchCoordinator,
    SingleFetchController,
};
use marquee_logging::{mq_info, mq_warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::config::{AppConfig, API_KEY_ENV, DEFAULT_CONFIG_PATH};
use super::logging;
use super::persistence::TrendingStore;
use super::render;

const HELP: &[&str] = &[
    "Commands:",
    "  more          load the next page of latest movies",
    "  refresh       reload the first page",
    "  reset         clear the list",
    "  trending      reload trending searches",
    "  details <id>  show one movie",
    "  /<text>       search as you type; `/` alone clears the search",
    "  help | quit",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    More,
    Refresh,
    Reset,
    Trending,
    Details(MovieId),
    Search(String),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    if let Some(query) = line.trim_start().strip_prefix('/') {
        return Ok(Command::Search(query.to_string()));
    }
    let mut words = line.split_whitespace();
    let command = match words.next() {
        Some("more") => Command::More,
        Some("refresh") => Command::Refresh,
        Some("reset") => Command::Reset,
        Some("trending") => Command::Trending,
        Some("details") => {
            let id = words.next().ok_or("usage: details <id>")?;
            let id = id
                .parse()
                .map_err(|_| format!("not a movie id: {id:?}"))?;
            Command::Details(id)
        }
        Some("help") => Command::Help,
        Some("quit") | Some("exit") => Command::Quit,
        Some(other) => return Err(format!("unknown command {other:?}; try `help`")),
        None => Command::Help,
    };
    Ok(command)
}

struct Screen {
    client: Arc<MovieClient>,
    browse: PaginatedFetchController<marquee_api::Movie>,
    trending: SingleFetchController<super::persistence::TrendingMovie>,
    search: Arc<SearchCoordinator<marquee_api::Movie>>,
    watchers: Vec<JoinHandle<()>>,
}

impl Screen {
    fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let client = Arc::new(
            MovieClient::new(config.api_config()).context("invalid api configuration")?,
        );
        let store = Arc::new(TrendingStore::open(
            config.state_dir.clone(),
            config.trending_limit,
        ));

        let browse = PaginatedFetchController::new(
            DiscoverPages::new(client.clone()),
            PagedOptions::default(),
        )?;
        let trending = SingleFetchController::with_source(store.clone(), FetchOptions::default())?;
        let results = SingleFetchController::new(
            SearchOnce::new(client.clone(), ""),
            FetchOptions {
                auto_fetch: false,
                ..FetchOptions::default()
            },
        )?;
        let search = Arc::new(
            SearchCoordinator::new(results, search_factory(client.clone()), config.debounce())
                .with_analytics(store),
        );

        let mut screen = Self {
            client,
            browse,
            trending,
            search,
            watchers: Vec::new(),
        };
        screen.spawn_watchers();
        Ok(screen)
    }

    fn spawn_watchers(&mut self) {
        self.watchers.push(print_on_change(
            "Trending",
            self.trending.subscribe(),
            render::render_trending,
        ));
        self.watchers.push(print_on_change(
            "Latest",
            self.browse.subscribe(),
            render::render_browse,
        ));
        let search = self.search.clone();
        self.watchers.push(print_on_change(
            "Search",
            self.search.controller().subscribe(),
            move |state| render::render_search(&search.query(), state),
        ));
    }

    fn dispatch(&self, command: Command) {
        match command {
            Command::More => {
                if self.browse.load_more().is_skipped() {
                    println!("(nothing to load: a request is running or the list is complete)");
                }
            }
            Command::Refresh => {
                if self.browse.refetch().is_skipped() {
                    println!("(a request is already running)");
                }
            }
            Command::Reset => self.browse.reset(),
            Command::Trending => drop(self.trending.refetch()),
            Command::Details(id) => {
                let client = self.client.clone();
                tokio::spawn(async move {
                    let lines = match client.fetch_movie_details(id).await {
                        Ok(details) => render::render_details(&details),
                        Err(err) => {
                            mq_warn!("Details for {} failed: {}", id, err);
                            vec![format!("Error: {err}")]
                        }
                    };
                    print_block("Details", &lines);
                });
            }
            Command::Search(text) => self.search.query_changed(text),
            Command::Help => print_block("Help", HELP),
            Command::Quit => {}
        }
    }

    fn shutdown(self) {
        self.search.shutdown();
        for watcher in self.watchers {
            watcher.abort();
        }
    }
}

/// Prints the rendered state each time it changes, skipping repeats.
fn print_on_change<S, F>(
    title: &'static str,
    mut rx: watch::Receiver<S>,
    render: F,
) -> JoinHandle<()>
where
    S: Send + Sync + 'static,
    F: Fn(&S) -> Vec<String> + Send + 'static,
{
    tokio::spawn(async move {
        let mut last = Vec::new();
        loop {
            let lines = render(&rx.borrow_and_update());
            if lines != last {
                print_block(title, &lines);
                last = lines;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
}

fn print_block<L: AsRef<str>>(title: &str, lines: &[L]) {
    println!("== {title} ==");
    for line in lines {
        println!("{}", line.as_ref());
    }
}

pub async fn run_app() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = AppConfig::load(&config_path)?
        .with_fallback_api_key(std::env::var(API_KEY_ENV).ok());
    logging::initialize(config.log, config.verbose);
    mq_info!("Starting marquee with config {:?}", config_path);
    if config.api.api_key.is_none() {
        mq_warn!("No API key configured; set {} or api.api_key", API_KEY_ENV);
    }

    let screen = Screen::new(&config)?;
    print_block("Help", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => screen.dispatch(command),
            Err(message) => println!("{message}"),
        }
    }

    mq_info!("Shutting down");
    screen.shutdown();
    Ok(())
}

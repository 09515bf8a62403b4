#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use marquee_core::{FailureKind, FetchError, OnceSource, PageSource};
use tokio::sync::Semaphore;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(marquee_logging::initialize_for_tests);
}

/// Holds producer calls until the test lets them through.
pub struct Gate {
    permits: Semaphore,
}

impl Gate {
    pub fn closed() -> Arc<Self> {
        Arc::new(Self {
            permits: Semaphore::new(0),
        })
    }

    pub fn open_one(&self) {
        self.permits.add_permits(1);
    }

    async fn pass(&self) {
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

pub fn server_error() -> FetchError {
    FetchError::new(FailureKind::HttpStatus(500), "boom")
}

/// Page producer backed by a fixed list of pages. Pages past the end are empty.
#[derive(Clone)]
pub struct Pages {
    inner: Arc<PagesInner>,
}

struct PagesInner {
    pages: Vec<Vec<&'static str>>,
    calls: Mutex<Vec<u32>>,
    failing: Mutex<HashSet<u32>>,
    gate: Option<Arc<Gate>>,
}

impl Pages {
    pub fn new(pages: Vec<Vec<&'static str>>) -> Self {
        Self::build(pages, None)
    }

    pub fn gated(pages: Vec<Vec<&'static str>>, gate: Arc<Gate>) -> Self {
        Self::build(pages, Some(gate))
    }

    fn build(pages: Vec<Vec<&'static str>>, gate: Option<Arc<Gate>>) -> Self {
        Self {
            inner: Arc::new(PagesInner {
                pages,
                calls: Mutex::new(Vec::new()),
                failing: Mutex::new(HashSet::new()),
                gate,
            }),
        }
    }

    pub fn fail_page(&self, page: u32) {
        self.inner.failing.lock().unwrap().insert(page);
    }

    pub fn heal_page(&self, page: u32) {
        self.inner.failing.lock().unwrap().remove(&page);
    }

    pub fn calls(&self) -> Vec<u32> {
        self.inner.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PageSource<&'static str> for Pages {
    async fn fetch_page(&self, page: u32) -> Result<Vec<&'static str>, FetchError> {
        self.inner.calls.lock().unwrap().push(page);
        if let Some(gate) = &self.inner.gate {
            gate.pass().await;
        }
        if self.inner.failing.lock().unwrap().contains(&page) {
            return Err(server_error());
        }
        let index = page.saturating_sub(1) as usize;
        Ok(self.inner.pages.get(index).cloned().unwrap_or_default())
    }
}

/// Single-shot producer answering from a queue of scripted responses.
#[derive(Clone)]
pub struct Answers {
    inner: Arc<AnswersInner>,
}

struct AnswersInner {
    responses: Mutex<VecDeque<Result<Vec<&'static str>, FetchError>>>,
    calls: AtomicUsize,
    gate: Option<Arc<Gate>>,
}

impl Answers {
    pub fn new(responses: Vec<Result<Vec<&'static str>, FetchError>>) -> Self {
        Self::build(responses, None)
    }

    pub fn gated(responses: Vec<Result<Vec<&'static str>, FetchError>>, gate: Arc<Gate>) -> Self {
        Self::build(responses, Some(gate))
    }

    fn build(
        responses: Vec<Result<Vec<&'static str>, FetchError>>,
        gate: Option<Arc<Gate>>,
    ) -> Self {
        Self {
            inner: Arc::new(AnswersInner {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                gate,
            }),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl OnceSource<&'static str> for Answers {
    async fn fetch(&self) -> Result<Vec<&'static str>, FetchError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .inner
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        if let Some(gate) = &self.inner.gate {
            gate.pass().await;
        }
        response
    }
}

//! Search backend whose cursors replay a per-query script of pages and errors.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use batchsearch_core::models::SearchHit;
use batchsearch_core::search::{SearchBackend, SearchCursor, SearchError, SearchRequest};
use batchsearch_core::CancelFlag;

use super::builders::hits;

/// One step of a query script
pub enum Step {
    Page(Vec<SearchHit>),
    Fail(SearchError),
    Panic(&'static str),
}

#[derive(Default)]
pub struct BackendStats {
    pub searches: Mutex<Vec<SearchRequest>>,
    pub pages_served: AtomicUsize,
    pub cursors_cleared: AtomicUsize,
    pub closed: AtomicBool,
}

impl BackendStats {
    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::SeqCst)
    }

    pub fn searched_queries(&self) -> Vec<String> {
        self.searches.lock().iter().map(|r| r.query.clone()).collect()
    }
}

#[derive(Default)]
pub struct ScriptedSearchBackend {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    search_failures: Mutex<HashMap<String, SearchError>>,
    page_delay: Duration,
    cancel_at_page: Option<(usize, CancelFlag)>,
    pub stats: Arc<BackendStats>,
}

impl ScriptedSearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` pages of `size` hits for `query`
    pub fn with_pages(self, query: &str, count: usize, size: usize) -> Self {
        for page in 0..count {
            self.push(query, Step::Page(hits(&format!("{query}-p{page}"), size)));
        }
        self
    }

    pub fn with_step(self, query: &str, step: Step) -> Self {
        self.push(query, step);
        self
    }

    /// Opening a search for `query` fails with `error`
    pub fn with_search_failure(self, query: &str, error: SearchError) -> Self {
        self.search_failures.lock().insert(query.to_string(), error);
        self
    }

    /// Every page takes `delay` to arrive
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Set `flag` while serving the `page`-th non-empty page (1-based, all queries)
    pub fn cancel_at_page(mut self, page: usize, flag: CancelFlag) -> Self {
        self.cancel_at_page = Some((page, flag));
        self
    }

    fn push(&self, query: &str, step: Step) {
        self.scripts
            .lock()
            .entry(query.to_string())
            .or_default()
            .push_back(step);
    }
}

#[async_trait]
impl SearchBackend for ScriptedSearchBackend {
    async fn search(
        &self,
        _project: &str,
        request: &SearchRequest,
    ) -> Result<Box<dyn SearchCursor>, SearchError> {
        if self.stats.closed.load(Ordering::SeqCst) {
            return Err(SearchError::Closed);
        }
        self.stats.searches.lock().push(request.clone());
        if let Some(error) = self.search_failures.lock().remove(&request.query) {
            return Err(error);
        }
        let steps = self
            .scripts
            .lock()
            .remove(&request.query)
            .unwrap_or_default();
        Ok(Box::new(ScriptedCursor {
            steps,
            delay: self.page_delay,
            cancel_at_page: self.cancel_at_page.clone(),
            stats: self.stats.clone(),
        }))
    }

    async fn close(&self) -> Result<(), SearchError> {
        self.stats.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedCursor {
    steps: VecDeque<Step>,
    delay: Duration,
    cancel_at_page: Option<(usize, CancelFlag)>,
    stats: Arc<BackendStats>,
}

#[async_trait]
impl SearchCursor for ScriptedCursor {
    async fn next_page(&mut self) -> Result<Vec<SearchHit>, SearchError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.steps.pop_front() {
            Some(Step::Page(page)) => {
                if !page.is_empty() {
                    let served = self.stats.pages_served.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some((at, flag)) = &self.cancel_at_page {
                        if served == *at {
                            flag.cancel();
                        }
                    }
                }
                Ok(page)
            }
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Panic(message)) => panic!("{}", message),
            None => Ok(Vec::new()),
        }
    }

    async fn clear(&mut self) -> Result<(), SearchError> {
        self.stats.cursors_cleared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

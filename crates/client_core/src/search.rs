//! Fund search controller backing the structured search surface.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::{
    domain::{FundRecord, SearchType},
    protocol::{FundSearchRequest, FundSearchResponse},
};
use tracing::{debug, info, warn};

use crate::{error::TransportError, transport::FundsBackend};

const EMPTY_QUERY_NOTICE: &str = "Please enter a fund name to search";
const NOT_FOUND_NOTICE: &str = "No funds found matching your search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Failure,
}

/// Transient feedback for the last search, shown once and then dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    fn failure(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Failure,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSnapshot {
    pub query: String,
    pub search_type: SearchType,
    pub results: Vec<FundRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub has_searched: bool,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Rejected,
    Found(usize),
    NotFound,
    Failed(String),
    Discarded,
}

#[derive(Default)]
struct SearchState {
    query: String,
    search_type: SearchType,
    results: Vec<FundRecord>,
    error: Option<String>,
    has_searched: bool,
    notice: Option<Notice>,
    in_flight: Option<u64>,
    generation: u64,
}

struct SearchGuard<'a> {
    controller: &'a FundSearchController,
    generation: u64,
}

impl Drop for SearchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.controller.lock();
        if state.in_flight == Some(self.generation) {
            state.in_flight = None;
        }
    }
}

pub struct FundSearchController {
    backend: Arc<dyn FundsBackend>,
    inner: Mutex<SearchState>,
}

impl FundSearchController {
    pub fn new(backend: Arc<dyn FundsBackend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            inner: Mutex::new(SearchState::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SearchState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        let state = self.lock();
        SearchSnapshot {
            query: state.query.clone(),
            search_type: state.search_type,
            results: state.results.clone(),
            is_loading: state.in_flight.is_some(),
            error: state.error.clone(),
            has_searched: state.has_searched,
            notice: state.notice.clone(),
        }
    }

    pub fn take_notice(&self) -> Option<Notice> {
        self.lock().notice.take()
    }

    pub async fn search(&self, query: &str, search_type: SearchType) -> SearchOutcome {
        let query = query.trim();
        if query.is_empty() {
            self.lock().notice = Some(Notice::failure(EMPTY_QUERY_NOTICE));
            return SearchOutcome::Rejected;
        }

        let generation = {
            let mut state = self.lock();
            let generation = state.generation + 1;
            state.generation = generation;
            state.in_flight = Some(generation);
            state.query = query.to_string();
            state.search_type = search_type;
            state.error = None;
            state.has_searched = true;
            generation
        };

        let _guard = SearchGuard {
            controller: self,
            generation,
        };
        let result = self
            .backend
            .search_funds(FundSearchRequest {
                fund_name: query.to_string(),
                search_type,
            })
            .await;
        self.settle(generation, result)
    }

    fn settle(
        &self,
        generation: u64,
        result: Result<FundSearchResponse, TransportError>,
    ) -> SearchOutcome {
        let mut state = self.lock();
        if state.generation != generation {
            debug!(generation, "search: discarding superseded result");
            return SearchOutcome::Discarded;
        }

        match result {
            Ok(FundSearchResponse {
                found: true,
                results: Some(results),
                ..
            }) => {
                let count = results.len();
                info!(count, search_type = %state.search_type, "search: funds found");
                state.results = results;
                state.notice = Some(Notice::success(format!("Found {count} result(s)")));
                SearchOutcome::Found(count)
            }
            Ok(response) => {
                state.results.clear();
                let text = response
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| NOT_FOUND_NOTICE.to_string());
                state.notice = Some(Notice::failure(text));
                SearchOutcome::NotFound
            }
            Err(err) => {
                warn!(error = %err, "search: request failed");
                let message = err.user_message();
                state.results.clear();
                state.error = Some(message.clone());
                state.notice = Some(Notice::failure(format!("Search failed: {message}")));
                SearchOutcome::Failed(message)
            }
        }
    }

    pub fn clear_search(&self) {
        let mut state = self.lock();
        let generation = state.generation + 1;
        *state = SearchState {
            generation,
            ..SearchState::default()
        };
    }
}

#[cfg(test)]
#[path = "tests/search_tests.rs"]
mod tests;

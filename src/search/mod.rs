//! # Search Backend
//!
//! Read side of the engine: filtered, paginated queries against a project's
//! index. A search opens a scroll cursor; each call to
//! [`SearchCursor::next_page`] yields the next bounded chunk of hits, and an
//! empty page marks the end of the scroll.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::constants::fields;
use crate::models::{BatchSearch, SearchHit};

pub use memory::{IndexedDocument, MemorySearchBackend};

#[derive(Debug, Error)]
pub enum SearchError {
    /// Structured error reported by the backend, possibly wrapping a more
    /// specific response-level cause
    #[error("Search backend returned status {status}: {reason}")]
    Status {
        status: u16,
        reason: String,
        #[source]
        cause: Option<Box<SearchError>>,
    },

    #[error("Search response error: {0}")]
    Response(String),

    #[error("Search backend unavailable: {0}")]
    Transport(String),

    #[error("Search backend is closed")]
    Closed,
}

impl SearchError {
    pub fn status(status: u16, reason: impl Into<String>) -> Self {
        Self::Status {
            status,
            reason: reason.into(),
            cause: None,
        }
    }

    /// Wrap a more specific cause into this status error
    pub fn caused_by(self, cause: SearchError) -> Self {
        match self {
            Self::Status { status, reason, .. } => Self::Status {
                status,
                reason,
                cause: Some(Box::new(cause)),
            },
            other => other,
        }
    }

    /// Message of the deepest error in the `source()` chain
    pub fn most_specific_cause(&self) -> String {
        let mut current: &(dyn std::error::Error + 'static) = self;
        while let Some(source) = current.source() {
            current = source;
        }
        current.to_string()
    }
}

/// A filtered, paginated query for one batch search query text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub fuzziness: u8,
    pub phrase_matches: bool,
    /// Values accepted for the `contentType` field (empty means any)
    pub content_types: Vec<String>,
    /// Prefixes accepted for the `dirname` field (empty means any)
    pub path_prefixes: Vec<String>,
    /// Source fields the backend should not return
    pub excluded_source_fields: Vec<String>,
    pub page_size: usize,
}

impl SearchRequest {
    /// Request for `query` using the options of `batch_search`. The document
    /// content is never needed for result records, so it is excluded.
    pub fn for_batch_search(batch_search: &BatchSearch, query: &str, page_size: usize) -> Self {
        Self {
            query: query.to_string(),
            fuzziness: batch_search.options.fuzziness,
            phrase_matches: batch_search.options.phrase_matches,
            content_types: batch_search.options.content_types.clone(),
            path_prefixes: batch_search.options.path_prefixes.clone(),
            excluded_source_fields: vec![fields::CONTENT.to_string()],
            page_size,
        }
    }

    pub fn excludes_field(&self, field: &str) -> bool {
        self.excluded_source_fields.iter().any(|f| f == field)
    }
}

#[async_trait]
pub trait SearchCursor: Send {
    /// Fetch the next page. An empty page is terminal.
    async fn next_page(&mut self) -> Result<Vec<SearchHit>, SearchError>;

    /// Release the server-side scroll context
    async fn clear(&mut self) -> Result<(), SearchError> {
        Ok(())
    }
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(
        &self,
        project: &str,
        request: &SearchRequest,
    ) -> Result<Box<dyn SearchCursor>, SearchError>;

    async fn close(&self) -> Result<(), SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SearchOptions, User};

    #[test]
    fn test_most_specific_cause_walks_to_deepest_error() {
        let error = SearchError::status(400, "search_phase_execution_exception").caused_by(
            SearchError::Response("failed to parse query [foo AND]".to_string()),
        );
        assert_eq!(
            error.most_specific_cause(),
            "Search response error: failed to parse query [foo AND]"
        );
    }

    #[test]
    fn test_most_specific_cause_without_nesting_is_the_error_itself() {
        let error = SearchError::status(500, "internal");
        assert_eq!(
            error.most_specific_cause(),
            "Search backend returned status 500: internal"
        );
    }

    #[test]
    fn test_request_for_batch_search_excludes_content() {
        let batch_search = BatchSearch::new("prj", User::local(), "bs", ["q"]).with_options(
            SearchOptions {
                fuzziness: 2,
                phrase_matches: true,
                content_types: vec!["application/pdf".to_string()],
                path_prefixes: vec!["/docs".to_string()],
            },
        );
        let request = SearchRequest::for_batch_search(&batch_search, "q", 100);
        assert_eq!(request.fuzziness, 2);
        assert!(request.phrase_matches);
        assert_eq!(request.page_size, 100);
        assert!(request.excludes_field("content"));
        assert_eq!(request.path_prefixes, vec!["/docs".to_string()]);
    }
}

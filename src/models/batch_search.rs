//! # Batch Search Model
//!
//! A batch search is an ordered set of queries run against one project. The
//! query order is the execution order, and each query carries the number of
//! results persisted for it so far.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::user::User;

/// One query of a batch search together with its running result count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchQuery {
    pub text: String,
    #[serde(default)]
    pub result_count: usize,
}

impl BatchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            result_count: 0,
        }
    }
}

/// Filters and matching options applied to every query of a batch search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum edit distance per term, 0 for exact matching
    #[serde(default)]
    pub fuzziness: u8,
    /// Match the query as a phrase instead of as independent terms
    #[serde(default)]
    pub phrase_matches: bool,
    /// Restrict results to these content types (empty means no restriction)
    #[serde(default)]
    pub content_types: Vec<String>,
    /// Restrict results to documents whose directory starts with one of these
    #[serde(default)]
    pub path_prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSearch {
    pub uuid: Uuid,
    pub user: User,
    pub project: String,
    pub name: String,
    pub queries: Vec<BatchQuery>,
    #[serde(default)]
    pub options: SearchOptions,
    pub created_at: DateTime<Utc>,
}

impl BatchSearch {
    /// Build a batch search with a fresh identifier. Duplicate query texts are
    /// dropped, keeping the first occurrence.
    pub fn new<I, Q>(project: impl Into<String>, user: User, name: impl Into<String>, queries: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<String>,
    {
        let mut unique: Vec<BatchQuery> = Vec::new();
        for text in queries.into_iter().map(Into::into) {
            if !unique.iter().any(|q| q.text == text) {
                unique.push(BatchQuery::new(text));
            }
        }

        Self {
            uuid: Uuid::new_v4(),
            user,
            project: project.into(),
            name: name.into(),
            queries: unique,
            options: SearchOptions::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn query_texts(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(|q| q.text.as_str())
    }

    /// Sum of the per-query result counts
    pub fn total_results(&self) -> usize {
        self.queries.iter().map(|q| q.result_count).sum()
    }

    pub fn query_mut(&mut self, text: &str) -> Option<&mut BatchQuery> {
        self.queries.iter_mut().find(|q| q.text == text)
    }
}

/// Failure payload stored with a FAILURE state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFailure {
    /// Query being executed when the failure happened, if any had started
    pub query: Option<String>,
    pub cause: String,
}

impl SearchFailure {
    pub fn new(query: Option<String>, cause: impl Into<String>) -> Self {
        Self {
            query,
            cause: cause.into(),
        }
    }
}

impl fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.query {
            Some(query) => write!(f, "query \"{query}\" failed: {}", self.cause),
            None => write!(f, "{}", self.cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_keep_insertion_order_without_duplicates() {
        let search = BatchSearch::new("prj", User::local(), "name", ["b", "a", "b", "c"]);
        let texts: Vec<&str> = search.query_texts().collect();
        assert_eq!(texts, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_total_results() {
        let mut search = BatchSearch::new("prj", User::local(), "name", ["q1", "q2"]);
        search.query_mut("q1").unwrap().result_count = 3;
        search.query_mut("q2").unwrap().result_count = 4;
        assert_eq!(search.total_results(), 7);
    }

    #[test]
    fn test_failure_display_names_query() {
        let failure = SearchFailure::new(Some("foo AND".to_string()), "parse error");
        assert_eq!(failure.to_string(), "query \"foo AND\" failed: parse error");
    }
}

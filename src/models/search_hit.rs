use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A matching document as returned by the search backend. The document
/// content itself is excluded from batch search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub root_id: String,
    pub path: String,
    pub content_type: String,
    pub content_length: u64,
    pub creation_date: Option<DateTime<Utc>>,
}

impl SearchHit {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            root_id: id.clone(),
            id,
            path: path.into(),
            content_type: "application/octet-stream".to_string(),
            content_length: 0,
            creation_date: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Directory part of the document path
    pub fn dirname(&self) -> &str {
        match self.path.rfind('/') {
            Some(0) => "/",
            Some(index) => &self.path[..index],
            None => "",
        }
    }
}

/// A persisted hit, numbered in fetch order within its query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSearchResult {
    pub query: String,
    pub doc_nb: usize,
    pub hit: SearchHit,
}

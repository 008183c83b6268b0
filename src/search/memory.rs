//! In-process search index used by the standalone worker and by tests.
//!
//! Documents are kept per project. Matching is token based: every query term
//! must match a document token within the requested edit distance, or, for
//! phrase queries, the terms must match consecutive tokens.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::{SearchBackend, SearchCursor, SearchError, SearchRequest};
use crate::models::SearchHit;

/// A document with its searchable content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    #[serde(flatten)]
    pub hit: SearchHit,
    pub content: String,
}

impl IndexedDocument {
    pub fn new(hit: SearchHit, content: impl Into<String>) -> Self {
        Self {
            hit,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySearchBackend {
    projects: DashMap<String, Vec<IndexedDocument>>,
    closed: AtomicBool,
}

impl MemorySearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self, project: &str, document: IndexedDocument) {
        self.projects
            .entry(project.to_string())
            .or_default()
            .push(document);
    }

    pub fn index_all(&self, project: &str, documents: impl IntoIterator<Item = IndexedDocument>) {
        let mut entry = self.projects.entry(project.to_string()).or_default();
        entry.extend(documents);
    }

    pub fn document_count(&self, project: &str) -> usize {
        self.projects.get(project).map(|docs| docs.len()).unwrap_or(0)
    }

    fn matching_hits(&self, project: &str, request: &SearchRequest) -> Vec<SearchHit> {
        let query_terms = tokenize(&request.query);
        let Some(documents) = self.projects.get(project) else {
            return Vec::new();
        };

        documents
            .iter()
            .filter(|doc| {
                request.content_types.is_empty()
                    || request.content_types.iter().any(|ct| ct == &doc.hit.content_type)
            })
            .filter(|doc| {
                request.path_prefixes.is_empty()
                    || request
                        .path_prefixes
                        .iter()
                        .any(|prefix| doc.hit.dirname().starts_with(prefix.as_str()))
            })
            .filter(|doc| {
                let tokens = tokenize(&doc.content);
                if request.phrase_matches {
                    matches_phrase(&query_terms, &tokens, request.fuzziness)
                } else {
                    matches_all_terms(&query_terms, &tokens, request.fuzziness)
                }
            })
            .map(|doc| doc.hit.clone())
            .collect()
    }
}

#[async_trait]
impl SearchBackend for MemorySearchBackend {
    async fn search(
        &self,
        project: &str,
        request: &SearchRequest,
    ) -> Result<Box<dyn SearchCursor>, SearchError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SearchError::Closed);
        }
        if request.page_size == 0 {
            return Err(SearchError::status(400, "page size must be positive"));
        }

        let hits = self.matching_hits(project, request);
        debug!(
            project = %project,
            query = %request.query,
            hits = hits.len(),
            "In-memory search executed"
        );

        Ok(Box::new(MemoryCursor {
            remaining: hits.into(),
            page_size: request.page_size,
        }))
    }

    async fn close(&self) -> Result<(), SearchError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

struct MemoryCursor {
    remaining: VecDeque<SearchHit>,
    page_size: usize,
}

#[async_trait]
impl SearchCursor for MemoryCursor {
    async fn next_page(&mut self) -> Result<Vec<SearchHit>, SearchError> {
        let take = self.page_size.min(self.remaining.len());
        Ok(self.remaining.drain(..take).collect())
    }

    async fn clear(&mut self) -> Result<(), SearchError> {
        self.remaining.clear();
        Ok(())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn term_matches(term: &str, token: &str, fuzziness: u8) -> bool {
    if fuzziness == 0 {
        term == token
    } else {
        levenshtein(term, token) <= fuzziness as usize
    }
}

fn matches_all_terms(terms: &[String], tokens: &[String], fuzziness: u8) -> bool {
    terms
        .iter()
        .all(|term| tokens.iter().any(|token| term_matches(term, token, fuzziness)))
}

fn matches_phrase(terms: &[String], tokens: &[String], fuzziness: u8) -> bool {
    if terms.is_empty() {
        return true;
    }
    tokens.windows(terms.len()).any(|window| {
        window
            .iter()
            .zip(terms)
            .all(|(token, term)| term_matches(term, token, fuzziness))
    })
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, path: &str, content_type: &str, content: &str) -> IndexedDocument {
        IndexedDocument::new(SearchHit::new(id, path).with_content_type(content_type), content)
    }

    fn request(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            fuzziness: 0,
            phrase_matches: false,
            content_types: vec![],
            path_prefixes: vec![],
            excluded_source_fields: vec!["content".to_string()],
            page_size: 10,
        }
    }

    async fn collect_ids(backend: &MemorySearchBackend, request: &SearchRequest) -> Vec<String> {
        let mut cursor = backend.search("prj", request).await.unwrap();
        let mut ids = Vec::new();
        loop {
            let page = cursor.next_page().await.unwrap();
            if page.is_empty() {
                break;
            }
            ids.extend(page.into_iter().map(|hit| hit.id));
        }
        ids
    }

    fn backend() -> MemorySearchBackend {
        let backend = MemorySearchBackend::new();
        backend.index_all(
            "prj",
            vec![
                doc("1", "/mail/a.eml", "message/rfc822", "offshore account in Panama"),
                doc("2", "/docs/b.pdf", "application/pdf", "the account is offshore"),
                doc("3", "/docs/c.pdf", "application/pdf", "nothing to see here"),
            ],
        );
        backend
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[tokio::test]
    async fn test_all_terms_matching() {
        let ids = collect_ids(&backend(), &request("account offshore")).await;
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_phrase_matching() {
        let mut phrase = request("offshore account");
        phrase.phrase_matches = true;
        assert_eq!(collect_ids(&backend(), &phrase).await, vec!["1"]);
    }

    #[tokio::test]
    async fn test_fuzziness() {
        let mut fuzzy = request("acount");
        assert!(collect_ids(&backend(), &fuzzy).await.is_empty());
        fuzzy.fuzziness = 1;
        assert_eq!(collect_ids(&backend(), &fuzzy).await, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_content_type_and_path_filters() {
        let mut filtered = request("account");
        filtered.content_types = vec!["application/pdf".to_string()];
        assert_eq!(collect_ids(&backend(), &filtered).await, vec!["2"]);

        let mut by_path = request("account");
        by_path.path_prefixes = vec!["/mail".to_string()];
        assert_eq!(collect_ids(&backend(), &by_path).await, vec!["1"]);
    }

    #[tokio::test]
    async fn test_pages_are_bounded_by_page_size() {
        let backend = MemorySearchBackend::new();
        backend.index_all(
            "prj",
            (0..5).map(|i| doc(&i.to_string(), "/d/f.txt", "text/plain", "word")),
        );
        let mut paged = request("word");
        paged.page_size = 2;
        let mut cursor = backend.search("prj", &paged).await.unwrap();
        assert_eq!(cursor.next_page().await.unwrap().len(), 2);
        assert_eq!(cursor.next_page().await.unwrap().len(), 2);
        assert_eq!(cursor.next_page().await.unwrap().len(), 1);
        assert!(cursor.next_page().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_backend_rejects_searches() {
        let backend = backend();
        backend.close().await.unwrap();
        assert!(matches!(
            backend.search("prj", &request("account")).await,
            Err(SearchError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_unknown_project_has_no_hits() {
        let backend = backend();
        let mut cursor = backend.search("other", &request("account")).await.unwrap();
        assert!(cursor.next_page().await.unwrap().is_empty());
    }
}

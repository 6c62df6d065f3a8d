//! In-memory [`DocumentStore`] for tests and dry runs.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Only two metadata filters are
//! understood: the empty filter (everything) and the exact-id filter built by
//! [`doc_id_filter`](crate::document::doc_id_filter). Creating an id that
//! already exists fails with a 409, as the real service does.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::Document;
use crate::traits::DocumentStore;

#[derive(Default)]
pub struct InMemoryDocumentStore {
    corpora: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a stored document directly, bypassing the filter language.
    pub fn get(&self, corpus_key: &str, doc_id: &str) -> Option<Document> {
        let corpora = self.corpora.read().ok()?;
        corpora
            .get(corpus_key)?
            .iter()
            .find(|d| d.id == doc_id)
            .cloned()
    }

    /// Insert a document as-is, replacing any document with the same id.
    pub fn insert(&self, corpus_key: &str, document: Document) {
        if let Ok(mut corpora) = self.corpora.write() {
            let docs = corpora.entry(corpus_key.to_string()).or_default();
            docs.retain(|d| d.id != document.id);
            docs.push(document);
        }
    }

    pub fn len(&self, corpus_key: &str) -> usize {
        self.corpora
            .read()
            .map(|c| c.get(corpus_key).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

fn lock_poisoned() -> Error {
    Error::InvariantViolation("in-memory document store lock poisoned".to_string())
}

/// Extract the id from a `doc.id = '<id>'` filter.
fn parse_id_filter(filter: &str) -> Option<String> {
    let inner = filter
        .trim()
        .strip_prefix("doc.id = '")?
        .strip_suffix('\'')?;
    Some(inner.replace("\\'", "'"))
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list(&self, corpus_key: &str, metadata_filter: &str) -> Result<Vec<Document>> {
        let corpora = self.corpora.read().map_err(|_| lock_poisoned())?;
        let docs = match corpora.get(corpus_key) {
            Some(docs) => docs,
            None => return Ok(Vec::new()),
        };

        if metadata_filter.trim().is_empty() {
            return Ok(docs.clone());
        }

        let id = parse_id_filter(metadata_filter).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "unsupported metadata filter for in-memory store: {}",
                metadata_filter
            ))
        })?;
        Ok(docs.iter().filter(|d| d.id == id).cloned().collect())
    }

    async fn create(&self, corpus_key: &str, document: &Document) -> Result<Document> {
        let mut corpora = self.corpora.write().map_err(|_| lock_poisoned())?;
        let docs = corpora.entry(corpus_key.to_string()).or_default();
        if docs.iter().any(|d| d.id == document.id) {
            return Err(Error::Api {
                status: 409,
                body: format!("document [{}] already exists", document.id),
            });
        }
        docs.push(document.clone());
        Ok(document.clone())
    }

    async fn delete(&self, corpus_key: &str, doc_id: &str) -> Result<()> {
        let mut corpora = self.corpora.write().map_err(|_| lock_poisoned())?;
        let docs = corpora
            .get_mut(corpus_key)
            .ok_or_else(|| Error::NotFound(format!("corpus [{}]", corpus_key)))?;
        let before = docs.len();
        docs.retain(|d| d.id != doc_id);
        if docs.len() == before {
            return Err(Error::NotFound(format!("document [{}]", doc_id)));
        }
        Ok(())
    }
}

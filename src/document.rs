//! Idempotent document indexing.
//!
//! [`DocumentManager::index_doc`] publishes a document only when it differs
//! from what the corpus already holds. The comparison uses a SHA-256
//! fingerprint stored under the reserved metadata key [`HASH_FIELD`] plus an
//! equality check on the caller's metadata keys.
//!
//! ```text
//! strip sha256 → serialize → check_same ─┬─ exists & same ──▶ Ignored
//!                                        ├─ absent ─────────▶ create            → Created
//!                                        └─ exists & differs ▶ delete + create → Updated
//! ```
//!
//! The update path is delete-then-create, not an atomic replace. A concurrent
//! reader can observe the document as absent in between, and two writers
//! racing on the same id can interleave. Callers that need stronger
//! guarantees must serialize updates themselves.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::hash::calculate_sha256;
use crate::models::{Document, Metadata, CORE_DOCUMENT_TYPE};
use crate::traits::DocumentStore;

/// Reserved metadata key holding the content fingerprint.
pub const HASH_FIELD: &str = "sha256";

/// Outcome of [`DocumentManager::index_doc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocOp {
    Created,
    Updated,
    Ignored,
}

impl fmt::Display for DocOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocOp::Created => write!(f, "created"),
            DocOp::Updated => write!(f, "updated"),
            DocOp::Ignored => write!(f, "ignored"),
        }
    }
}

/// Metadata filter selecting exactly the document with `doc_id`.
pub fn doc_id_filter(doc_id: &str) -> String {
    format!("doc.id = '{}'", doc_id.replace('\'', "\\'"))
}

pub struct DocumentManager {
    store: Arc<dyn DocumentStore>,
}

impl DocumentManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Look up a document by id, returning `None` when it (or the corpus)
    /// does not exist.
    pub async fn check_exists(&self, corpus_key: &str, doc_id: &str) -> Result<Option<Document>> {
        match self.store.list(corpus_key, &doc_id_filter(doc_id)).await {
            Ok(docs) => Ok(docs.into_iter().next()),
            Err(Error::NotFound(what)) => {
                debug!("existence check for [{}] found nothing: {}", doc_id, what);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Check whether the corpus already holds `doc_id` with the same content
    /// fingerprint and the same values for every key in `metadata`.
    ///
    /// Returns `(exists, same)`; `same` is `None` only when the document does
    /// not exist. Metadata keys present on the stored document but absent
    /// from `metadata` are ignored.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if any comparison value is `null`. This is
    /// raised before the remote lookup.
    pub async fn check_same(
        &self,
        corpus_key: &str,
        doc_id: &str,
        content: &[u8],
        metadata: Option<&Metadata>,
    ) -> Result<(bool, Option<bool>)> {
        if let Some(metadata) = metadata {
            if let Some((key, _)) = metadata.iter().find(|(_, v)| v.is_null()) {
                return Err(Error::InvalidArgument(format!(
                    "cannot compare metadata attribute [{}] with a null value",
                    key
                )));
            }
        }

        let doc = match self.check_exists(corpus_key, doc_id).await? {
            Some(doc) => doc,
            None => return Ok((false, None)),
        };

        let existing_hash = match doc.metadata.get(HASH_FIELD) {
            Some(Value::String(hash)) => hash,
            _ => {
                debug!("document [{}] has no fingerprint", doc_id);
                return Ok((true, Some(false)));
            }
        };

        if let Some(metadata) = metadata {
            for (key, value) in metadata {
                match doc.metadata.get(key) {
                    Some(existing) if existing == value => {}
                    _ => {
                        debug!("document [{}] differs on metadata [{}]", doc_id, key);
                        return Ok((true, Some(false)));
                    }
                }
            }
        }

        let current_hash = calculate_sha256(content);
        Ok((true, Some(existing_hash.eq_ignore_ascii_case(&current_hash))))
    }

    /// Create, replace, or skip `document` depending on what the corpus holds.
    ///
    /// Any caller-supplied [`HASH_FIELD`] is discarded; the stored fingerprint
    /// is always computed here. Only core documents are accepted: a structured
    /// document would lose its sections when read into [`Document`].
    pub async fn index_doc(&self, corpus_key: &str, document: &Document) -> Result<DocOp> {
        if document.doc_type != CORE_DOCUMENT_TYPE {
            return Err(Error::InvalidArgument(format!(
                "document [{}] has type [{}]; only [{}] documents can be indexed",
                document.id, document.doc_type, CORE_DOCUMENT_TYPE
            )));
        }
        let mut doc = document.clone();
        doc.metadata.remove(HASH_FIELD);

        let content = serde_json::to_vec(&doc)?;
        let comparison = (!doc.metadata.is_empty()).then_some(&doc.metadata);
        let (exists, same) = self
            .check_same(corpus_key, &doc.id, &content, comparison)
            .await?;

        if exists && same == Some(true) {
            info!("document [{}] unchanged, skipping", doc.id);
            return Ok(DocOp::Ignored);
        }

        doc.metadata
            .insert(HASH_FIELD.to_string(), Value::String(calculate_sha256(&content)));

        match (exists, same) {
            (false, _) => {
                info!("document [{}] does not exist, creating", doc.id);
                self.store.create(corpus_key, &doc).await?;
                Ok(DocOp::Created)
            }
            (true, Some(false)) => {
                info!(
                    "document [{}] exists with different content, deleting and recreating",
                    doc.id
                );
                self.store.delete(corpus_key, &doc.id).await?;
                self.store.create(corpus_key, &doc).await?;
                Ok(DocOp::Updated)
            }
            (exists, same) => Err(Error::InvariantViolation(format!(
                "unexpected exists/same combination ({}, {:?}) for document [{}]",
                exists, same, doc.id
            ))),
        }
    }
}

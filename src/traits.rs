//! Collaborator traits the toolkit is written against.
//!
//! The managers in this crate never talk HTTP directly. They consume the
//! three narrow interfaces below, which [`VectaraClient`](crate::client::VectaraClient)
//! implements against the REST API and which tests implement in memory.
//!
//! ```text
//! ┌────────────────┐   ┌─────────────────┐   ┌────────────────────┐
//! │ DocumentManager│   │  CorpusManager  │   │ ChatSessionManager │
//! └───────┬────────┘   └────────┬────────┘   └─────────┬──────────┘
//!         ▼                     ▼                      ▼
//!   DocumentStore          CorpusStore           ChatTransport
//!         └──────────────┬──────┴──────────────────────┘
//!                        ▼
//!                  VectaraClient (reqwest)
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    ChatParameters, ChatResponse, Corpus, CreateCorpusRequest, Document, GenerationParameters,
    RequestOptions, SearchCorporaParameters,
};

// ═══════════════════════════════════════════════════════════════════════
// DocumentStore
// ═══════════════════════════════════════════════════════════════════════

/// Remote document storage scoped by corpus key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List documents in `corpus_key` matching `metadata_filter`
    /// (for example `doc.id = 'ABC'`). An empty filter lists everything.
    async fn list(&self, corpus_key: &str, metadata_filter: &str) -> Result<Vec<Document>>;

    /// Create `document` in `corpus_key`, returning the stored document.
    async fn create(&self, corpus_key: &str, document: &Document) -> Result<Document>;

    /// Delete the document with id `doc_id`.
    async fn delete(&self, corpus_key: &str, doc_id: &str) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════
// CorpusStore
// ═══════════════════════════════════════════════════════════════════════

/// Remote corpus lifecycle operations.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// List corpora whose name or key contains `filter`.
    async fn list(&self, filter: &str) -> Result<Vec<Corpus>>;

    async fn get(&self, corpus_key: &str) -> Result<Corpus>;

    async fn create(&self, request: &CreateCorpusRequest) -> Result<Corpus>;

    async fn delete(&self, corpus_key: &str) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════
// ChatTransport
// ═══════════════════════════════════════════════════════════════════════

/// Transport-level settings forwarded with a chat call.
///
/// `request_timeout` and `request_timeout_millis` are passed to the service
/// as headers; `request_options` tunes the HTTP call itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallSettings<'a> {
    pub request_options: Option<&'a RequestOptions>,
    pub request_timeout: Option<u32>,
    pub request_timeout_millis: Option<u32>,
}

/// Chat endpoints: start a conversation, or add a turn to one.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn start_chat(
        &self,
        query: &str,
        search: &SearchCorporaParameters,
        generation: Option<&GenerationParameters>,
        chat: Option<&ChatParameters>,
        settings: CallSettings<'_>,
    ) -> Result<ChatResponse>;

    async fn continue_chat(
        &self,
        chat_id: &str,
        query: &str,
        search: &SearchCorporaParameters,
        generation: Option<&GenerationParameters>,
        chat: Option<&ChatParameters>,
        settings: CallSettings<'_>,
    ) -> Result<ChatResponse>;
}

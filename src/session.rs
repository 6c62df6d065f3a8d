//! Time-expiring chat session cache.
//!
//! A [`ChatSessionStore`] remembers the search / generation / chat parameters
//! a conversation was started with, keyed by the service-assigned chat id, so
//! later turns can reuse them. Sessions expire `expiry` after creation and are
//! evicted by a background reaper that sweeps every `cleanup_interval`.
//!
//! ```text
//! Absent ──create_session──▶ Active ──age > expiry──▶ Expired ──reaper / clean──▶ Absent
//! ```
//!
//! [`ChatSessionStore::get_session`] does not check expiry on its own: a
//! session past its expiry stays visible until the next sweep. The reaper is
//! the only eviction path besides an explicit
//! [`clean_expired_sessions`](ChatSessionStore::clean_expired_sessions).
//!
//! All operations share one mutex, which is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::models::{ChatParameters, GenerationParameters, RequestOptions, SearchCorporaParameters};

/// Parameters captured for one chat conversation.
#[derive(Debug)]
pub struct ChatSession {
    pub search: Arc<SearchCorporaParameters>,
    pub generation: Option<Arc<GenerationParameters>>,
    pub chat: Option<Arc<ChatParameters>>,
    pub request_options: Option<Arc<RequestOptions>>,
    pub request_timeout: Option<u32>,
    pub request_timeout_millis: Option<u32>,
    pub created_at: Instant,
}

struct SessionMap {
    sessions: Mutex<HashMap<String, Arc<ChatSession>>>,
    expiry: Duration,
}

impl SessionMap {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<ChatSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clean_expired(&self) -> usize {
        let mut sessions = self.lock();
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, s| now.duration_since(s.created_at) <= self.expiry);
        before - sessions.len()
    }
}

pub struct ChatSessionStore {
    map: Arc<SessionMap>,
    cancel: CancellationToken,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSessionStore {
    /// Create a store and start its reaper on the current tokio runtime.
    ///
    /// `cleanup_interval` and `expiry` are independent; sweeping less often
    /// than sessions expire simply lets expired sessions linger longer.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(expiry: Duration, cleanup_interval: Duration) -> Self {
        let map = Arc::new(SessionMap {
            sessions: Mutex::new(HashMap::new()),
            expiry,
        });
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_reaper(
            Arc::downgrade(&map),
            cleanup_interval,
            cancel.clone(),
        ));
        debug!(
            "session reaper started: expiry {:?}, interval {:?}",
            expiry, cleanup_interval
        );

        Self {
            map,
            cancel,
            reaper: Mutex::new(Some(handle)),
        }
    }

    /// Store the parameters for `chat_id`, replacing any previous session.
    #[allow(clippy::too_many_arguments)]
    pub fn create_session(
        &self,
        chat_id: &str,
        search: Arc<SearchCorporaParameters>,
        generation: Option<Arc<GenerationParameters>>,
        chat: Option<Arc<ChatParameters>>,
        request_options: Option<Arc<RequestOptions>>,
        request_timeout: Option<u32>,
        request_timeout_millis: Option<u32>,
    ) {
        let session = Arc::new(ChatSession {
            search,
            generation,
            chat,
            request_options,
            request_timeout,
            request_timeout_millis,
            created_at: Instant::now(),
        });
        self.map.lock().insert(chat_id.to_string(), session);
        trace!("stored chat session [{}]", chat_id);
    }

    pub fn get_session(&self, chat_id: &str) -> Option<Arc<ChatSession>> {
        self.map.lock().get(chat_id).cloned()
    }

    /// Remove every session older than the expiry. Returns how many went.
    pub fn clean_expired_sessions(&self) -> usize {
        self.map.clean_expired()
    }

    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the reaper and wait for it to exit. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self
            .reaper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!("session reaper ended abnormally: {e}");
            }
        }
    }
}

impl Drop for ChatSessionStore {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_reaper(map: Weak<SessionMap>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("session reaper stopped");
                return;
            }
            _ = ticker.tick() => {
                let Some(sessions) = map.upgrade() else {
                    return;
                };
                let removed = sessions.clean_expired();
                if removed > 0 {
                    debug!("reaped {} expired chat sessions", removed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CitationParameters, ContextConfiguration, KeyedSearchCorpus, ModelParameters, Reranker,
    };

    fn search_params() -> Arc<SearchCorporaParameters> {
        Arc::new(SearchCorporaParameters {
            corpora: vec![KeyedSearchCorpus {
                corpus_key: "test_corpus_key".into(),
                metadata_filter: Some(String::new()),
                lexical_interpolation: Some(1.0),
            }],
            offset: Some(1),
            limit: Some(1),
            context_configuration: Some(ContextConfiguration {
                characters_before: Some(1),
                characters_after: Some(1),
                sentences_before: Some(1),
                sentences_after: Some(1),
                start_tag: Some("%".into()),
                end_tag: Some("%".into()),
            }),
            reranker: Some(Reranker::CustomerReranker {
                reranker_id: Some("test_id".into()),
                reranker_name: Some("test".into()),
            }),
        })
    }

    fn generation_params() -> Arc<GenerationParameters> {
        Arc::new(GenerationParameters {
            generation_preset_name: Some("test".into()),
            max_used_search_results: Some(1),
            prompt_template: Some("test".into()),
            max_response_characters: Some(1),
            response_language: Some("test".into()),
            model_parameters: Some(ModelParameters {
                max_tokens: Some(1),
                temperature: Some(1.1),
                frequency_penalty: Some(1.1),
                presence_penalty: Some(1.1),
            }),
            citations: Some(CitationParameters {
                style: "none".into(),
            }),
            enable_factual_consistency_score: Some(true),
        })
    }

    fn store() -> ChatSessionStore {
        ChatSessionStore::new(Duration::from_secs(5), Duration::from_secs(6))
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_and_retrieve_session() {
        let store = store();
        let search = search_params();
        let generation = generation_params();
        let chat = Arc::new(ChatParameters { store: Some(true) });
        let options = Arc::new(RequestOptions {
            timeout_in_seconds: Some(100),
            ..Default::default()
        });

        store.create_session(
            "test_chat",
            search.clone(),
            Some(generation.clone()),
            Some(chat.clone()),
            Some(options.clone()),
            Some(1),
            Some(1),
        );

        let session = store.get_session("test_chat").expect("session should exist");
        assert!(Arc::ptr_eq(&session.search, &search));
        assert!(Arc::ptr_eq(session.generation.as_ref().unwrap(), &generation));
        assert!(Arc::ptr_eq(session.chat.as_ref().unwrap(), &chat));
        assert!(Arc::ptr_eq(session.request_options.as_ref().unwrap(), &options));
        assert_eq!(session.request_timeout, Some(1));
        assert_eq!(session.request_timeout_millis, Some(1));
        store.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_visible_before_expiry() {
        let store = store();
        store.create_session("chat", search_params(), None, None, None, None, None);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(store.get_session("chat").is_some());
        store.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_expiration_by_reaper() {
        let store = store();
        store.create_session("test_chat_expiration", search_params(), None, None, None, None, None);

        tokio::time::sleep(Duration::from_secs(7)).await;

        assert!(store.get_session("test_chat_expiration").is_none());
        store.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_expired_sessions() {
        let store = ChatSessionStore::new(Duration::from_secs(5), Duration::from_secs(3600));
        store.create_session("chat1", search_params(), None, None, None, None, None);
        store.create_session("chat2", search_params(), None, None, None, None, None);

        tokio::time::sleep(Duration::from_secs(7)).await;
        // Lookup does not expire on its own.
        assert!(store.get_session("chat1").is_some());

        assert_eq!(store.clean_expired_sessions(), 2);
        assert!(store.get_session("chat1").is_none());
        assert!(store.get_session("chat2").is_none());
        assert!(store.is_empty());
        store.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_old_sessions_reaped() {
        let store = ChatSessionStore::new(Duration::from_secs(5), Duration::from_secs(3600));
        store.create_session("old", search_params(), None, None, None, None, None);
        tokio::time::sleep(Duration::from_secs(4)).await;
        store.create_session("new", search_params(), None, None, None, None, None);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(store.clean_expired_sessions(), 1);
        assert!(store.get_session("old").is_none());
        assert!(store.get_session("new").is_some());
        store.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_overwrites_and_restamps() {
        let store = ChatSessionStore::new(Duration::from_secs(5), Duration::from_secs(3600));
        store.create_session("chat", search_params(), None, None, None, None, None);
        tokio::time::sleep(Duration::from_secs(4)).await;

        let replacement = search_params();
        store.create_session("chat", replacement.clone(), None, None, None, Some(9), None);
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(store.clean_expired_sessions(), 0);
        let session = store.get_session("chat").unwrap();
        assert!(Arc::ptr_eq(&session.search, &replacement));
        assert_eq!(session.request_timeout, Some(9));
        assert_eq!(store.len(), 1);
        store.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_reaper() {
        let store = store();
        store.shutdown().await;
        store.create_session("chat", search_params(), None, None, None, None, None);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(store.get_session("chat").is_some());

        // A second shutdown is a no-op.
        store.shutdown().await;
    }
}

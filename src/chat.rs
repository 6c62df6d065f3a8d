//! Multi-turn chat on top of [`ChatSessionStore`].
//!
//! The first turn of a conversation carries the full search / generation /
//! chat parameters. The service answers with a `chat_id`, under which the
//! parameters are cached. Later turns pass only the query and the `chat_id`;
//! the cached parameters are replayed against the "add turn" endpoint.
//!
//! When a `chat_id` is given but its session has expired (or never existed),
//! the call falls back to starting a fresh chat with whatever parameters the
//! caller supplied.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{
    ChatParameters, ChatResponse, GenerationParameters, RequestOptions, SearchCorporaParameters,
};
use crate::session::ChatSessionStore;
use crate::traits::{CallSettings, ChatTransport};

/// Parameters for one call to [`ChatSessionManager::chat`].
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub search: Option<Arc<SearchCorporaParameters>>,
    pub generation: Option<Arc<GenerationParameters>>,
    pub chat: Option<Arc<ChatParameters>>,
    pub request_options: Option<Arc<RequestOptions>>,
    pub request_timeout: Option<u32>,
    pub request_timeout_millis: Option<u32>,
}

impl ChatRequest {
    pub fn with_search(search: SearchCorporaParameters) -> Self {
        Self {
            search: Some(Arc::new(search)),
            ..Default::default()
        }
    }
}

pub struct ChatSessionManager {
    transport: Arc<dyn ChatTransport>,
    sessions: ChatSessionStore,
}

impl ChatSessionManager {
    /// Must be called from within a tokio runtime (the session reaper is
    /// spawned here).
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        session_expiry: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            transport,
            sessions: ChatSessionStore::new(session_expiry, cleanup_interval),
        }
    }

    pub fn session_store(&self) -> &ChatSessionStore {
        &self.sessions
    }

    /// Send `query`, continuing `chat_id` if its session is still cached.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when no session can be recovered and
    /// `request.search` is `None`. Transport errors are returned unchanged.
    pub async fn chat(
        &self,
        query: &str,
        chat_id: Option<&str>,
        request: ChatRequest,
    ) -> Result<ChatResponse> {
        if let Some(chat_id) = chat_id {
            if let Some(session) = self.sessions.get_session(chat_id) {
                info!("continuing chat [{}]", chat_id);
                let settings = CallSettings {
                    request_options: session.request_options.as_deref(),
                    request_timeout: session.request_timeout,
                    request_timeout_millis: session.request_timeout_millis,
                };
                return self
                    .transport
                    .continue_chat(
                        chat_id,
                        query,
                        &session.search,
                        session.generation.as_deref(),
                        session.chat.as_deref(),
                        settings,
                    )
                    .await;
            }
            info!("no session for chat [{}], starting a new chat", chat_id);
        }

        let search = request.search.clone().ok_or_else(|| {
            Error::InvalidArgument(
                "search is required when chat_id is absent and no session can be recovered"
                    .to_string(),
            )
        })?;

        let settings = CallSettings {
            request_options: request.request_options.as_deref(),
            request_timeout: request.request_timeout,
            request_timeout_millis: request.request_timeout_millis,
        };
        let response = self
            .transport
            .start_chat(
                query,
                &search,
                request.generation.as_deref(),
                request.chat.as_deref(),
                settings,
            )
            .await?;

        match response.chat_id.as_deref() {
            Some(new_id) => {
                self.sessions.create_session(
                    new_id,
                    search,
                    request.generation,
                    request.chat,
                    request.request_options,
                    request.request_timeout,
                    request.request_timeout_millis,
                );
            }
            None => warn!("chat response carried no chat_id; session not stored"),
        }

        Ok(response)
    }

    pub async fn shutdown(&self) {
        self.sessions.shutdown().await;
    }
}

//! REST client for the Vectara v2 API.
//!
//! [`VectaraClient`] implements [`DocumentStore`], [`CorpusStore`] and
//! [`ChatTransport`] over `reqwest`. It does no retrying: every call is one
//! request (or one request per page for listings), and any non-2xx answer is
//! handed back as [`Error::Api`] with the body untouched. A 404 becomes
//! [`Error::NotFound`] so callers can treat a missing corpus as "absent".
//!
//! # Authentication
//!
//! | Credential | Header |
//! |------------|--------|
//! | API key | `x-api-key: <key>` |
//! | OAuth2 client credentials | `Authorization: Bearer <token>` |
//!
//! OAuth2 tokens are fetched from the token endpoint on first use and cached
//! until shortly before they expire.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::config::{AuthConfig, ClientConfig};
use crate::error::{Error, Result};
use crate::models::{
    ChatParameters, ChatResponse, Corpus, CreateCorpusRequest, Document, GenerationParameters,
    SearchCorporaParameters,
};
use crate::settings::ApiSettings;
use crate::traits::{CallSettings, ChatTransport, CorpusStore, DocumentStore};

/// Page size requested from list endpoints.
const PAGE_LIMIT: u32 = 100;

/// Tokens are refreshed this long before the server says they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);

const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

// ═══════════════════════════════════════════════════════════════════════
// Authentication
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

struct TokenProvider {
    auth_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    async fn token(&self, http: &reqwest::Client) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(current) = cached.as_ref() {
            if Instant::now() < current.refresh_at {
                return Ok(current.token.clone());
            }
        }

        debug!("requesting OAuth2 token from {}", self.auth_url);
        let response = http
            .post(&self.auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = check_status(response).await?.json().await?;

        let lifetime =
            Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        });
        Ok(token.access_token)
    }
}

enum Authenticator {
    ApiKey(String),
    OAuth2(TokenProvider),
}

// ═══════════════════════════════════════════════════════════════════════
// Client
// ═══════════════════════════════════════════════════════════════════════

pub struct VectaraClient {
    http: reqwest::Client,
    base_url: Url,
    auth: Authenticator,
}

impl VectaraClient {
    pub fn new(config: &ClientConfig, api: &ApiSettings) -> Result<Self> {
        let base_url = Url::parse(&api.base_url).map_err(|e| {
            Error::InvalidArgument(format!("invalid base URL [{}]: {}", api.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidArgument(format!(
                "base URL [{}] cannot carry a path",
                api.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;

        let auth = match &config.auth {
            AuthConfig::ApiKey { api_key } => Authenticator::ApiKey(api_key.clone()),
            AuthConfig::OAuth2 {
                auth_url,
                app_client_id,
                app_client_secret,
            } => Authenticator::OAuth2(TokenProvider {
                auth_url: auth_url.clone().unwrap_or_else(|| api.auth_url.clone()),
                client_id: app_client_id.clone(),
                client_secret: app_client_secret.clone(),
                cached: Mutex::new(None),
            }),
        };

        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    /// `base_url` joined with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn request(
        &self,
        method: Method,
        url: Url,
        settings: CallSettings<'_>,
    ) -> Result<RequestBuilder> {
        trace!("{} {}", method, url);
        let mut builder = self.http.request(method, url);

        builder = match &self.auth {
            Authenticator::ApiKey(key) => builder.header("x-api-key", key),
            Authenticator::OAuth2(provider) => {
                builder.bearer_auth(provider.token(&self.http).await?)
            }
        };

        if let Some(timeout) = settings.request_timeout {
            builder = builder.header("Request-Timeout", timeout.to_string());
        }
        if let Some(millis) = settings.request_timeout_millis {
            builder = builder.header("Request-Timeout-Millis", millis.to_string());
        }
        if let Some(options) = settings.request_options {
            if let Some(secs) = options.timeout_in_seconds {
                builder = builder.timeout(Duration::from_secs(secs));
            }
            for (name, value) in &options.additional_headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        Ok(builder)
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let response = check_status(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Follow `metadata.page_key` until the listing is exhausted, collecting
    /// the array stored under `field` from every page.
    async fn list_all<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        field: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_key: Option<String> = None;

        loop {
            let mut url = self.endpoint(segments);
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("limit", &PAGE_LIMIT.to_string());
                for (name, value) in query {
                    pairs.append_pair(name, value);
                }
                if let Some(key) = &page_key {
                    pairs.append_pair("page_key", key);
                }
            }

            let builder = self
                .request(Method::GET, url, CallSettings::default())
                .await?;
            let mut page: serde_json::Value = Self::send_json(builder).await?;

            if let Some(array) = page.get_mut(field).map(serde_json::Value::take) {
                let batch: Vec<T> = serde_json::from_value(array)?;
                items.extend(batch);
            }

            let next = page
                .pointer("/metadata/page_key")
                .and_then(|v| v.as_str())
                .filter(|k| !k.is_empty())
                .map(str::to_string);
            if next.is_some() && next == page_key {
                warn!(
                    "{} listing returned the same page_key twice, stopping",
                    segments.join("/")
                );
                break;
            }
            page_key = next;
            if page_key.is_none() {
                break;
            }
        }

        Ok(items)
    }

    async fn post_chat(
        &self,
        url: Url,
        body: &ChatRequestBody<'_>,
        settings: CallSettings<'_>,
    ) -> Result<ChatResponse> {
        let builder = self.request(Method::POST, url, settings).await?.json(body);
        Self::send_json(builder).await
    }
}

/// Pass 2xx responses through; turn anything else into an error carrying
/// the raw body.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(body));
    }
    Err(Error::Api {
        status: status.as_u16(),
        body,
    })
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    query: &'a str,
    search: &'a SearchCorporaParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation: Option<&'a GenerationParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat: Option<&'a ChatParameters>,
    stream_response: bool,
}

#[async_trait]
impl DocumentStore for VectaraClient {
    async fn list(&self, corpus_key: &str, metadata_filter: &str) -> Result<Vec<Document>> {
        let mut query = Vec::new();
        if !metadata_filter.is_empty() {
            query.push(("metadata_filter", metadata_filter));
        }
        self.list_all(&["v2", "corpora", corpus_key, "documents"], "documents", &query)
            .await
    }

    async fn create(&self, corpus_key: &str, document: &Document) -> Result<Document> {
        let url = self.endpoint(&["v2", "corpora", corpus_key, "documents"]);
        let builder = self
            .request(Method::POST, url, CallSettings::default())
            .await?
            .json(document);
        Self::send_json(builder).await
    }

    async fn delete(&self, corpus_key: &str, doc_id: &str) -> Result<()> {
        let url = self.endpoint(&["v2", "corpora", corpus_key, "documents", doc_id]);
        let builder = self
            .request(Method::DELETE, url, CallSettings::default())
            .await?;
        check_status(builder.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl CorpusStore for VectaraClient {
    async fn list(&self, filter: &str) -> Result<Vec<Corpus>> {
        let mut query = Vec::new();
        if !filter.is_empty() {
            query.push(("filter", filter));
        }
        self.list_all(&["v2", "corpora"], "corpora", &query).await
    }

    async fn get(&self, corpus_key: &str) -> Result<Corpus> {
        let url = self.endpoint(&["v2", "corpora", corpus_key]);
        let builder = self
            .request(Method::GET, url, CallSettings::default())
            .await?;
        Self::send_json(builder).await
    }

    async fn create(&self, request: &CreateCorpusRequest) -> Result<Corpus> {
        let url = self.endpoint(&["v2", "corpora"]);
        let builder = self
            .request(Method::POST, url, CallSettings::default())
            .await?
            .json(request);
        Self::send_json(builder).await
    }

    async fn delete(&self, corpus_key: &str) -> Result<()> {
        let url = self.endpoint(&["v2", "corpora", corpus_key]);
        let builder = self
            .request(Method::DELETE, url, CallSettings::default())
            .await?;
        check_status(builder.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for VectaraClient {
    async fn start_chat(
        &self,
        query: &str,
        search: &SearchCorporaParameters,
        generation: Option<&GenerationParameters>,
        chat: Option<&ChatParameters>,
        settings: CallSettings<'_>,
    ) -> Result<ChatResponse> {
        let body = ChatRequestBody {
            query,
            search,
            generation,
            chat,
            stream_response: false,
        };
        self.post_chat(self.endpoint(&["v2", "chats"]), &body, settings)
            .await
    }

    async fn continue_chat(
        &self,
        chat_id: &str,
        query: &str,
        search: &SearchCorporaParameters,
        generation: Option<&GenerationParameters>,
        chat: Option<&ChatParameters>,
        settings: CallSettings<'_>,
    ) -> Result<ChatResponse> {
        let body = ChatRequestBody {
            query,
            search,
            generation,
            chat,
            stream_response: false,
        };
        self.post_chat(
            self.endpoint(&["v2", "chats", chat_id, "turns"]),
            &body,
            settings,
        )
        .await
    }
}

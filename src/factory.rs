//! One-stop construction of a configured client and its managers.
//!
//! ```rust,no_run
//! # async fn run() -> anyhow::Result<()> {
//! use vectara_kit::factory::Factory;
//!
//! let vectara = Factory::new().profile("lab").build()?;
//! println!("credentials from {}", vectara.load_method());
//! let corpora = vectara.corpora().find_corpora_by_name("docs").await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::chat::ChatSessionManager;
use crate::client::VectaraClient;
use crate::config::{ClientConfig, ConfigResolver, LoadMethod};
use crate::corpus::CorpusManager;
use crate::document::DocumentManager;
use crate::error::Result;
use crate::lab::LabHelper;
use crate::settings::Settings;

/// Builds a [`Vectara`] from whichever credential source resolves first.
#[derive(Debug, Clone, Default)]
pub struct Factory {
    resolver: ConfigResolver,
    settings: Settings,
    load_method: Option<LoadMethod>,
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.resolver = self.resolver.config(config);
        self
    }

    pub fn config_value(mut self, value: serde_json::Value) -> Self {
        self.resolver = self.resolver.config_value(value);
        self
    }

    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.resolver = self.resolver.config_path(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.resolver = self.resolver.profile(profile);
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the resolver wholesale, e.g. one with injected environment.
    pub fn resolver(mut self, resolver: ConfigResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// The strategy used by the last successful [`build`](Factory::build).
    pub fn load_method(&self) -> Option<LoadMethod> {
        self.load_method
    }

    pub fn build(&mut self) -> Result<Vectara> {
        let resolved = self.resolver.resolve()?;
        info!(
            "building client for customer [{}] with {} auth (profile [{}])",
            resolved.config.customer_id,
            resolved.config.auth.auth_type(),
            resolved.profile
        );
        self.load_method = Some(resolved.method);

        let client = Arc::new(VectaraClient::new(&resolved.config, &self.settings.api)?);
        let corpora = Arc::new(CorpusManager::new(client.clone()));

        Ok(Vectara {
            documents: DocumentManager::new(client.clone()),
            lab: LabHelper::new(corpora.clone()),
            corpora,
            client,
            config: resolved.config,
            load_method: resolved.method,
            settings: self.settings.clone(),
        })
    }
}

/// A configured client with its helper managers.
pub struct Vectara {
    client: Arc<VectaraClient>,
    config: ClientConfig,
    load_method: LoadMethod,
    settings: Settings,
    documents: DocumentManager,
    corpora: Arc<CorpusManager>,
    lab: LabHelper,
}

impl Vectara {
    pub fn client(&self) -> &Arc<VectaraClient> {
        &self.client
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn load_method(&self) -> LoadMethod {
        self.load_method
    }

    pub fn documents(&self) -> &DocumentManager {
        &self.documents
    }

    pub fn corpora(&self) -> &CorpusManager {
        &self.corpora
    }

    pub fn lab(&self) -> &LabHelper {
        &self.lab
    }

    /// A chat manager using the configured session lifetimes. Needs a tokio
    /// runtime; the session reaper starts immediately.
    pub fn create_chat_manager(&self) -> ChatSessionManager {
        ChatSessionManager::new(
            self.client.clone(),
            self.settings.chat.session_expiry(),
            self.settings.chat.cleanup_interval(),
        )
    }
}

//! Credential configuration and its resolution chain.
//!
//! A [`ClientConfig`] is a customer id plus exactly one [`AuthConfig`]
//! variant. [`ConfigResolver`] picks it from the first satisfied source:
//!
//! ```text
//! explicit ClientConfig → explicit JSON mapping → environment → explicit path → ~/.vec_auth.yaml
//!   explicit_typed          explicit_dict           env         path_explicit     path_home
//! ```
//!
//! Sources are never merged. The explicit mapping is final once given: an
//! invalid one stops resolution with [`ConfigError::InvalidSource`]. Failures
//! of the environment and the explicit path are recorded and resolution moves
//! on. Only the home file, being the last source, reports its own error: an
//! invalid profile there is [`ConfigError::InvalidSource`], an absent one is
//! [`ConfigError::Unresolved`] listing every attempt.
//!
//! # Credentials file
//!
//! ```yaml
//! default:
//!   customer_id: "1234567"
//!   auth:
//!     api_key: "zqt_..."
//! lab:
//!   customer_id: "1234567"
//!   auth:
//!     app_client_id: "..."
//!     app_client_secret: "..."
//! ```
//!
//! The auth variant is inferred from which fields are present; there is no
//! tag. Both field sets at once is [`ConfigError::AmbiguousAuth`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// File name looked up in the home directory or an explicit directory.
pub const CONFIG_FILE_NAME: &str = ".vec_auth.yaml";
pub const DEFAULT_PROFILE: &str = "default";

/// Stand-in customer id when the environment does not provide one.
pub const CUSTOMER_ID_PLACEHOLDER: &str = "not-required";

pub const ENV_PROFILE: &str = "VECTARA_PROFILE";
pub const ENV_CUSTOMER_ID: &str = "VECTARA_CUSTOMER_ID";
pub const ENV_API_KEY: &str = "VECTARA_API_KEY";
pub const ENV_OAUTH2_CLIENT_ID: &str = "VECTARA_CLIENT_ID";
pub const ENV_OAUTH2_CLIENT_SECRET: &str = "VECTARA_CLIENT_SECRET";

// ═══════════════════════════════════════════════════════════════════════
// Domain types
// ═══════════════════════════════════════════════════════════════════════

/// Authentication settings. Serialized without a tag, exactly as the
/// credentials file stores them.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AuthConfig {
    ApiKey {
        api_key: String,
    },
    OAuth2 {
        #[serde(skip_serializing_if = "Option::is_none")]
        auth_url: Option<String>,
        app_client_id: String,
        app_client_secret: String,
    },
}

impl AuthConfig {
    pub fn auth_type(&self) -> &'static str {
        match self {
            AuthConfig::ApiKey { .. } => "ApiKey",
            AuthConfig::OAuth2 { .. } => "OAuth2",
        }
    }
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}***", visible)
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthConfig::ApiKey { api_key } => f
                .debug_struct("ApiKey")
                .field("api_key", &mask(api_key))
                .finish(),
            AuthConfig::OAuth2 {
                auth_url,
                app_client_id,
                app_client_secret,
            } => f
                .debug_struct("OAuth2")
                .field("auth_url", auth_url)
                .field("app_client_id", app_client_id)
                .field("app_client_secret", &mask(app_client_secret))
                .finish(),
        }
    }
}

/// Everything needed to authenticate against the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClientConfig")]
pub struct ClientConfig {
    pub customer_id: String,
    pub auth: AuthConfig,
}

impl ClientConfig {
    pub fn api_key(customer_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            auth: AuthConfig::ApiKey {
                api_key: api_key.into(),
            },
        }
    }

    pub fn oauth2(
        customer_id: impl Into<String>,
        app_client_id: impl Into<String>,
        app_client_secret: impl Into<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            auth: AuthConfig::OAuth2 {
                auth_url: None,
                app_client_id: app_client_id.into(),
                app_client_secret: app_client_secret.into(),
            },
        }
    }

    /// Validate a loosely-typed mapping into a [`ClientConfig`].
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let raw: RawClientConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        raw.try_into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAuthConfig {
    api_key: Option<String>,
    auth_url: Option<String>,
    app_client_id: Option<String>,
    app_client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClientConfig {
    customer_id: Option<String>,
    auth: Option<RawAuthConfig>,
}

impl TryFrom<RawAuthConfig> for AuthConfig {
    type Error = ConfigError;

    fn try_from(raw: RawAuthConfig) -> Result<Self, Self::Error> {
        let has_oauth_field = raw.app_client_id.is_some() || raw.app_client_secret.is_some();
        match (raw.api_key, raw.app_client_id, raw.app_client_secret) {
            (Some(_), _, _) if has_oauth_field => Err(ConfigError::AmbiguousAuth),
            (Some(api_key), None, None) => {
                if raw.auth_url.is_some() {
                    return Err(ConfigError::Malformed(
                        "auth_url only applies to OAuth2 authentication".to_string(),
                    ));
                }
                Ok(AuthConfig::ApiKey { api_key })
            }
            (None, Some(app_client_id), Some(app_client_secret)) => Ok(AuthConfig::OAuth2 {
                auth_url: raw.auth_url,
                app_client_id,
                app_client_secret,
            }),
            _ => Err(ConfigError::MissingAuth),
        }
    }
}

impl TryFrom<RawClientConfig> for ClientConfig {
    type Error = ConfigError;

    fn try_from(raw: RawClientConfig) -> Result<Self, Self::Error> {
        let auth = raw.auth.ok_or(ConfigError::MissingAuth)?.try_into()?;
        let customer_id = raw
            .customer_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ConfigError::Malformed("customer_id is required".to_string()))?;
        Ok(ClientConfig { customer_id, auth })
    }
}

/// Which source satisfied a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMethod {
    ExplicitTyped,
    ExplicitDict,
    Env,
    PathExplicit,
    PathHome,
}

impl LoadMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadMethod::ExplicitTyped => "explicit_typed",
            LoadMethod::ExplicitDict => "explicit_dict",
            LoadMethod::Env => "env",
            LoadMethod::PathExplicit => "path_explicit",
            LoadMethod::PathHome => "path_home",
        }
    }
}

impl fmt::Display for LoadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Environment
// ═══════════════════════════════════════════════════════════════════════

/// Reads credentials from `VECTARA_*` variables.
///
/// For a non-default profile the variables carry the profile name:
/// profile `test` reads `VECTARA_TEST_API_KEY`, `VECTARA_TEST_CLIENT_ID`, and
/// so on. An API key wins over an OAuth2 pair.
pub struct EnvConfigLoader {
    vars: HashMap<String, String>,
    profile: Option<String>,
}

impl EnvConfigLoader {
    pub fn from_process(profile: Option<&str>) -> Self {
        Self::from_vars(std::env::vars().collect(), profile)
    }

    pub fn from_vars(vars: HashMap<String, String>, profile: Option<&str>) -> Self {
        Self {
            vars,
            profile: profile
                .filter(|p| *p != DEFAULT_PROFILE)
                .map(str::to_string),
        }
    }

    fn var_name(&self, default_name: &str) -> String {
        match &self.profile {
            Some(profile) => {
                let suffix = default_name.trim_start_matches("VECTARA_");
                format!(
                    "VECTARA_{}_{}",
                    profile.to_uppercase().replace('-', "_"),
                    suffix
                )
            }
            None => default_name.to_string(),
        }
    }

    fn get(&self, default_name: &str) -> Option<&str> {
        self.vars
            .get(&self.var_name(default_name))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn load(&self) -> Result<ClientConfig, ConfigError> {
        let auth = if let Some(api_key) = self.get(ENV_API_KEY) {
            if self.get(ENV_OAUTH2_CLIENT_ID).is_some() {
                debug!("both API key and OAuth2 variables set; using the API key");
            }
            AuthConfig::ApiKey {
                api_key: api_key.to_string(),
            }
        } else if let (Some(client_id), Some(client_secret)) = (
            self.get(ENV_OAUTH2_CLIENT_ID),
            self.get(ENV_OAUTH2_CLIENT_SECRET),
        ) {
            AuthConfig::OAuth2 {
                auth_url: None,
                app_client_id: client_id.to_string(),
                app_client_secret: client_secret.to_string(),
            }
        } else {
            return Err(ConfigError::EnvMissing(format!(
                "{} or {}/{}",
                self.var_name(ENV_API_KEY),
                self.var_name(ENV_OAUTH2_CLIENT_ID),
                self.var_name(ENV_OAUTH2_CLIENT_SECRET)
            )));
        };

        let customer_id = match self.get(ENV_CUSTOMER_ID) {
            Some(id) => id.to_string(),
            None => {
                warn!(
                    "{} not set; customer id is deprecated, using placeholder",
                    self.var_name(ENV_CUSTOMER_ID)
                );
                CUSTOMER_ID_PLACEHOLDER.to_string()
            }
        };

        Ok(ClientConfig { customer_id, auth })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Credentials file
// ═══════════════════════════════════════════════════════════════════════

/// One profile inside a multi-profile YAML file.
///
/// Writes always rewrite the whole file: read every profile, change one key,
/// write everything back.
struct ProfileFile {
    path: PathBuf,
    profile: String,
}

impl ProfileFile {
    fn read_all(&self) -> Result<serde_yaml::Mapping, ConfigError> {
        if !self.path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: self.path.clone(),
            });
        }
        let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        let value: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: self.path.clone(),
                source,
            })?;
        match value {
            serde_yaml::Value::Null => Ok(serde_yaml::Mapping::new()),
            serde_yaml::Value::Mapping(map) => Ok(map),
            _ => Err(ConfigError::Malformed(format!(
                "{} must contain a mapping of profiles",
                self.path.display()
            ))),
        }
    }

    fn write_all(&self, profiles: &serde_yaml::Mapping) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let content = serde_yaml::to_string(profiles).map_err(|source| ConfigError::Yaml {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, content).map_err(io_err)?;
        restrict_permissions(&self.path).map_err(io_err)?;
        Ok(())
    }

    fn key(&self) -> serde_yaml::Value {
        serde_yaml::Value::String(self.profile.clone())
    }

    fn load(&self) -> Result<ClientConfig, ConfigError> {
        info!("loading profile [{}] from {}", self.profile, self.path.display());
        let profiles = self.read_all()?;
        let value = profiles
            .get(self.key())
            .cloned()
            .ok_or_else(|| ConfigError::ProfileNotFound {
                profile: self.profile.clone(),
                path: self.path.clone(),
            })?;
        let raw: RawClientConfig =
            serde_yaml::from_value(value).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        raw.try_into()
    }

    fn has_profile(&self) -> Result<bool, ConfigError> {
        match self.read_all() {
            Ok(profiles) => Ok(profiles.contains_key(self.key())),
            Err(ConfigError::FileNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn save(&self, config: &ClientConfig) -> Result<(), ConfigError> {
        let mut profiles = match self.read_all() {
            Ok(profiles) => profiles,
            Err(ConfigError::FileNotFound { .. }) => serde_yaml::Mapping::new(),
            Err(e) => return Err(e),
        };
        let value = serde_yaml::to_value(config).map_err(|source| ConfigError::Yaml {
            path: self.path.clone(),
            source,
        })?;
        profiles.insert(self.key(), value);
        info!("saving profile [{}] to {}", self.profile, self.path.display());
        self.write_all(&profiles)
    }

    fn delete(&self) -> Result<bool, ConfigError> {
        let mut profiles = self.read_all()?;
        if profiles.remove(self.key()).is_none() {
            return Ok(false);
        }
        info!("deleting profile [{}] from {}", self.profile, self.path.display());
        self.write_all(&profiles)?;
        Ok(true)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn profile_or_default(profile: Option<&str>) -> String {
    profile
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PROFILE)
        .to_string()
}

/// Loads a profile from an explicit file, or from [`CONFIG_FILE_NAME`] inside
/// an explicit directory.
pub struct PathConfigLoader {
    file: ProfileFile,
}

impl PathConfigLoader {
    pub fn new(path: impl AsRef<Path>, profile: Option<&str>) -> Self {
        let path = path.as_ref();
        let file = if path.is_dir() {
            path.join(CONFIG_FILE_NAME)
        } else {
            path.to_path_buf()
        };
        Self {
            file: ProfileFile {
                path: file,
                profile: profile_or_default(profile),
            },
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file.path
    }

    pub fn load(&self) -> Result<ClientConfig, ConfigError> {
        self.file.load()
    }

    pub fn has_profile(&self) -> Result<bool, ConfigError> {
        self.file.has_profile()
    }

    pub fn save(&self, config: &ClientConfig) -> Result<(), ConfigError> {
        self.file.save(config)
    }

    /// Remove the profile. Returns `false` when it was not present.
    pub fn delete(&self) -> Result<bool, ConfigError> {
        self.file.delete()
    }
}

/// Loads a profile from `~/.vec_auth.yaml`.
pub struct HomeConfigLoader {
    file: ProfileFile,
}

impl HomeConfigLoader {
    pub fn new(profile: Option<&str>) -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
        Ok(Self::with_home(home, profile))
    }

    pub fn with_home(home: impl AsRef<Path>, profile: Option<&str>) -> Self {
        Self {
            file: ProfileFile {
                path: home.as_ref().join(CONFIG_FILE_NAME),
                profile: profile_or_default(profile),
            },
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file.path
    }

    pub fn load(&self) -> Result<ClientConfig, ConfigError> {
        self.file.load()
    }

    pub fn has_profile(&self) -> Result<bool, ConfigError> {
        self.file.has_profile()
    }

    pub fn save(&self, config: &ClientConfig) -> Result<(), ConfigError> {
        self.file.save(config)
    }

    pub fn delete(&self) -> Result<bool, ConfigError> {
        self.file.delete()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Resolver
// ═══════════════════════════════════════════════════════════════════════

/// A resolved configuration and where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: ClientConfig,
    pub method: LoadMethod,
    pub profile: String,
}

/// Walks the configuration sources in precedence order.
///
/// The process environment and home directory are used unless replaced with
/// [`env_vars`](ConfigResolver::env_vars) / [`home_dir`](ConfigResolver::home_dir).
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    config: Option<ClientConfig>,
    config_value: Option<serde_json::Value>,
    config_path: Option<PathBuf>,
    profile: Option<String>,
    env: Option<HashMap<String, String>>,
    home_dir: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_value(mut self, value: serde_json::Value) -> Self {
        self.config_value = Some(value);
        self
    }

    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    pub fn home_dir(mut self, home: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home.into());
        self
    }

    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let vars = match &self.env {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        };
        let profile = self
            .profile
            .clone()
            .or_else(|| vars.get(ENV_PROFILE).filter(|p| !p.is_empty()).cloned());
        if let (None, Some(p)) = (&self.profile, &profile) {
            info!("using profile [{}] from {}", p, ENV_PROFILE);
        }
        let profile_name = profile_or_default(profile.as_deref());
        let resolved = |config: ClientConfig,
                        method: LoadMethod|
         -> Result<ResolvedConfig, ConfigError> {
            info!("configuration resolved via [{}]", method);
            Ok(ResolvedConfig {
                config,
                method,
                profile: profile_name.clone(),
            })
        };

        if let Some(config) = &self.config {
            return resolved(config.clone(), LoadMethod::ExplicitTyped);
        }

        if let Some(value) = &self.config_value {
            let config = ClientConfig::from_value(value.clone())
                .map_err(|e| invalid(LoadMethod::ExplicitDict, e))?;
            return resolved(config, LoadMethod::ExplicitDict);
        }

        let mut attempts = Vec::new();

        match EnvConfigLoader::from_vars(vars, profile.as_deref()).load() {
            Ok(config) => return resolved(config, LoadMethod::Env),
            Err(e) => {
                debug!("environment configuration unavailable: {e}");
                attempts.push(format!("env: {e}"));
            }
        }

        if let Some(path) = &self.config_path {
            match PathConfigLoader::new(path, profile.as_deref()).load() {
                Ok(config) => return resolved(config, LoadMethod::PathExplicit),
                Err(e) => {
                    warn!("explicit configuration path unusable, trying home: {e}");
                    attempts.push(format!("path_explicit: {e}"));
                }
            }
        }

        let home_loader = match &self.home_dir {
            Some(home) => Ok(HomeConfigLoader::with_home(home, profile.as_deref())),
            None => HomeConfigLoader::new(profile.as_deref()),
        };
        match home_loader.and_then(|loader| loader.load()) {
            Ok(config) => resolved(config, LoadMethod::PathHome),
            Err(e) if e.is_absent() => {
                attempts.push(format!("path_home: {e}"));
                Err(ConfigError::Unresolved { attempts })
            }
            Err(e) => Err(invalid(LoadMethod::PathHome, e)),
        }
    }
}

fn invalid(method: LoadMethod, error: ConfigError) -> ConfigError {
    ConfigError::InvalidSource {
        strategy: method.as_str(),
        source: Box::new(error),
    }
}

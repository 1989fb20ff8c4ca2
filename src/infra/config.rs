//! Centralized configuration (environment variables + defaults).

use crate::domain::client_kind::ClientKind;
use crate::error::ConfigError;
use chrono::NaiveDate;

pub const DEFAULT_DATASET: &str = "production";
pub const DEFAULT_API_VERSION: &str = "2021-03-25";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Connection settings for the content API. Validated once by
/// [`NextSanity::setup`](crate::NextSanity::setup), never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    project_id: String,
    dataset: String,
    api_version: String,
    token: Option<String>,
    use_cdn: bool,
    api_host: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("project_id", &self.project_id)
            .field("dataset", &self.dataset)
            .field("api_version", &self.api_version)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("use_cdn", &self.use_cdn)
            .field("api_host", &self.api_host)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            token: None,
            use_cdn: true,
            api_host: None,
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_cdn(mut self, use_cdn: bool) -> Self {
        self.use_cdn = use_cdn;
        self
    }

    /// Replaces the whole API origin (scheme + host), e.g. for a proxy.
    pub fn with_api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = Some(api_host.into().trim_end_matches('/').to_string());
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn use_cdn(&self) -> bool {
        self.use_cdn
    }

    pub fn api_host(&self) -> Option<&str> {
        self.api_host.as_deref()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let project_ok = !self.project_id.is_empty()
            && self
                .project_id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !project_ok {
            return Err(ConfigError::InvalidProjectId(self.project_id.clone()));
        }

        let dataset_ok = !self.dataset.is_empty()
            && self.dataset.len() <= 64
            && !self.dataset.starts_with(['_', '-'])
            && self
                .dataset
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if !dataset_ok {
            return Err(ConfigError::InvalidDataset(self.dataset.clone()));
        }

        let version = self.api_version.trim_start_matches('v');
        let version_ok = version == "1"
            || version == "X"
            || NaiveDate::parse_from_str(version, "%Y-%m-%d").is_ok();
        if !version_ok {
            return Err(ConfigError::InvalidApiVersion(self.api_version.clone()));
        }

        if let Some(host) = &self.api_host {
            if !(host.starts_with("http://") || host.starts_with("https://")) {
                return Err(ConfigError::InvalidApiHost(host.clone()));
            }
        }

        Ok(())
    }

    /// Settings for one client kind.
    ///
    /// Anonymous drops the token, preview drops the CDN. Kinds that need a
    /// token fail without one.
    pub fn for_kind(&self, kind: ClientKind) -> Result<ClientConfig, ConfigError> {
        if kind.requires_token() && !self.has_token() {
            return Err(ConfigError::MissingToken { kind });
        }
        let mut config = self.clone();
        match kind {
            ClientKind::Anonymous => config.token = None,
            ClientKind::Authenticated => {}
            ClientKind::Preview => config.use_cdn = false,
        }
        Ok(config)
    }

    /// Loads the client settings from the environment.
    ///
    /// Required:
    /// - `SANITY_PROJECT_ID`
    ///
    /// Optional:
    /// - `SANITY_DATASET` (default: "production")
    /// - `SANITY_API_VERSION` (default: "2021-03-25")
    /// - `SANITY_API_TOKEN`
    /// - `SANITY_USE_CDN` (default: true)
    /// - `SANITY_API_HOST`
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_id = required_var("SANITY_PROJECT_ID")?;
        let dataset = optional_var("SANITY_DATASET").unwrap_or_else(|| DEFAULT_DATASET.to_string());
        let api_version =
            optional_var("SANITY_API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let use_cdn = bool_var("SANITY_USE_CDN", true)?;

        let mut config = ClientConfig::new(project_id, dataset)
            .with_api_version(api_version)
            .with_cdn(use_cdn);
        if let Some(token) = optional_var("SANITY_API_TOKEN") {
            config = config.with_token(token);
        }
        if let Some(host) = optional_var("SANITY_API_HOST") {
            config = config.with_api_host(host);
        }

        tracing::info!(
            project_id = %config.project_id,
            dataset = %config.dataset,
            api_version = %config.api_version,
            use_cdn = config.use_cdn,
            has_token = config.has_token(),
            "content API configuration loaded"
        );
        Ok(config)
    }
}

/// Settings for the HTTP server binary.
#[derive(Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub preview_secret: String,
    /// Emit `SameSite=None; Secure` preview cookies.
    pub secure_cookies: bool,
    /// Preview session lifetime in seconds.
    pub preview_max_age: Option<u64>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("preview_secret", &"<redacted>")
            .field("secure_cookies", &self.secure_cookies)
            .field("preview_max_age", &self.preview_max_age)
            .finish()
    }
}

impl ServerConfig {
    /// Required:
    /// - `SANITY_PREVIEW_SECRET`
    ///
    /// Optional:
    /// - `BIND_ADDR` (default: "0.0.0.0:3000")
    /// - `PREVIEW_SECURE_COOKIES` (default: false)
    /// - `PREVIEW_MAX_AGE_SECS` (default: unset, browser session)
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = optional_var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let preview_secret = required_var("SANITY_PREVIEW_SECRET")?;
        let secure_cookies = bool_var("PREVIEW_SECURE_COOKIES", false)?;
        let preview_max_age = optional_var("PREVIEW_MAX_AGE_SECS")
            .map(|v| {
                v.parse::<u64>().map_err(|_| ConfigError::InvalidVar {
                    name: "PREVIEW_MAX_AGE_SECS",
                    value: v,
                })
            })
            .transpose()?;
        Ok(Self {
            bind_addr,
            preview_secret,
            secure_cookies,
            preview_max_age,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    optional_var(name).ok_or(ConfigError::MissingVar(name))
}

fn bool_var(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional_var(name) {
        None => Ok(default),
        Some(v) => match v.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidVar { name, value: v }),
        },
    }
}

//! Error types shared by the client layer, the live query channel and the preview gate.

use crate::domain::client_kind::ClientKind;

/// Setup-time and call-site configuration failures.
///
/// These are programming or deployment errors: callers should fail loudly
/// instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A client kind that needs an API token was requested without one.
    #[error("couldn't create {kind} client because the Sanity API token is not set")]
    MissingToken { kind: ClientKind },

    #[error("invalid project id '{0}': expected lowercase letters, digits and dashes")]
    InvalidProjectId(String),

    #[error("invalid dataset name '{0}'")]
    InvalidDataset(String),

    #[error("invalid API version '{0}': expected '1', 'X' or a YYYY-MM-DD date")]
    InvalidApiVersion(String),

    #[error("invalid API host '{0}'")]
    InvalidApiHost(String),

    /// A required environment variable is missing or empty.
    #[error("environment variable {0} must be set")]
    MissingVar(&'static str),

    #[error("environment variable {name} has an invalid value '{value}'")]
    InvalidVar { name: &'static str, value: String },

    /// A live query in preview mode was opened outside a Tokio runtime.
    #[error("live queries must be opened from within a Tokio runtime")]
    NoRuntime,
}

/// Failures talking to the content API. Never retried by this crate.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to content API failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("content API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode content API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A live subscription failed. Surfaced through `LiveQueryState::error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("listener could not be opened: {0}")]
    Connect(String),

    /// The server reported a channel error event.
    #[error("listener channel error: {0}")]
    Channel(String),

    #[error("listener disconnected: {0}")]
    Disconnected(String),

    #[error("listener stream ended")]
    Closed,

    #[error("refetch after mutation failed: {0}")]
    Refetch(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageUrlError {
    #[error("malformed image asset reference '{0}'")]
    MalformedRef(String),

    #[error("image source has no asset reference")]
    MissingAsset,
}

/// Umbrella error for operations that can fail on configuration or upstream.
#[derive(Debug, thiserror::Error)]
pub enum SanityError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

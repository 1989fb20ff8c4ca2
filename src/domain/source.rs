//! The capability this crate needs from a content API client.

use crate::error::FetchError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::{Map, Value as JsonValue};

/// Query parameters, bound to `$name` placeholders in the query.
pub type QueryParams = Map<String, JsonValue>;

/// Events delivered by a listener channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenEvent {
    /// Handshake completed; the channel is live.
    Welcome { listener_name: Option<String> },
    /// A document matching the query changed.
    Mutation {
        document_id: Option<String>,
        transition: Option<String>,
    },
    /// The server asks the client to reconnect. Treated as informational.
    Reconnect,
    ChannelError { message: String },
    Disconnect { reason: String },
}

pub type ListenStream = BoxStream<'static, Result<ListenEvent, FetchError>>;

/// Contract for any client able to run queries and listen for changes.
///
/// Both the HTTP client and test doubles implement this, so the selector,
/// the props merger and the live query only see this seam.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Runs one query and returns the raw `result` value.
    async fn fetch(&self, query: &str, params: &QueryParams) -> Result<JsonValue, FetchError>;

    /// Opens a listener for documents matching `query`.
    async fn listen(&self, query: &str, params: &QueryParams) -> Result<ListenStream, FetchError>;
}

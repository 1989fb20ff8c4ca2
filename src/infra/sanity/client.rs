// Responsible for all communication with the Sanity content API.

use crate::domain::client_kind::ClientKind;
use crate::domain::source::{ContentSource, ListenStream, QueryParams};
use crate::error::{ConfigError, FetchError};
use crate::infra::config::ClientConfig;
use crate::infra::sanity::listen;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Above this many characters of query + params, queries are sent as POST.
pub const MAX_GET_QUERY_LEN: usize = 8 * 1024;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: JsonValue,
    #[serde(default)]
    ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    query: &'a str,
    params: &'a QueryParams,
}

/// HTTP client for one [`ClientKind`].
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct ContentClient {
    http: reqwest::Client,
    config: ClientConfig,
    kind: ClientKind,
}

impl std::fmt::Debug for ContentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentClient")
            .field("kind", &self.kind)
            .field("config", &self.config)
            .finish()
    }
}

impl ContentClient {
    /// Builds the client for `kind`; fails if that kind needs a token and
    /// `config` has none.
    pub fn new(
        http: reqwest::Client,
        config: &ClientConfig,
        kind: ClientKind,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http,
            config: config.for_kind(kind)?,
            kind,
        })
    }

    pub fn kind(&self) -> ClientKind {
        self.kind
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn origin(&self, cdn: bool) -> String {
        if let Some(host) = self.config.api_host() {
            return host.to_string();
        }
        let domain = if cdn { "apicdn.sanity.io" } else { "api.sanity.io" };
        format!("https://{}.{}", self.config.project_id(), domain)
    }

    fn versioned(&self, cdn: bool, endpoint: &str) -> String {
        format!(
            "{}/v{}/data/{}/{}",
            self.origin(cdn),
            self.config.api_version().trim_start_matches('v'),
            endpoint,
            self.config.dataset()
        )
    }

    pub fn query_url(&self) -> String {
        self.versioned(self.config.use_cdn(), "query")
    }

    /// The listener is never served from the CDN.
    pub fn listen_url(&self) -> String {
        self.versioned(false, "listen")
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn query_request(&self, query: &str, params: &QueryParams) -> RequestBuilder {
        let pairs = query_pairs(query, params);
        let size: usize = pairs.iter().map(|(k, v)| k.len() + v.len()).sum();
        let request = if size > MAX_GET_QUERY_LEN {
            // The CDN only caches GET; long queries go to the live API.
            self.http
                .post(self.versioned(false, "query"))
                .json(&QueryBody { query, params })
        } else {
            self.http.get(self.query_url()).query(&pairs)
        };
        self.authorize(request)
    }
}

/// `query=<q>` plus one `$name=<json>` pair per parameter.
pub fn query_pairs(query: &str, params: &QueryParams) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len() + 1);
    pairs.push(("query".to_string(), query.to_string()));
    for (name, value) in params {
        pairs.push((format!("${name}"), value.to_string()));
    }
    pairs
}

/// Best-effort human message from an API error body.
fn error_message(body: &str) -> String {
    let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        v.pointer("/error/description")
            .or_else(|| v.get("message"))
            .or_else(|| v.get("error"))
            .and_then(JsonValue::as_str)
            .map(str::to_string)
    });
    from_json.unwrap_or_else(|| body.trim().chars().take(200).collect())
}

async fn ensure_success(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(FetchError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

#[async_trait]
impl ContentSource for ContentClient {
    async fn fetch(&self, query: &str, params: &QueryParams) -> Result<JsonValue, FetchError> {
        tracing::debug!(client_kind = %self.kind, param_count = params.len(), "running content query");

        let response = self.query_request(query, params).send().await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        let parsed: QueryResponse = serde_json::from_str(&body)?;

        tracing::debug!(client_kind = %self.kind, server_ms = ?parsed.ms, "content query finished");
        Ok(parsed.result)
    }

    async fn listen(&self, query: &str, params: &QueryParams) -> Result<ListenStream, FetchError> {
        let mut pairs = query_pairs(query, params);
        pairs.push(("includeResult".to_string(), "false".to_string()));
        pairs.push(("visibility".to_string(), "query".to_string()));

        let request = self
            .http
            .get(self.listen_url())
            .query(&pairs)
            .header(ACCEPT, "text/event-stream");
        let response = self.authorize(request).send().await?;
        let response = ensure_success(response).await?;

        tracing::debug!(client_kind = %self.kind, "listener opened");
        Ok(listen::events(response.bytes_stream()).boxed())
    }
}

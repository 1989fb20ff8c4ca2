//! Request context, query result envelope and the static props merge rule.

use crate::domain::source::QueryParams;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Keys owned by the query result inside `props`.
pub const RESERVED_PROPS: [&str; 3] = ["data", "preview", "params"];

/// What the host hands over for one page generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticPropsContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<QueryParams>,
    /// Payload stored by the preview gate, echoed back while preview is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_data: Option<JsonValue>,
}

impl StaticPropsContext {
    pub fn preview(preview_data: JsonValue) -> Self {
        Self {
            preview: Some(true),
            params: None,
            preview_data: Some(preview_data),
        }
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn is_preview(&self) -> bool {
        self.preview.unwrap_or(false)
    }

    /// Explicit override first, then the route params, then nothing.
    pub fn resolve_params(&self, explicit: Option<&QueryParams>) -> QueryParams {
        explicit
            .or(self.params.as_ref())
            .cloned()
            .unwrap_or_default()
    }
}

/// The minimal contract every consumer of a query result receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanityProps<T = JsonValue> {
    pub data: T,
    pub preview: bool,
    pub params: QueryParams,
}

/// A static props result: the `props` object plus sibling directives such as
/// `revalidate` or `notFound`.
///
/// Used both for the caller's partial result and for the merged output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticProps {
    #[serde(default)]
    pub props: Map<String, JsonValue>,
    #[serde(flatten)]
    pub directives: Map<String, JsonValue>,
}

impl StaticProps {
    pub fn with_prop(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    pub fn with_directive(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.directives.insert(key.into(), value);
        self
    }

    /// Incremental regeneration interval in seconds.
    pub fn revalidate(self, seconds: u64) -> Self {
        self.with_directive("revalidate", JsonValue::from(seconds))
    }

    /// Merges a query envelope into `base`.
    ///
    /// Directives are copied unchanged. Caller props are kept, except that
    /// `data`, `preview` and `params` always come from the envelope.
    pub fn merge(envelope: SanityProps, base: Option<StaticProps>) -> StaticProps {
        let StaticProps {
            props: extra,
            directives,
        } = base.unwrap_or_default();

        let mut props = Map::with_capacity(extra.len() + RESERVED_PROPS.len());
        for (key, value) in extra {
            if RESERVED_PROPS.contains(&key.as_str()) {
                tracing::warn!(prop = %key, "caller prop shadowed by query result");
                continue;
            }
            props.insert(key, value);
        }
        props.insert("data".to_string(), envelope.data);
        props.insert("preview".to_string(), JsonValue::Bool(envelope.preview));
        props.insert("params".to_string(), JsonValue::Object(envelope.params));

        StaticProps { props, directives }
    }
}

//! Shared-secret gate in front of preview mode.
//!
//! One call per request, no state between calls. The session side effect goes
//! through an explicit [`PreviewResponse`] handle.

use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;

pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token";
pub const UNAUTHORIZED: u16 = 401;

/// Builds the preview payload from the incoming request.
pub type PreviewDataFn = fn(&PreviewRequest) -> JsonValue;
/// Picks the redirect target from the incoming request.
pub type RedirectFn = fn(&PreviewRequest) -> String;

/// The query string of a preview request.
#[derive(Debug, Clone, Default)]
pub struct PreviewRequest {
    query: HashMap<String, String>,
}

impl PreviewRequest {
    pub fn new(query: HashMap<String, String>) -> Self {
        Self { query }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            query: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn secret(&self) -> Option<&str> {
        self.param("secret")
    }

    pub fn slug(&self) -> Option<&str> {
        self.param("slug")
    }
}

/// The response side the gate writes to.
pub trait PreviewResponse {
    fn set_preview_data(&mut self, payload: JsonValue);
    fn redirect(&mut self, location: &str);
    fn json(&mut self, status: u16, body: JsonValue);
}

/// What the gate decided for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Unauthorized,
    Enter {
        preview_data: JsonValue,
        location: String,
    },
}

/// `"/" + slug`, always on this origin.
///
/// Control characters are removed (browsers drop tabs and newlines from
/// URLs), then leading whitespace, slashes and backslashes.
pub fn default_redirect(request: &PreviewRequest) -> String {
    let slug: String = request
        .slug()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_ascii_control())
        .collect();
    let slug = slug.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '/' || c == '\\');
    format!("/{}", slug)
}

#[derive(Clone)]
pub struct PreviewGate {
    token: String,
    data: Option<PreviewDataFn>,
    redirect: Option<RedirectFn>,
}

impl std::fmt::Debug for PreviewGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewGate")
            .field("custom_data", &self.data.is_some())
            .field("custom_redirect", &self.redirect.is_some())
            .finish_non_exhaustive()
    }
}

impl PreviewGate {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            data: None,
            redirect: None,
        }
    }

    pub fn with_data(mut self, data: PreviewDataFn) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_redirect(mut self, redirect: RedirectFn) -> Self {
        self.redirect = Some(redirect);
        self
    }

    pub fn authorize(&self, request: &PreviewRequest) -> GateOutcome {
        if request.secret() != Some(self.token.as_str()) {
            tracing::debug!("preview secret rejected");
            return GateOutcome::Unauthorized;
        }

        let preview_data = match self.data {
            Some(data) => data(request),
            None => json!({}),
        };
        let location = match self.redirect {
            Some(redirect) => redirect(request),
            None => default_redirect(request),
        };
        tracing::info!(location = %location, "preview mode enabled");

        GateOutcome::Enter {
            preview_data,
            location,
        }
    }

    /// Runs [`authorize`](Self::authorize) and writes the result to `response`.
    ///
    /// On success preview data is set before the redirect; nothing is written
    /// after it.
    pub fn handle<R: PreviewResponse + ?Sized>(&self, request: &PreviewRequest, response: &mut R) {
        match self.authorize(request) {
            GateOutcome::Unauthorized => response.json(
                UNAUTHORIZED,
                json!({ "message": INVALID_TOKEN_MESSAGE }),
            ),
            GateOutcome::Enter {
                preview_data,
                location,
            } => {
                response.set_preview_data(preview_data);
                response.redirect(&location);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<String>,
        preview_data: Option<JsonValue>,
        location: Option<String>,
        status: Option<u16>,
        body: Option<JsonValue>,
    }

    impl PreviewResponse for Recorder {
        fn set_preview_data(&mut self, payload: JsonValue) {
            self.calls.push("set_preview_data".into());
            self.preview_data = Some(payload);
        }

        fn redirect(&mut self, location: &str) {
            self.calls.push("redirect".into());
            self.location = Some(location.to_string());
        }

        fn json(&mut self, status: u16, body: JsonValue) {
            self.calls.push("json".into());
            self.status = Some(status);
            self.body = Some(body);
        }
    }

    #[test]
    fn valid_secret_sets_empty_data_and_redirects_to_slug() {
        let gate = PreviewGate::new("T");
        let mut res = Recorder::default();
        gate.handle(
            &PreviewRequest::from_pairs([("secret", "T"), ("slug", "about")]),
            &mut res,
        );

        assert_eq!(res.calls, ["set_preview_data", "redirect"]);
        assert_eq!(res.preview_data, Some(json!({})));
        assert_eq!(res.location.as_deref(), Some("/about"));
        assert_eq!(res.status, None);
    }

    #[test]
    fn wrong_secret_is_401_without_preview_data() {
        let gate = PreviewGate::new("T");
        let mut res = Recorder::default();
        gate.handle(
            &PreviewRequest::from_pairs([("secret", "wrong"), ("slug", "about")]),
            &mut res,
        );

        assert_eq!(res.calls, ["json"]);
        assert_eq!(res.status, Some(401));
        assert_eq!(res.body, Some(json!({ "message": "Invalid token" })));
        assert!(res.preview_data.is_none());
        assert!(res.location.is_none());
    }

    #[test]
    fn missing_secret_is_rejected() {
        let gate = PreviewGate::new("T");
        assert_eq!(
            gate.authorize(&PreviewRequest::from_pairs([("slug", "about")])),
            GateOutcome::Unauthorized
        );
    }

    #[test]
    fn comparison_is_exact() {
        let gate = PreviewGate::new("T");
        for secret in ["t", " T", "T ", "TT", ""] {
            assert_eq!(
                gate.authorize(&PreviewRequest::from_pairs([("secret", secret)])),
                GateOutcome::Unauthorized,
                "secret {secret:?}"
            );
        }
    }

    #[test]
    fn custom_callbacks_replace_defaults() {
        let gate = PreviewGate::new("T")
            .with_data(|_| json!({ "role": "editor" }))
            .with_redirect(|_| "/dashboard".to_string());
        let mut res = Recorder::default();
        gate.handle(
            &PreviewRequest::from_pairs([("secret", "T"), ("slug", "about")]),
            &mut res,
        );

        assert_eq!(res.preview_data, Some(json!({ "role": "editor" })));
        assert_eq!(res.location.as_deref(), Some("/dashboard"));
    }

    #[test]
    fn callbacks_see_the_request() {
        let gate = PreviewGate::new("T")
            .with_data(|req| json!({ "doc": req.param("id") }))
            .with_redirect(|req| format!("/posts/{}", req.slug().unwrap_or("index")));
        assert_eq!(
            gate.authorize(&PreviewRequest::from_pairs([
                ("secret", "T"),
                ("slug", "hello"),
                ("id", "drafts.abc")
            ])),
            GateOutcome::Enter {
                preview_data: json!({ "doc": "drafts.abc" }),
                location: "/posts/hello".to_string(),
            }
        );
    }

    #[test]
    fn default_redirect_stays_on_origin() {
        let req = |slug: &str| PreviewRequest::from_pairs([("slug", slug)]);
        assert_eq!(default_redirect(&req("about")), "/about");
        assert_eq!(default_redirect(&req("blog/post-1")), "/blog/post-1");
        assert_eq!(default_redirect(&req("//evil.example")), "/evil.example");
        assert_eq!(default_redirect(&req("\\/evil.example")), "/evil.example");
        assert_eq!(default_redirect(&req("\t/evil.example")), "/evil.example");
        assert_eq!(default_redirect(&req("/\t/\n/evil.example")), "/evil.example");
        assert_eq!(default_redirect(&req(" //evil.example")), "/evil.example");
        assert_eq!(default_redirect(&PreviewRequest::default()), "/");
    }

    #[test]
    fn debug_does_not_leak_token() {
        let rendered = format!("{:?}", PreviewGate::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}

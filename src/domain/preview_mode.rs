//! Preview mode session state, carried in two response-scoped cookies.
//!
//! `__prerender_bypass` holds a random id and `__next_preview_data` holds the
//! signed preview payload bound to that id. Nothing is kept server-side.

use crate::crypto::signing;
use crate::domain::props::StaticPropsContext;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const BYPASS_COOKIE: &str = "__prerender_bypass";
pub const PREVIEW_DATA_COOKIE: &str = "__next_preview_data";

#[derive(Debug, Serialize, Deserialize)]
struct PreviewClaims {
    data: JsonValue,
    bypass: String,
    /// Issued-at, unix seconds.
    iat: i64,
}

/// Issues and reads preview cookies signed with the preview secret.
#[derive(Clone)]
pub struct PreviewMode {
    secret: String,
    secure: bool,
    /// Seconds a session stays valid; `None` keeps it for the browser session.
    max_age: Option<u64>,
}

impl std::fmt::Debug for PreviewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewMode")
            .field("secure", &self.secure)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl PreviewMode {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            secure: false,
            max_age: None,
        }
    }

    /// Expire preview sessions `seconds` after they were issued.
    pub fn with_max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Emit `SameSite=None; Secure` cookies, needed when the studio embeds the site cross-origin.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    fn attributes(&self) -> &'static str {
        if self.secure {
            "Path=/; HttpOnly; SameSite=None; Secure"
        } else {
            "Path=/; HttpOnly; SameSite=Lax"
        }
    }

    /// `Set-Cookie` values that turn preview mode on with `data` as payload.
    pub fn enable_cookies(&self, data: &JsonValue) -> Result<Vec<String>, serde_json::Error> {
        let bypass = signing::random_token();
        let claims = PreviewClaims {
            data: data.clone(),
            bypass: bypass.clone(),
            iat: chrono::Utc::now().timestamp(),
        };
        let payload = serde_json::to_vec(&claims)?;
        let sealed = signing::seal(&self.secret, &payload);
        let mut attrs = self.attributes().to_string();
        if let Some(max_age) = self.max_age {
            attrs.push_str(&format!("; Max-Age={max_age}"));
        }
        Ok(vec![
            format!("{BYPASS_COOKIE}={bypass}; {attrs}"),
            format!("{PREVIEW_DATA_COOKIE}={sealed}; {attrs}"),
        ])
    }

    /// `Set-Cookie` values that expire both preview cookies.
    pub fn clear_cookies(&self) -> Vec<String> {
        let attrs = self.attributes();
        [BYPASS_COOKIE, PREVIEW_DATA_COOKIE]
            .iter()
            .map(|name| {
                format!("{name}=; {attrs}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT")
            })
            .collect()
    }

    /// Preview payload carried by a `Cookie` header, if both cookies are
    /// present, the signature checks out, the bypass ids agree and the
    /// session has not expired.
    pub fn read(&self, cookie_header: Option<&str>) -> Option<JsonValue> {
        self.read_at(cookie_header, chrono::Utc::now().timestamp())
    }

    fn read_at(&self, cookie_header: Option<&str>, now: i64) -> Option<JsonValue> {
        let header = cookie_header?;
        let bypass = cookie_value(header, BYPASS_COOKIE)?;
        let sealed = cookie_value(header, PREVIEW_DATA_COOKIE)?;

        let Some(payload) = signing::unseal(&self.secret, sealed) else {
            tracing::debug!("ignoring preview cookie with bad signature");
            return None;
        };
        let claims: PreviewClaims = serde_json::from_slice(&payload).ok()?;
        if claims.bypass != bypass {
            tracing::debug!("ignoring preview cookie with mismatched bypass id");
            return None;
        }
        if let Some(max_age) = self.max_age {
            let age = now.saturating_sub(claims.iat);
            if age < 0 || age as u64 > max_age {
                tracing::debug!(age, max_age, "ignoring expired preview cookie");
                return None;
            }
        }
        Some(claims.data)
    }

    /// Request context for static props: preview on when the cookies are valid.
    pub fn context(&self, cookie_header: Option<&str>) -> StaticPropsContext {
        match self.read(cookie_header) {
            Some(data) => StaticPropsContext::preview(data),
            None => StaticPropsContext::default(),
        }
    }
}

fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then_some(value)
    })
}

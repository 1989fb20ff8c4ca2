//! The closed set of content clients a setup result can hand out.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which pre-configured client a query should run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    /// No token, served from the CDN when the config allows it.
    Anonymous,
    /// Carries the token; CDN usage follows the config.
    Authenticated,
    /// Carries the token and always bypasses the CDN so drafts are fresh.
    Preview,
}

impl ClientKind {
    /// Kind used to resolve static props for a request.
    ///
    /// Preview wins over `authenticated`.
    pub fn for_request(preview: bool, authenticated: bool) -> Self {
        if preview {
            ClientKind::Preview
        } else if authenticated {
            ClientKind::Authenticated
        } else {
            ClientKind::Anonymous
        }
    }

    pub fn requires_token(self) -> bool {
        match self {
            ClientKind::Anonymous => false,
            ClientKind::Authenticated | ClientKind::Preview => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClientKind::Anonymous => "anonymous",
            ClientKind::Authenticated => "authenticated",
            ClientKind::Preview => "preview",
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

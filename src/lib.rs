pub mod app;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod infra;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::live_query::{LiveQuery, LiveQueryState};
pub use app::sanity_service::{NextSanity, StaticPropsArgs};
pub use domain::{
    ClientKind, ContentSource, GateOutcome, ListenEvent, PreviewGate, PreviewMode, PreviewRequest,
    PreviewResponse, QueryParams, SanityProps, StaticProps, StaticPropsContext,
};
pub use error::{ChannelError, ConfigError, FetchError, ImageUrlError, SanityError};
pub use infra::config::{ClientConfig, ServerConfig};
pub use infra::sanity::{ContentClient, ImageUrlBuilder};

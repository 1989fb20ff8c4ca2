//! Domain types: client kinds, the props envelope, and preview mode.

pub mod client_kind;
pub mod preview_gate;
pub mod preview_mode;
pub mod props;
pub mod source;

pub use client_kind::ClientKind;
pub use preview_gate::{GateOutcome, PreviewGate, PreviewRequest, PreviewResponse};
pub use preview_mode::PreviewMode;
pub use props::{SanityProps, StaticProps, StaticPropsContext};
pub use source::{ContentSource, ListenEvent, ListenStream, QueryParams};

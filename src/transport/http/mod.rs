pub mod router;
pub mod types;
pub mod handlers {
    pub mod common;
    pub mod health;
    pub mod preview;
    pub mod props;
}

pub use router::{create_router, ApiDoc};
pub use types::AppState;

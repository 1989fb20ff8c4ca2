pub mod config;
pub mod sanity;

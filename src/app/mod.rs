pub mod live_query;
pub mod sanity_service;

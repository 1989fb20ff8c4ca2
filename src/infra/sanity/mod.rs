pub mod client;
pub mod image_url;
pub mod listen;

pub use client::ContentClient;
pub use image_url::{Fit, ImageAsset, ImageUrlBuilder};

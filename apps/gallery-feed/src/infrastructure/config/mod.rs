//! Configuration Module
//!
//! Configuration loading for the gallery feed.

mod settings;

pub use settings::{ConfigError, FeedSettings, GalleryConfig, LoginSettings, ServerSettings};

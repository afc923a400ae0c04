//! scrapegate-core - configuration shared by the scrapegate crates.

pub mod config;
pub mod error;

pub use config::ScrapegateConfig;
pub use error::{ConfigError, ConfigResult};

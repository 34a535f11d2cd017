//! Server configuration and startup wiring.

mod config;

pub use config::{AppConfig, ConfigError};

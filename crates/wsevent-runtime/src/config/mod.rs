//! Layered server configuration.
//!
//! See [`ConfigLoader`] for sources and their precedence.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, ServerConfig, SessionConfig,
    SpanEventConfig, WsEventConfig,
};
pub use validation::validate_config;

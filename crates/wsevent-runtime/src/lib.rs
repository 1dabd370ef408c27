//! # wsevent runtime
//!
//! Everything needed to turn endpoint types into a running server:
//!
//! - [`config`]: layered configuration with figment (files, environment, profiles)
//! - [`logging`]: tracing subscriber setup driven by that configuration
//! - [`Server`]: binds the configured address and serves mounted endpoints
//!   until Ctrl+C or cancellation
//!
//! ```rust,ignore
//! use wsevent_runtime::{Server, config::ConfigLoader, logging};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     logging::init_from_config(&config.logging);
//!
//!     Server::new(config)
//!         .mount(Registry::<Chat>::from_members()?, |_peer| Chat::default())
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod server;

pub use config::{ConfigLoader, WsEventConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use server::Server;

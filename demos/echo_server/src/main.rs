//! Echo Server Example
//!
//! A small wsevent server showing the ways a handler can be declared.
//!
//! # Protocol
//!
//! ```text
//! → {"type": "message", "msg": "hi"}     ← {"type": "reply", "msg": "hi"}
//! → {"type": "time"}                     ← {"type": "time", "now": 1760745600}
//! → {"type": "ping"}                     ← {"type": "ping", "time": 1760745600}
//! → {"type": "reverse", "text": "abc"}   ← {"type": "reverse", "text": "cba"}
//! → {"type": "stats"}                    ← {"type": "stats", "messages": 1}
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-server -- --port 9000
//! websocat ws://127.0.0.1:9000/ws
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tracing::info;
use wsevent::prelude::*;
use wsevent::runtime::config::validate_config;

#[derive(Debug, Parser)]
#[command(name = "echo-server", about = "Serve the wsevent echo endpoint")]
struct Args {
    /// Configuration file; `wsevent.toml` is searched for when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `production`
    #[arg(long)]
    profile: Option<String>,

    /// Port to listen on, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,
}

// ============================================================================
// Endpoint
// ============================================================================

#[derive(Serialize, ResponseModel)]
struct Pong {
    time: u64,
}

struct EchoEndpoint {
    peer: PeerInfo,
    received: AtomicU64,
}

impl EchoEndpoint {
    fn new(peer: &PeerInfo) -> Self {
        Self {
            peer: peer.clone(),
            received: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Endpoint for EchoEndpoint {
    async fn on_disconnect(&self, code: CloseCode) {
        info!(
            remote_addr = %self.peer.remote_addr,
            %code,
            messages = self.received.load(Ordering::Relaxed),
            "Client left"
        );
    }
}

#[handlers]
impl EchoEndpoint {
    /// Replies under a different `type` than the event name.
    #[event]
    async fn on_message(&self, msg: String) -> Value {
        self.received.fetch_add(1, Ordering::Relaxed);
        json!({ "type": "reply", "msg": msg })
    }

    #[event]
    async fn time() -> Value {
        json!({ "now": unix_time() })
    }

    #[event("ping", response = Pong)]
    async fn pingpong() -> Value {
        json!({ "time": unix_time() })
    }

    #[event]
    async fn handle_stats(&self) -> Value {
        json!({ "messages": self.received.load(Ordering::Relaxed) })
    }
}

/// Attached to the registry from outside the endpoint.
#[event]
fn on_reverse(text: String) -> Value {
    json!({ "text": text.chars().rev().collect::<String>() })
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile);
    }
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let mut config = loader.load()?;
    if let Some(port) = args.port {
        config.server.port = port;
        validate_config(&config)?;
    }

    logging::init_from_config(&config.logging);

    let registry = Registry::<EchoEndpoint>::from_members()?;
    registry.register(None, on_reverse(), false)?;
    info!(events = ?registry.events(), "Handlers registered");

    Server::new(config)
        .mount(registry, EchoEndpoint::new)
        .run()
        .await?;

    Ok(())
}

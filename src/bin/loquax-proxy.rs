//! Proxy server fronting a locally hosted inference backend.
//!
//! Receives structured chat requests, rebuilds the full prompt, and
//! re-streams the backend's generation records as raw text chunks.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address with the default backend
//! loquax-proxy
//!
//! # Custom listen address and backend
//! loquax-proxy --listen 0.0.0.0:8000 --backend http://localhost:11434
//! ```

use arrrg::CommandLine;

use loquax::proxy::{self, ProxyConfig};

/// Command-line arguments for the loquax-proxy server.
#[derive(arrrg_derive::CommandLine, Debug, Default, PartialEq, Eq)]
struct ProxyArgs {
    /// Address to bind the proxy to.
    #[arrrg(optional, "Address to listen on (default: 127.0.0.1:8000)", "ADDR")]
    listen: Option<String>,

    /// Base URL of the inference backend.
    #[arrrg(optional, "Backend base URL (default: http://localhost:11434)", "URL")]
    backend: Option<String>,
}

/// Main entry point for the loquax-proxy server.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loquax=info".parse().expect("default filter parses")),
        )
        .init();

    let (args, _) = ProxyArgs::from_command_line_relaxed("loquax-proxy [OPTIONS]");

    let mut config = ProxyConfig::new();
    if let Some(backend) = args.backend {
        config.backend_url = backend;
    }
    let listen = args.listen.unwrap_or_else(|| "127.0.0.1:8000".to_string());

    let app = proxy::router(config.clone())?;
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    tracing::info!(addr = %listen, backend = %config.backend_url, "proxy listening");
    axum::serve(listener, app).await?;
    Ok(())
}

//! origin-proxy
//!
//! Forwards every request it receives to one configured origin and relays
//! the answer.
//!
//! ```text
//!     Client ──▶ http::server ──▶ proxy::forwarder ──▶ proxy::client ──▶ Origin
//!                (axum, layers)   (rewrite, headers,   (hyper-util,
//!                                  status dispatch)     no redirects)
//!     Client ◀── relayed body / rewritten 302 / bare 304 ◀──────────────── Origin
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use origin_proxy::config::loader::read_config;
use origin_proxy::config::validation::validate_config;
use origin_proxy::config::ProxyConfig;
use origin_proxy::observability::{logging, metrics};
use origin_proxy::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "origin-proxy")]
#[command(about = "Single-origin HTTP reverse proxy", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Origin URL, overrides `upstream.target_url`.
    #[arg(short, long)]
    target: Option<String>,

    /// Bind address, overrides `listener.bind_address`.
    #[arg(short, long)]
    listen: Option<String>,

    /// Mount path, overrides `upstream.mount_path`.
    #[arg(short, long)]
    mount: Option<String>,

    /// Do not append the client address to X-Forwarded-For.
    #[arg(long)]
    no_forward_ip: bool,
}

impl Cli {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(target) = self.target {
            config.upstream.target_url = target;
        }
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(mount) = self.mount {
            config.upstream.mount_path = mount;
        }
        if self.no_forward_ip {
            config.upstream.forward_client_ip = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("config error: {error}");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        target_url = %config.upstream.target_url,
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "origin-proxy starting"
    );

    if config.observability.metrics_enabled {
        // Already validated.
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

//! Resizr CLI - runs the image-resizing proxy.
//!
//! ```bash
//! resizr -p 9000 --cp ./cache --cm 64 --cf 1024
//! ```
//!
//! Flags override environment variables (`RESIZR_*`), which override the
//! config file, which overrides the defaults.

use anyhow::{Context, Result};
use clap::Parser;
use resizr_core::app::ResizrServer;
use resizr_core::config::ResizrConfig;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "resizr", about = "HTTP image-resizing proxy with a two-tier LRU cache", version)]
struct Cli {
    /// TOML configuration file
    #[arg(short = 'c', long = "config", default_value = "resizr.toml")]
    config: PathBuf,

    /// Address to listen on
    #[arg(short = 'a', long = "addr")]
    addr: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,

    /// Entries kept on disk per cache tier
    #[arg(long = "cf")]
    storage_capacity: Option<usize>,

    /// Entries kept in memory per cache tier
    #[arg(long = "cm")]
    memory_capacity: Option<usize>,

    /// Cache directory
    #[arg(long = "cp")]
    cache_dir: Option<PathBuf>,

    /// Image returned (resized) when a request fails
    #[arg(long = "error-image")]
    error_image: Option<PathBuf>,

    /// error, warn, info, debug or trace
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Exit instead of restarting when the listener fails
    #[arg(long = "no-restart")]
    no_restart: bool,
}

impl Cli {
    fn apply(&self, config: &mut ResizrConfig) {
        if let Some(addr) = &self.addr {
            config.server.host = addr.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(entries) = self.storage_capacity {
            config.cache.storage_capacity = entries;
        }
        if let Some(entries) = self.memory_capacity {
            config.cache.memory_capacity = entries;
        }
        if let Some(dir) = &self.cache_dir {
            config.cache.dir = dir.clone();
        }
        if let Some(path) = &self.error_image {
            config.server.error_image = Some(path.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.to_ascii_lowercase();
        }
        if self.no_restart {
            config.server.restart_on_error = false;
        }
    }
}

/// Cancel `token` on SIGINT or SIGTERM
async fn shutdown_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::warn!("cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                log::warn!("cannot listen for Ctrl-C: {}", e);
                return;
            }
            log::info!("received interrupt");
        }
        _ = terminate => log::info!("received SIGTERM"),
    }
    token.cancel();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ResizrConfig::load_from(&cli.config)?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    resizr_core::logging::init_logging(&config.logging)?;

    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    log::info!("working directory: {}", cwd.display());

    let server = ResizrServer::with_config(config).build()?;

    let token = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(token.clone()));

    server.serve(token).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

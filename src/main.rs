//! masthead server binary.
//!
//! Boots the routing service from a TOML configuration, optionally
//! loads a JSON content snapshot for preview serving, and serves with
//! hot configuration reload until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use masthead::config;
use masthead::config::watcher::ConfigWatcher;
use masthead::index::ContentStore;
use masthead::observability;
use masthead::{DirectiveRenderer, HttpServer, JsonContentStore, Shutdown, Site};

/// Dynamic routing and canonical URL service for a publishing platform.
#[derive(Parser)]
#[command(name = "masthead", version)]
struct Args {
    /// Path to the site configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// JSON content snapshot to serve (preview mode).
    #[arg(long)]
    content: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = config::load_config(&args.config)?;
    observability::logging::init(&config.observability.log_level);

    tracing::info!(
        config = %args.config.display(),
        site_url = %config.site.url,
        bind_address = %config.server.bind_address,
        "masthead starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let site = Site::new(config)?;

    // Preview content, when given. The store must outlive the event
    // consumer; it holds the sender half of the change channel.
    let _store = match &args.content {
        Some(path) => {
            let store = JsonContentStore::load(path)?;
            site.load_content(&store)?;
            if let Some(events) = store.events() {
                site.spawn_event_consumer(events);
            }
            tracing::info!(
                content = %path.display(),
                resources = site.index().len(),
                "content snapshot loaded"
            );
            Some(store)
        }
        None => None,
    };

    // Hot reload: validated configs stream from the watcher; a failed
    // build keeps the current table serving.
    let (watcher, mut config_updates) = ConfigWatcher::new(&args.config);
    let _watcher = watcher.run()?;
    let reload_site = site.clone();
    tokio::spawn(async move {
        while let Some(new_config) = config_updates.recv().await {
            match reload_site.reload(new_config) {
                Ok(generation) => tracing::info!(generation, "configuration reloaded"),
                Err(e) => {
                    tracing::error!(error = %e, "reload failed, keeping current routes")
                }
            }
        }
    });

    let shutdown = Shutdown::new();

    let active_config = site.config();
    let bind = args
        .bind
        .unwrap_or_else(|| active_config.server.bind_address.clone());
    let listener = TcpListener::bind(&bind).await?;

    let server = HttpServer::new(&active_config, site.clone(), Arc::new(DirectiveRenderer));
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.trigger();
        }
    });

    server.run(listener, server_shutdown).await?;
    tracing::info!("shutdown complete");
    Ok(())
}

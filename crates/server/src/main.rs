use std::future::IntoFuture;
use std::io::Read;
use std::path::Path;

use clap::{Parser, Subcommand};
use tracing::info;

use zoo_server::auth::hash_api_key;
use zoo_server::config::ZooConfig;

/// Zoo model-file upload server.
#[derive(Parser, Debug)]
#[command(name = "zoo-server", about = "HTTP server for versioned model file uploads")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "zoo.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (the default).
    Serve,
    /// Run database migrations for the configured store, then exit.
    Migrate,
    /// Report blobs without a committed file and files without a blob.
    Reconcile {
        /// Delete orphan blobs instead of only reporting them.
        #[arg(long)]
        apply: bool,
    },
    /// Print the key hash for `[[auth.api_keys]]`. Reads the raw key from stdin.
    HashKey,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::HashKey) = cli.command {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        println!("{}", hash_api_key(raw.trim()));
        return Ok(());
    }

    // Missing file means defaults.
    let config_exists = Path::new(&cli.config).exists();
    let config: ZooConfig = if config_exists {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        toml::from_str("")?
    };

    match cli.command {
        Some(Commands::Migrate) => {
            zoo_server::telemetry::init_fmt();
            info!(backend = %config.store.backend, "running store migrations...");
            zoo_server::store_factory::migrate(&config.store).await?;
            info!("migrations complete");
            return Ok(());
        }
        Some(Commands::Reconcile { apply }) => {
            zoo_server::telemetry::init_fmt();
            let pipeline = zoo_server::app::build_pipeline(&config).await?;
            let report = pipeline.reconciler().run(apply).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
        Some(Commands::Serve | Commands::HashKey) | None => {}
    }

    let telemetry_guard = zoo_server::telemetry::init(&config.telemetry);
    if !config_exists {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    let state = zoo_server::app::build_state(&config).await?;
    let app = zoo_server::api::router(state);

    let shutdown_timeout = config.server.shutdown_timeout();
    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "zoo-server listening");

    // In-flight uploads get `shutdown_timeout_seconds` after the signal.
    let (stopping_tx, mut stopping_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stopping_tx.send(true);
        })
        .into_future();
    let deadline = async move {
        let _ = stopping_rx.wait_for(|stopping| *stopping).await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => result?,
        () = deadline => {
            tracing::warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "shutdown timeout exceeded, in-flight uploads were dropped"
            );
        }
    }

    telemetry_guard.shutdown();
    info!("zoo-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}

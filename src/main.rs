use clap::{Args, Parser};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::broadcast;
use tracing::{error, info};

use rotation_probe::{
    setup_logging, start_http_server, AppConfig, AppState, HttpProber, InitializationError,
    ServiceError,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// Path to the config file, layered config/ directory when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dump default config and exit
    #[arg(long = "dump-default-config")]
    dump_default: bool,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line args
    let cli = Cli::parse();

    if cli.common.dump_default {
        let config = AppConfig::default();
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    // Load config
    let config = match cli.common.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::new(),
    }
    .map_err(ServiceError::from)?;

    // Initialize logging
    let _log_guard = setup_logging(&config.logging)?;

    info!(
        instance = %config.instance,
        probe_target = %config.probe.target_url,
        "Starting rotation probe"
    );

    let prober = Arc::new(HttpProber::new(&config.probe).map_err(ServiceError::from)?);
    let state = Arc::new(AppState::new(&config, prober));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let mut server = tokio::spawn({
        let state = Arc::clone(&state);
        let http = config.http.clone();
        async move { start_http_server(&http, state, shutdown_rx).await }
    });

    let finished = tokio::select! {
        _ = shutdown_signal() => None,
        result = &mut server => Some(result),
    };

    let result = match finished {
        Some(result) => result,
        None => {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(());
            server.await
        }
    };

    state.stress.shutdown().await;

    match result {
        Ok(Ok(())) => {
            info!("Shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => Err(e.into()),
        Err(e) => Err(ServiceError::from(InitializationError::server(e.to_string())).into()),
    }
}

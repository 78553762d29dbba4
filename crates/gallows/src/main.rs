//! `gallows-server`: runs a hangman server until `CLOSE` is typed on
//! stdin or Ctrl-C is pressed.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use gallows::prelude::*;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Exit status for a server that could not bind or failed while running.
const EXIT_RUNTIME: u8 = 1;
/// Exit status for an unreadable or invalid configuration.
const EXIT_CONFIG: u8 = 2;

/// Multiplayer hangman server.
#[derive(Parser, Debug)]
#[command(name = "gallows-server", version, about)]
struct Args {
    /// Host to bind to (overrides the config file)
    #[arg(short = 'H', long)]
    host: Option<String>,
    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,
    /// JSON config file; unspecified fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "cannot start runtime");
            return ExitCode::from(EXIT_RUNTIME);
        }
    };

    let code = runtime.block_on(serve(config));
    // The console's stdin read never returns on its own; don't wait for it.
    runtime.shutdown_timeout(Duration::from_millis(100));
    code
}

fn load_config(args: &Args) -> Result<ServerConfig, GallowsError> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    config.override_bind(args.host.as_deref(), args.port);
    config.validate()?;
    Ok(config)
}

async fn serve(config: ServerConfig) -> ExitCode {
    let server = match GallowsServer::builder().config(config).build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            return ExitCode::from(EXIT_RUNTIME);
        }
    };

    let shutdown = server.shutdown_handle();
    tokio::spawn(run_console(
        BufReader::new(tokio::io::stdin()),
        shutdown.clone(),
    ));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.trigger();
        }
    });

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::from(EXIT_RUNTIME)
        }
    }
}

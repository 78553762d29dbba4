//! `gallows-client`: plays hangman against a Gallows server from the
//! terminal.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use gallows::prelude::*;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Exit status for a failed connection or a broken session.
const EXIT_RUNTIME: u8 = 1;
/// Exit status for an unusable name or party size.
const EXIT_USAGE: u8 = 2;

/// Terminal client for a Gallows hangman server.
#[derive(Parser, Debug)]
#[command(name = "gallows-client", version, about)]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port
    #[arg(short, long, default_value_t = 5050)]
    port: u16,
    /// Your player name (letters and digits)
    #[arg(short, long)]
    name: String,
    /// How many players you want in your party (1-4)
    #[arg(long, default_value_t = 2)]
    party: u8,
    /// Pause between a frame's header and payload, in milliseconds
    #[arg(long, default_value_t = 100)]
    frame_delay_ms: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    // The terminal belongs to the game; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let me = match PlayerDescriptor::new(args.name, args.party) {
        Ok(me) => me,
        Err(e) => {
            tracing::error!(error = %e, "invalid player");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let addr = format!("{}:{}", args.host, args.port);
    let conn = match TcpConnection::connect(&addr, Duration::from_millis(args.frame_delay_ms)).await
    {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(%addr, error = %e, "cannot connect");
            return ExitCode::from(EXIT_RUNTIME);
        }
    };

    let mut client = GallowsClient::new(
        conn,
        me,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );
    match client.run().await {
        Ok(end) => {
            tracing::info!(?end, "session over");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "session failed");
            ExitCode::from(EXIT_RUNTIME)
        }
    }
}

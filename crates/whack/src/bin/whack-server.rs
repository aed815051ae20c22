//! Runs one whack-a-mole session and exits.
//!
//! ```text
//! whack-server <port> <rows> <cols> <players> <duration-secs> \
//!     [--config f.json] [--websocket] [--report out.json]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use whack::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Whack-a-mole game server")]
struct Args {
    /// Port to listen on
    port: u16,
    /// Board rows
    rows: u32,
    /// Board columns
    cols: u32,
    /// Players required before the session starts
    players: u32,
    /// Session length in seconds
    duration: u64,
    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// JSON file with dwell ranges, scoring rules and the protocol error limit
    #[arg(long)]
    config: Option<PathBuf>,
    /// Serve WebSocket (one message per text frame) instead of raw TCP
    #[arg(long)]
    websocket: bool,
    /// Write the final session report here as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), WhackError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SessionConfig::default(),
    };
    // Positional arguments always win over the file.
    config.rows = args.rows;
    config.cols = args.cols;
    config.players = args.players;
    config.duration_ms = args.duration.saturating_mul(1_000);

    let builder = WhackServer::builder()
        .bind(&format!("{}:{}", args.host, args.port))
        .config(config);

    let report = if args.websocket {
        serve(builder.build_websocket().await?).await?
    } else {
        serve(builder.build_tcp().await?).await?
    };

    for player in &report.players {
        tracing::info!(
            player_id = %player.player,
            score = player.score,
            outcome = %player.outcome,
            connected = player.connected,
            "final result"
        );
    }
    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        tracing::info!(path = %path.display(), "report written");
    }
    Ok(())
}

async fn serve<T: Transport>(mut server: WhackServer<T>) -> Result<SessionReport, WhackError> {
    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received");
            shutdown.cancel();
        }
    });
    server.run_session().await
}

//! boardsync CLI
//!
//! # Commands
//!
//! - `serve` - Run the board synchronization server
//! - `inspect` - List or dump boards stored in the durable cache
//! - `version` - Show version information

use boardsync_core::Board;
use boardsync_server::{BoardServer, ServerConfig};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// boardsync command-line tools.
#[derive(Parser)]
#[command(name = "boardsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the board synchronization server
    Serve {
        /// Listen port (overrides the PORT environment variable)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List or dump boards stored in the durable cache
    Inspect {
        /// Dump one board's JSON instead of listing all boards
        #[arg(short, long)]
        board: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve { port } => {
            let mut config = ServerConfig::from_env();
            if let Some(port) = port {
                config.bind_addr.set_port(port);
            }
            serve(config)?;
        }
        Commands::Inspect { board } => {
            let config = ServerConfig::from_env();
            inspect(&config, board.as_deref())?;
        }
        Commands::Version => {
            println!("boardsync v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Runs the server until Ctrl-C, then flushes pending saves.
fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let server = Arc::new(BoardServer::new(config)?);
    let runtime = tokio::runtime::Runtime::new()?;

    let result = runtime.block_on(async {
        tokio::select! {
            result = boardsync_server::run(Arc::clone(&server)) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    });

    server.close()?;
    result?;
    Ok(())
}

/// Lists cached boards, or dumps one board's JSON.
fn inspect(
    config: &ServerConfig,
    board: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = config
        .cache_url
        .as_deref()
        .ok_or("CACHE_URL is not set; there is no cache to inspect")?;
    let cache = boardsync_cache::open(url)?;

    if let Some(board) = board {
        let id = board.parse::<boardsync_core::BoardId>()?;
        let key = boardsync_server::board_key(&config.cache_prefix, id);
        match cache.get(&key)? {
            Some(json) => {
                let value: serde_json::Value = serde_json::from_str(&json)?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            None => println!("board {board} is not in the cache"),
        }
        return Ok(());
    }

    let prefix = format!("{}board-", config.cache_prefix);
    let mut entries = cache.scan_prefix(&prefix)?;
    entries.sort();
    println!("{} cached board(s)", entries.len());
    for (key, json) in entries {
        match Board::from_json(&json) {
            Ok(board) => println!(
                "  {}  lines={}  notes={}  created={}",
                board.board_id,
                board.line_hist.len(),
                board.note_list.len(),
                board
                    .created_timestamp
                    .map_or_else(|| "-".to_string(), |ts| ts.to_string()),
            ),
            Err(err) => println!("  {key}  (unparseable: {err})"),
        }
    }
    Ok(())
}

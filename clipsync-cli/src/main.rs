//! ClipSync host: entry point.
//!
//! ```text
//! clipsync                        Run interactively
//! clipsync --peer <address>       Override the configured peer
//! clipsync --config <path>        Load a custom config TOML
//! clipsync --gen-config           Write default config to stdout
//! clipsync --init-config          Create the --config file with defaults
//! clipsync --no-clipboard         Keep clipboard text in memory
//! clipsync --json                 Print session events as JSON lines
//! ```

use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clipsync_core::{
    ClipboardAccess, ClipboardBridge, DirectoryImageStore, MemoryClipboard, SystemClipboard,
    WsConnector,
};
use clipsync_cli::config::ClipSyncConfig;
use clipsync_cli::host::{ClipSyncHost, HELP, forward_events};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "clipsync", about = "Clipboard sync client for a desktop peer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "clipsync.toml")]
    config: PathBuf,

    /// Peer address (`ws://<ipv4>:<port>/ws`); overrides the config file.
    #[arg(short, long)]
    peer: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Write the default configuration to the `--config` path and exit.
    /// An existing file is left untouched.
    #[arg(long, conflicts_with = "gen_config")]
    init_config: bool,

    /// Do not touch the system clipboard.
    #[arg(long)]
    no_clipboard: bool,

    /// Print session events as JSON lines.
    #[arg(long)]
    json: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ClipSyncConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // --init-config: bootstrap a config file and exit.
    if cli.init_config {
        ClipSyncConfig::write_default(&cli.config)?;
        println!("wrote default configuration to {}", cli.config.display());
        return Ok(());
    }

    // Load config.
    let mut config = ClipSyncConfig::load(&cli.config);
    if let Some(peer) = cli.peer {
        config.network.peer_address = peer;
    }
    if cli.no_clipboard {
        config.clipboard.system = false;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.file.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logging.file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }

    info!("clipsync v{}", env!("CARGO_PKG_VERSION"));
    info!("peer: {}", config.peer_address().unwrap_or("<none>"));
    info!("images: {}", config.image_dir().display());
    info!(
        "retry: {} attempts, {} ms apart",
        config.retry.max_attempts, config.retry.backoff_delay_ms
    );

    let clipboard: Box<dyn ClipboardAccess> = if config.clipboard.system {
        match SystemClipboard::new() {
            Ok(clipboard) => Box::new(clipboard),
            Err(e) => {
                warn!("{e}; falling back to an in-memory clipboard");
                Box::new(MemoryClipboard::new())
            }
        }
    } else {
        Box::new(MemoryClipboard::new())
    };
    let images = DirectoryImageStore::new(config.image_dir());
    let bridge = ClipboardBridge::new(clipboard, Box::new(images))
        .with_max_image_bytes(config.storage.max_image_bytes);

    let (mut host, events) = ClipSyncHost::new(config, WsConnector, bridge);
    let printer = tokio::spawn(forward_events(events, cli.json));

    // Ctrl-C handler.
    let stop = host.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    println!("{HELP}");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    host.run(stdin).await?;

    // Closing the controller ends the event stream.
    drop(host);
    let _ = printer.await;

    // A blocking stdin read cannot be cancelled; exit instead of waiting on it.
    std::process::exit(0)
}

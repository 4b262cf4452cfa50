//! Headless session entrypoint: tails the transcript and logs fold
//! decisions instead of drawing them.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use chatfold_core::Config;
use chatfold_session::feed::start_feed_watcher;
use chatfold_session::render::{spawn_log_renderer, SessionControl};
use chatfold_session::runtime_config::{init_tracing, load_config};
use chatfold_session::session;
use chatfold_session::shutdown_signal::shutdown_signal;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transcript path, overriding the configured feed
    #[arg(long)]
    feed: Option<PathBuf>,

    /// Validate configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(feed) = args.feed {
        config.feed.path = feed;
    }

    init_tracing(&config);
    let config_source = if args.config.is_some() {
        "custom"
    } else {
        match Config::default_config_path() {
            Ok(path) if path.exists() => "default",
            _ => "builtin",
        }
    };
    info!(config_source, "configuration loaded");

    if args.check {
        info!("configuration loaded successfully");
        return Ok(());
    }

    let (render_tx, render_rx) = tokio::sync::mpsc::unbounded_channel();
    // Held open so the session keeps its control branch alive; the headless
    // runner has no badge surface to reset from.
    let (_control_tx, control_rx) = tokio::sync::mpsc::unbounded_channel::<SessionControl>();

    let renderer = spawn_log_renderer(render_rx);
    let feed_rx = start_feed_watcher(config.feed.clone());
    let session = tokio::spawn(session::run(config, feed_rx, control_rx, render_tx));

    info!("chatfold-session running");
    shutdown_signal().await;

    session.abort();
    renderer.abort();
    Ok(())
}

//! voiceform-daemon: voice-driven question answering and editing engine
//!
//! The daemon loads a fixed question list, listens for voice commands on
//! a single main capture session, and lets the user dictate answers and
//! edit them sentence by sentence:
//! - answer dictation and text insertion run as sub-sessions that
//!   suspend the main session while they own the capture device
//! - edits are sentence-granular operations on rich-text answer buffers
//! - answers persist across runs and export as a paginated document
//!
//! Transcripts come from the line-driven capture backend (stdin stands
//! in for a speech recognizer); authentication, HTTP serving, and page
//! rendering live outside this process.

mod capture;
mod command;
mod config;
mod editor;
mod error;
mod events;
mod export;
mod lifecycle;
mod questions;
mod session;
mod store;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::capture::stdin::StdinCapture;
use crate::capture::LogSpeaker;
use crate::config::Config;
use crate::events::StateEvent;
use crate::export::{ExportAdapter, FileExporter};
use crate::lifecycle::ShutdownSignal;
use crate::questions::QuestionSet;
use crate::session::SessionManager;
use crate::store::FsStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "voiceform-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.data_dir, "configuration loaded");

    let questions = QuestionSet::load(&config.questions_path);
    let store = FsStore::open(&config.store_path).context("failed to open answer store")?;

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Channels for inter-component communication
    // Capture backend -> session manager
    let (capture_tx, capture_rx) = mpsc::channel(32);
    // Session manager -> observers (for broadcasting state events)
    let (event_tx, _event_rx) = broadcast::channel::<StateEvent>(64);

    let capture = StdinCapture::spawn(capture_tx);

    let mut manager = SessionManager::new(
        questions,
        Box::new(capture),
        Box::new(store),
        Box::new(LogSpeaker),
        event_tx.clone(),
    );

    let mut event_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the session manager (processes capture events and timers)
        _ = manager.run(capture_rx) => {
            info!("session manager exited");
        }

        // Mirror state events into the log
        _ = async {
            loop {
                match event_rx.recv().await {
                    Ok(event) => {
                        info!(%event, "state event");
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "state event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("state event handler exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    manager.persist_all();

    let mut exporter = FileExporter::new(config.export_path.clone());
    if let Err(e) = exporter.export(&manager.export_items()) {
        warn!(?e, "failed to export answers");
    }

    info!("voiceform-daemon stopped");

    Ok(())
}

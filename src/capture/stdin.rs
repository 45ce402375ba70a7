//! Line-driven capture backend
//!
//! Stands in for a real speech recognizer: every stdin line becomes one
//! final transcript for whichever session kind is currently started.
//! Lines arriving with no session started are dropped. Runs on a
//! spawned reader task feeding the engine's capture channel.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::CaptureError;

use super::{CaptureControl, CaptureEvent, SessionKind};

/// Capture backend reading final transcripts from stdin
pub struct StdinCapture {
    active: Arc<Mutex<Option<SessionKind>>>,
    event_tx: mpsc::Sender<(SessionKind, CaptureEvent)>,
}

impl StdinCapture {
    /// Spawn the reader task and return the control handle
    pub fn spawn(event_tx: mpsc::Sender<(SessionKind, CaptureEvent)>) -> Self {
        let active = Arc::new(Mutex::new(None));

        let reader_active = Arc::clone(&active);
        let reader_tx = event_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        let kind = reader_active.lock().ok().and_then(|a| *a);
                        match kind {
                            Some(kind) => {
                                if reader_tx
                                    .send((kind, CaptureEvent::Final(line.to_string())))
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                            }
                            None => debug!(%line, "no capture session started, line dropped"),
                        }
                    }
                    Ok(None) => {
                        info!("stdin closed, capture input finished");
                        break;
                    }
                    Err(e) => {
                        warn!(?e, "stdin read error");
                        break;
                    }
                }
            }
        });

        Self { active, event_tx }
    }
}

impl CaptureControl for StdinCapture {
    fn start(&mut self, kind: SessionKind) -> Result<(), CaptureError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| CaptureError::Unavailable("capture state poisoned".to_string()))?;
        *active = Some(kind);
        debug!(%kind, "capture session started");
        Ok(())
    }

    fn stop(&mut self, kind: SessionKind) {
        if let Ok(mut active) = self.active.lock() {
            if *active == Some(kind) {
                *active = None;
            }
        }
        debug!(%kind, "capture session stopped");
        // The engine observes the end of the cycle as an event, the same
        // way a real recognizer would deliver it
        let _ = self.event_tx.try_send((kind, CaptureEvent::Ended));
    }
}

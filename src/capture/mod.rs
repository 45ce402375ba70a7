//! Speech capture abstractions
//!
//! The engine never talks to an audio stack directly: it drives a
//! `CaptureControl` implementation and consumes `(SessionKind,
//! CaptureEvent)` pairs from an mpsc channel. The bundled backend turns
//! stdin lines into final transcripts; tests use a recording fake.

pub mod session;
pub mod stdin;

use tracing::info;

use crate::error::CaptureError;

/// Which capture session an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Long-lived command listening
    Main,
    /// Answer dictation sub-session
    Answer,
    /// Text insertion sub-session
    Insert,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::Main => write!(f, "main"),
            SessionKind::Answer => write!(f, "answer"),
            SessionKind::Insert => write!(f, "insert"),
        }
    }
}

/// One transcript/lifecycle event from the capture layer
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// Interim transcript; live preview only, never persisted
    Partial(String),
    /// Final transcript fragment
    Final(String),
    /// The underlying capture cycle ended
    Ended,
    /// The capture cycle failed
    Error(CaptureError),
}

/// Control surface for starting and stopping capture cycles
pub trait CaptureControl: Send {
    fn start(&mut self, kind: SessionKind) -> Result<(), CaptureError>;
    fn stop(&mut self, kind: SessionKind);
}

/// Speaks text back to the user. Fire-and-forget: implementations must
/// not block the caller.
pub trait SpeechOutput: Send {
    fn speak(&self, text: &str);
}

/// Default `SpeechOutput` that logs the utterance instead of synthesizing it
pub struct LogSpeaker;

impl SpeechOutput for LogSpeaker {
    fn speak(&self, text: &str) {
        info!(%text, "read-back");
    }
}

//! Events emitted by the session manager
//!
//! Broadcast on mode transitions and capture lifecycle changes so an
//! external surface (status indicator, UI) can mirror engine state
//! without holding any state of its own.

use serde::{Deserialize, Serialize};

/// Events emitted by the session manager during transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// The main command-listening session is live
    ListeningStarted,

    /// Answer dictation began for a question
    AnswerRecordingStarted { question: usize },

    /// Answer dictation ended for a question
    AnswerRecordingStopped { question: usize },

    /// Text insertion began at the cursor of a question's answer
    TextInsertionStarted { question: usize },

    /// Text insertion ended
    TextInsertionStopped { question: usize },

    /// An answer entered edit mode
    EditModeEntered { question: usize },

    /// The edited answer was persisted and edit mode left
    EditModeExited { question: usize },

    /// Speech capture is unavailable; the engine is idle
    CaptureFailed { message: String },
}

impl std::fmt::Display for StateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateEvent::ListeningStarted => write!(f, "LISTENING_STARTED"),
            StateEvent::AnswerRecordingStarted { question } => {
                write!(f, "ANSWER_RECORDING_STARTED (q{})", question)
            }
            StateEvent::AnswerRecordingStopped { question } => {
                write!(f, "ANSWER_RECORDING_STOPPED (q{})", question)
            }
            StateEvent::TextInsertionStarted { question } => {
                write!(f, "TEXT_INSERTION_STARTED (q{})", question)
            }
            StateEvent::TextInsertionStopped { question } => {
                write!(f, "TEXT_INSERTION_STOPPED (q{})", question)
            }
            StateEvent::EditModeEntered { question } => {
                write!(f, "EDIT_MODE_ENTERED (q{})", question)
            }
            StateEvent::EditModeExited { question } => {
                write!(f, "EDIT_MODE_EXITED (q{})", question)
            }
            StateEvent::CaptureFailed { message } => {
                write!(f, "CAPTURE_FAILED ({})", message)
            }
        }
    }
}

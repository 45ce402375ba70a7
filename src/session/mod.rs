//! Session state: the process-wide Mode and its manager

pub mod manager;

pub use manager::{SessionManager, Timer};

/// The single source of truth for which commands are legal and which
/// capture session variant is running. Exactly one Mode is active at
/// any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No capture running, waiting to start or recovering from an error
    Idle,
    /// Main session live, waiting for a voice command
    ListeningForCommand,
    /// Dictating an answer for the question at this index
    RecordingAnswer(usize),
    /// Editing the answer at this index; the main session supplies the
    /// edit commands
    EditingAnswer(usize),
    /// Inserting dictated text at the cursor of the answer at this index
    InsertingText(usize),
}

impl Default for Mode {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Idle => write!(f, "Idle"),
            Mode::ListeningForCommand => write!(f, "ListeningForCommand"),
            Mode::RecordingAnswer(i) => write!(f, "RecordingAnswer({})", i),
            Mode::EditingAnswer(i) => write!(f, "EditingAnswer({})", i),
            Mode::InsertingText(i) => write!(f, "InsertingText({})", i),
        }
    }
}

//! Per-cycle speech session state machine
//!
//! A `SpeechSession` tracks exactly one capture cycle:
//! `Stopped -> Starting -> Active -> Stopped`. Instances are created
//! fresh for every cycle and discarded once stopped; suspend/resume
//! never reuses one. The auto-restart decision is taken in one place,
//! `on_ended`, instead of being scattered across end handlers.

use tracing::debug;

use super::SessionKind;

/// Lifecycle state of one capture cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Starting,
    Active,
    StoppingIntentionally,
}

/// One continuous speech-capture cycle
#[derive(Debug)]
pub struct SpeechSession {
    kind: SessionKind,
    state: SessionState,
    auto_restart: bool,
    intentional_stop: bool,
}

impl SpeechSession {
    pub fn new(kind: SessionKind, auto_restart: bool) -> Self {
        Self {
            kind,
            state: SessionState::Stopped,
            auto_restart,
            intentional_stop: false,
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_starting(&self) -> bool {
        self.state == SessionState::Starting
    }

    pub fn auto_restart(&self) -> bool {
        self.auto_restart
    }

    pub fn set_auto_restart(&mut self, auto_restart: bool) {
        self.auto_restart = auto_restart;
    }

    pub fn stopped_intentionally(&self) -> bool {
        self.intentional_stop
    }

    /// Begin the cycle. Idempotent while already starting or active;
    /// returns whether the call actually initiated a start.
    pub fn begin(&mut self) -> bool {
        match self.state {
            SessionState::Stopped => {
                self.state = SessionState::Starting;
                true
            }
            SessionState::Starting | SessionState::Active => {
                debug!(kind = %self.kind, "session already starting or active");
                false
            }
            SessionState::StoppingIntentionally => {
                debug!(kind = %self.kind, "session is stopping, start ignored");
                false
            }
        }
    }

    /// The capture backend confirmed the cycle is live
    pub fn mark_active(&mut self) {
        if self.state == SessionState::Starting {
            self.state = SessionState::Active;
        }
    }

    /// Request a stop. An intentional stop pins the session so the
    /// auto-restart policy cannot fire for this cycle.
    pub fn request_stop(&mut self, intentional: bool) {
        if intentional {
            self.intentional_stop = true;
            self.state = SessionState::StoppingIntentionally;
        }
    }

    /// The capture cycle has ended. Returns whether the policy asks for
    /// a restart: only when the stop was not intentional and
    /// auto-restart is on.
    pub fn on_ended(&mut self) -> bool {
        self.state = SessionState::Stopped;
        self.auto_restart && !self.intentional_stop
    }

    /// The capture cycle failed; the session is stopped. Restart policy
    /// is up to the caller.
    pub fn on_error(&mut self) {
        self.state = SessionState::Stopped;
    }
}

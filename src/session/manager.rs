//! Session manager: owns the Mode, the capture sessions, and dispatch
//!
//! Exactly one main (command-listening) session exists; answer dictation
//! and text insertion run as transient sub-sessions that suspend the
//! main session first and hand control back through debounce timers.
//! The handler methods are synchronous; `run` adapts them to the tokio
//! event loop, feeding elapsed timers back in as events.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::capture::session::SpeechSession;
use crate::capture::{CaptureControl, CaptureEvent, SessionKind, SpeechOutput};
use crate::command::{self, Command};
use crate::editor::{AnswerBuffer, EditModeController};
use crate::error::CaptureError;
use crate::events::StateEvent;
use crate::questions::QuestionSet;
use crate::store::PersistenceAdapter;

use super::Mode;

/// Debounce and restart timers fed back into the engine when they elapse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Restart the main session after a sub-session ended, once the
    /// capture device has settled
    ResumeMain,
    /// End of the post-stop window during which a trailing word of the
    /// stop phrase must not be parsed as a command
    ClearSuppression,
    /// Re-create the main session after it ended on its own
    RestartMain,
}

impl Timer {
    pub fn delay(self) -> Duration {
        match self {
            Timer::ResumeMain => Duration::from_millis(500),
            Timer::ClearSuppression => Duration::from_millis(1000),
            Timer::RestartMain => Duration::from_millis(100),
        }
    }
}

/// Owns all mutable session state; driven by one event loop
pub struct SessionManager {
    mode: Mode,
    main: SpeechSession,
    sub: Option<SpeechSession>,
    suppress_commands: bool,
    questions: QuestionSet,
    buffers: Vec<AnswerBuffer>,
    editor: EditModeController,
    capture: Box<dyn CaptureControl>,
    store: Box<dyn PersistenceAdapter>,
    speaker: Box<dyn SpeechOutput>,
    event_tx: broadcast::Sender<StateEvent>,
}

impl SessionManager {
    /// Build the manager, seeding answer buffers from the store
    pub fn new(
        questions: QuestionSet,
        capture: Box<dyn CaptureControl>,
        mut store: Box<dyn PersistenceAdapter>,
        speaker: Box<dyn SpeechOutput>,
        event_tx: broadcast::Sender<StateEvent>,
    ) -> Self {
        let mut buffers = Vec::with_capacity(questions.len());
        for q in questions.iter() {
            let buf = match store.load(q.index) {
                Ok(Some(raw)) => AnswerBuffer::from_rich_text(q.index, &raw),
                Ok(None) => AnswerBuffer::new(q.index),
                Err(e) => {
                    warn!(index = q.index, ?e, "failed to load stored answer");
                    AnswerBuffer::new(q.index)
                }
            };
            buffers.push(buf);
        }

        Self {
            mode: Mode::Idle,
            main: SpeechSession::new(SessionKind::Main, true),
            sub: None,
            suppress_commands: false,
            questions,
            buffers,
            editor: EditModeController::new(),
            capture,
            store,
            speaker,
            event_tx,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn buffer(&self, index: usize) -> Option<&AnswerBuffer> {
        self.buffers.get(index)
    }

    /// Number of capture sessions currently live. The invariant the rest
    /// of this module maintains is that this never exceeds one.
    pub fn active_capture_sessions(&self) -> usize {
        self.main.is_active() as usize
            + self.sub.as_ref().map_or(0, |s| s.is_active() as usize)
    }

    /// Bring up the main command-listening session
    pub fn start_listening(&mut self) -> Vec<Timer> {
        if !self.main.begin() {
            return Vec::new();
        }
        match self.capture.start(SessionKind::Main) {
            Ok(()) => {
                self.main.mark_active();
                self.set_mode(Mode::ListeningForCommand);
                self.emit(StateEvent::ListeningStarted);
                Vec::new()
            }
            Err(e) => self.handle_capture_error(SessionKind::Main, e),
        }
    }

    /// Process one capture event; returns timers to schedule
    pub fn handle_capture(&mut self, kind: SessionKind, event: CaptureEvent) -> Vec<Timer> {
        match event {
            CaptureEvent::Partial(text) => {
                // Live preview only; never reaches durable state
                debug!(%kind, %text, "partial transcript");
                Vec::new()
            }
            CaptureEvent::Final(text) => self.handle_final(kind, text),
            CaptureEvent::Ended => self.handle_ended(kind),
            CaptureEvent::Error(e) => self.handle_capture_error(kind, e),
        }
    }

    /// Process an elapsed timer; returns follow-up timers to schedule
    pub fn handle_timer(&mut self, timer: Timer) -> Vec<Timer> {
        match timer {
            Timer::ClearSuppression => {
                debug!("post-stop suppression window elapsed");
                self.suppress_commands = false;
                Vec::new()
            }
            Timer::ResumeMain => self.resume_main(),
            Timer::RestartMain => {
                if !self.main.auto_restart() || self.main.stopped_intentionally() {
                    return Vec::new();
                }
                self.resume_main()
            }
        }
    }

    /// Drive the manager from the capture channel until it closes
    pub async fn run(&mut self, mut capture_rx: mpsc::Receiver<(SessionKind, CaptureEvent)>) {
        let (timer_tx, mut timer_rx) = mpsc::channel::<Timer>(16);

        for timer in self.start_listening() {
            schedule(timer, timer_tx.clone());
        }

        loop {
            let timers = tokio::select! {
                event = capture_rx.recv() => match event {
                    Some((kind, event)) => self.handle_capture(kind, event),
                    None => break,
                },
                Some(timer) = timer_rx.recv() => self.handle_timer(timer),
            };
            for timer in timers {
                schedule(timer, timer_tx.clone());
            }
        }

        info!("capture channel closed, session manager stopping");
    }

    /// Answers in question order for the export consumer
    pub fn export_items(&self) -> Vec<crate::export::ExportItem> {
        self.questions
            .iter()
            .map(|q| crate::export::ExportItem {
                index: q.index,
                question_text: q.text.clone(),
                plain_answer_text: self
                    .buffers
                    .get(q.index)
                    .map(|b| b.plain_text().trim().to_string())
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Persist every buffer; used at shutdown
    pub fn persist_all(&mut self) {
        for buf in &self.buffers {
            if let Err(e) = self.store.save(buf.index(), &buf.rich_text()) {
                warn!(index = buf.index(), ?e, "failed to persist answer");
            }
        }
    }

    fn handle_final(&mut self, kind: SessionKind, text: String) -> Vec<Timer> {
        match kind {
            SessionKind::Main => self.handle_main_final(text),
            SessionKind::Answer => self.handle_answer_final(text),
            SessionKind::Insert => self.handle_insert_final(text),
        }
    }

    fn handle_main_final(&mut self, text: String) -> Vec<Timer> {
        if self.suppress_commands {
            debug!(transcript = %text, "inside post-stop window, transcript ignored");
            return Vec::new();
        }
        match self.mode {
            Mode::ListeningForCommand | Mode::EditingAnswer(_) => {
                match command::interpret(&text, self.mode) {
                    Some(cmd) => {
                        info!(?cmd, "command recognized");
                        self.dispatch(cmd)
                    }
                    None => {
                        debug!(transcript = %text, "no command recognized");
                        Vec::new()
                    }
                }
            }
            _ => {
                debug!(mode = %self.mode, "main transcript ignored in current mode");
                Vec::new()
            }
        }
    }

    fn handle_answer_final(&mut self, text: String) -> Vec<Timer> {
        let Mode::RecordingAnswer(index) = self.mode else {
            debug!("stale answer transcript dropped");
            return Vec::new();
        };
        if text.to_lowercase().contains(command::STOP_PHRASE) {
            return self.stop_answer_recording(index);
        }
        match self.buffers.get_mut(index) {
            Some(buf) => buf.append_dictation(&text),
            None => warn!(index, "no buffer for dictation target"),
        }
        Vec::new()
    }

    fn handle_insert_final(&mut self, text: String) -> Vec<Timer> {
        let Mode::InsertingText(index) = self.mode else {
            debug!("stale insertion transcript dropped");
            return Vec::new();
        };
        if text.to_lowercase().contains(command::STOP_PHRASE) {
            if let Some(sub) = self.sub.as_mut() {
                sub.request_stop(true);
            }
            self.capture.stop(SessionKind::Insert);
            self.set_mode(Mode::EditingAnswer(index));
            self.emit(StateEvent::TextInsertionStopped { question: index });
            return vec![Timer::ResumeMain];
        }
        match self.buffers.get_mut(index) {
            Some(buf) => buf.insert_at_cursor(&format!("{text} ")),
            None => warn!(index, "no buffer for insertion target"),
        }
        Vec::new()
    }

    fn handle_ended(&mut self, kind: SessionKind) -> Vec<Timer> {
        match kind {
            SessionKind::Main => {
                if self.main.on_ended() {
                    debug!("main session ended on its own, scheduling restart");
                    vec![Timer::RestartMain]
                } else {
                    Vec::new()
                }
            }
            SessionKind::Answer | SessionKind::Insert => {
                let Some(sub) = self.sub.as_mut() else {
                    return Vec::new();
                };
                if sub.kind() != kind {
                    debug!(%kind, "end event for a stale sub-session dropped");
                    return Vec::new();
                }
                let restart = sub.on_ended();
                let still_wanted = matches!(
                    (kind, self.mode),
                    (SessionKind::Answer, Mode::RecordingAnswer(_))
                        | (SessionKind::Insert, Mode::InsertingText(_))
                );
                if restart && still_wanted {
                    // The capture cycle ended mid-dictation; bring up a
                    // fresh session for the same sub-session immediately
                    let mut fresh = SpeechSession::new(kind, true);
                    fresh.begin();
                    match self.capture.start(kind) {
                        Ok(()) => {
                            fresh.mark_active();
                            self.sub = Some(fresh);
                            Vec::new()
                        }
                        Err(e) => {
                            self.sub = None;
                            self.handle_capture_error(kind, e)
                        }
                    }
                } else {
                    self.sub = None;
                    Vec::new()
                }
            }
        }
    }

    fn handle_capture_error(&mut self, kind: SessionKind, e: CaptureError) -> Vec<Timer> {
        match e {
            CaptureError::Unavailable(ref message) => {
                error!(%kind, %message, "speech capture unavailable");
                self.emit(StateEvent::CaptureFailed {
                    message: message.clone(),
                });
                if self.editor.editing_index().is_some() {
                    let _ = self.editor.exit(&mut self.buffers, self.store.as_mut());
                }
                self.main.on_error();
                self.main.set_auto_restart(false);
                self.sub = None;
                self.set_mode(Mode::Idle);
                Vec::new()
            }
            CaptureError::Transient(ref message) => {
                warn!(%kind, %message, "transient capture error");
                match kind {
                    SessionKind::Main => {
                        self.main.on_error();
                        self.set_mode(Mode::Idle);
                        vec![Timer::RestartMain]
                    }
                    SessionKind::Answer | SessionKind::Insert => {
                        // The failed sub-session is not retried; the user
                        // re-issues the command once listening resumes
                        if let Some(sub) = self.sub.as_mut() {
                            sub.on_error();
                        }
                        self.sub = None;
                        self.set_mode(Mode::Idle);
                        vec![Timer::ResumeMain]
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, cmd: Command) -> Vec<Timer> {
        match cmd {
            Command::SelectQuestion(index) => self.begin_answer_recording(index),
            Command::EditQuestion(index) => self.begin_edit(index),
            Command::AddText => self.begin_text_insertion(),
            Command::StopCapture => {
                // In command/edit mode the live session is the main one;
                // a plain stop lets the auto-restart policy bring it back
                self.main.request_stop(false);
                self.capture.stop(SessionKind::Main);
                Vec::new()
            }
            Command::DeleteAll => {
                if let Mode::EditingAnswer(index) = self.mode {
                    if let Some(buf) = self.buffers.get_mut(index) {
                        buf.clear();
                    }
                    self.save_and_exit_edit();
                }
                Vec::new()
            }
            Command::SaveAndExit => {
                self.save_and_exit_edit();
                Vec::new()
            }
            Command::SelectThisSentence => self.with_edit_buffer(|buf| {
                buf.select_current_sentence();
            }),
            Command::DeleteSentence => self.with_edit_buffer(|buf| {
                buf.delete_current_sentence();
            }),
            Command::HighlightText => self.with_edit_buffer(|buf| {
                buf.wrap_selection_as_emphasis();
            }),
            Command::MoveCursorNext => self.with_edit_buffer(|buf| {
                buf.move_cursor_next();
            }),
            Command::MoveCursorBack => self.with_edit_buffer(|buf| {
                buf.move_cursor_back();
            }),
        }
    }

    fn with_edit_buffer(&mut self, f: impl FnOnce(&mut AnswerBuffer)) -> Vec<Timer> {
        let Mode::EditingAnswer(index) = self.mode else {
            return Vec::new();
        };
        match self.buffers.get_mut(index) {
            Some(buf) => f(buf),
            None => warn!(index, "edit target buffer missing"),
        }
        Vec::new()
    }

    fn begin_answer_recording(&mut self, index: usize) -> Vec<Timer> {
        if self.questions.get(index).is_none() || self.buffers.get(index).is_none() {
            warn!(index, count = self.questions.len(), "question index out of range");
            return Vec::new();
        }

        // A single answer stays under edit at a time; leaving edit mode
        // here also persists it
        if matches!(self.mode, Mode::EditingAnswer(_)) {
            self.save_and_exit_edit();
        }

        // Re-target: tear down a dictation already in flight
        if let Mode::RecordingAnswer(old) = self.mode {
            if let Some(sub) = self.sub.as_mut() {
                sub.request_stop(true);
            }
            self.capture.stop(SessionKind::Answer);
            self.sub = None;
            self.emit(StateEvent::AnswerRecordingStopped { question: old });
        }

        self.suspend_main_for_sub();

        let mut sub = SpeechSession::new(SessionKind::Answer, true);
        sub.begin();
        match self.capture.start(SessionKind::Answer) {
            Ok(()) => {
                sub.mark_active();
                self.sub = Some(sub);
                self.set_mode(Mode::RecordingAnswer(index));
                self.emit(StateEvent::AnswerRecordingStarted { question: index });
                Vec::new()
            }
            Err(e) => self.handle_capture_error(SessionKind::Answer, e),
        }
    }

    fn begin_edit(&mut self, index: usize) -> Vec<Timer> {
        if self.questions.get(index).is_none() || self.buffers.get(index).is_none() {
            warn!(index, count = self.questions.len(), "question index out of range");
            return Vec::new();
        }

        // Edit commands ride the main session, which keeps listening
        if let Err(e) = self
            .editor
            .enter(index, &mut self.buffers, self.store.as_mut())
        {
            warn!(index, ?e, "failed to persist previous edit");
        }
        self.set_mode(Mode::EditingAnswer(index));
        self.emit(StateEvent::EditModeEntered { question: index });
        Vec::new()
    }

    fn begin_text_insertion(&mut self) -> Vec<Timer> {
        let Mode::EditingAnswer(index) = self.mode else {
            return Vec::new();
        };

        self.suspend_main_for_sub();

        let mut sub = SpeechSession::new(SessionKind::Insert, true);
        sub.begin();
        match self.capture.start(SessionKind::Insert) {
            Ok(()) => {
                sub.mark_active();
                self.sub = Some(sub);
                self.set_mode(Mode::InsertingText(index));
                self.emit(StateEvent::TextInsertionStarted { question: index });
                Vec::new()
            }
            Err(e) => self.handle_capture_error(SessionKind::Insert, e),
        }
    }

    fn stop_answer_recording(&mut self, index: usize) -> Vec<Timer> {
        if let Some(sub) = self.sub.as_mut() {
            sub.request_stop(true);
        }
        self.capture.stop(SessionKind::Answer);
        self.suppress_commands = true;
        self.set_mode(Mode::Idle);
        self.emit(StateEvent::AnswerRecordingStopped { question: index });

        // Read the dictated answer back; never blocks the resume path
        let spoken = self
            .buffers
            .get(index)
            .map(|b| b.plain_text().trim().to_string())
            .unwrap_or_default();
        if !spoken.is_empty() {
            self.speaker.speak(&spoken);
        }

        vec![Timer::ResumeMain, Timer::ClearSuppression]
    }

    /// Stop the main session so a sub-session can own the capture
    /// device. The intentional-stop flag keeps the main session's own
    /// auto-restart from firing while the sub-session runs.
    fn suspend_main_for_sub(&mut self) {
        if self.main.is_active() || self.main.is_starting() {
            debug!("suspending main session for sub-session");
            self.main.request_stop(true);
            self.capture.stop(SessionKind::Main);
        }
    }

    /// Start a fresh main session after a sub-session has fully stopped
    fn resume_main(&mut self) -> Vec<Timer> {
        if let Some(sub) = &self.sub {
            if sub.is_active() || sub.is_starting() {
                debug!("sub-session still live, resume deferred");
                return vec![Timer::ResumeMain];
            }
            // The cycle is over but its end event never arrived
            self.sub = None;
        }
        if self.main.is_active() || self.main.is_starting() {
            return Vec::new();
        }
        if !self.main.auto_restart() {
            return Vec::new();
        }

        // Sessions are never reused across suspend/resume
        self.main = SpeechSession::new(SessionKind::Main, true);
        self.main.begin();
        match self.capture.start(SessionKind::Main) {
            Ok(()) => {
                self.main.mark_active();
                if self.mode == Mode::Idle {
                    self.set_mode(Mode::ListeningForCommand);
                }
                self.emit(StateEvent::ListeningStarted);
                Vec::new()
            }
            Err(e) => self.handle_capture_error(SessionKind::Main, e),
        }
    }

    fn save_and_exit_edit(&mut self) {
        let Mode::EditingAnswer(index) = self.mode else {
            return;
        };
        if let Err(e) = self.editor.exit(&mut self.buffers, self.store.as_mut()) {
            // The in-memory buffer survives; the user can edit and save again
            warn!(index, ?e, "failed to persist edited answer");
        }
        self.set_mode(Mode::ListeningForCommand);
        self.emit(StateEvent::EditModeExited { question: index });
    }

    fn set_mode(&mut self, new_mode: Mode) {
        if self.mode == new_mode {
            return;
        }
        info!(from = %self.mode, to = %new_mode, "mode transition");
        self.mode = new_mode;
    }

    fn emit(&self, event: StateEvent) {
        let _ = self.event_tx.send(event);
    }
}

fn schedule(timer: Timer, tx: mpsc::Sender<Timer>) {
    tokio::spawn(async move {
        tokio::time::sleep(timer.delay()).await;
        let _ = tx.send(timer).await;
    });
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::editor::Run;

    struct FakeCapture {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl CaptureControl for FakeCapture {
        fn start(&mut self, kind: SessionKind) -> Result<(), CaptureError> {
            self.log.lock().unwrap().push(format!("start:{kind}"));
            Ok(())
        }

        fn stop(&mut self, kind: SessionKind) {
            self.log.lock().unwrap().push(format!("stop:{kind}"));
        }
    }

    struct UnavailableCapture;

    impl CaptureControl for UnavailableCapture {
        fn start(&mut self, _kind: SessionKind) -> Result<(), CaptureError> {
            Err(CaptureError::Unavailable("microphone denied".to_string()))
        }

        fn stop(&mut self, _kind: SessionKind) {}
    }

    struct SharedStore(Arc<Mutex<HashMap<usize, String>>>);

    impl PersistenceAdapter for SharedStore {
        fn save(&mut self, index: usize, rich_text: &str) -> Result<(), crate::error::StoreError> {
            self.0.lock().unwrap().insert(index, rich_text.to_string());
            Ok(())
        }

        fn load(&mut self, index: usize) -> Result<Option<String>, crate::error::StoreError> {
            Ok(self.0.lock().unwrap().get(&index).cloned())
        }
    }

    struct RecordingSpeaker(Arc<Mutex<Vec<String>>>);

    impl SpeechOutput for RecordingSpeaker {
        fn speak(&self, text: &str) {
            self.0.lock().unwrap().push(text.to_string());
        }
    }

    struct Harness {
        manager: SessionManager,
        saved: Arc<Mutex<HashMap<usize, String>>>,
        spoken: Arc<Mutex<Vec<String>>>,
        capture_log: Arc<Mutex<Vec<String>>>,
    }

    fn harness_with_store(seed: HashMap<usize, String>) -> Harness {
        let saved = Arc::new(Mutex::new(seed));
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let capture_log = Arc::new(Mutex::new(Vec::new()));
        let (event_tx, _) = broadcast::channel(64);

        let manager = SessionManager::new(
            QuestionSet::from_texts(Vec::new()),
            Box::new(FakeCapture {
                log: Arc::clone(&capture_log),
            }),
            Box::new(SharedStore(Arc::clone(&saved))),
            Box::new(RecordingSpeaker(Arc::clone(&spoken))),
            event_tx,
        );

        Harness {
            manager,
            saved,
            spoken,
            capture_log,
        }
    }

    fn harness() -> Harness {
        harness_with_store(HashMap::new())
    }

    fn final_transcript(h: &mut Harness, kind: SessionKind, text: &str) -> Vec<Timer> {
        h.manager
            .handle_capture(kind, CaptureEvent::Final(text.to_string()))
    }

    #[test]
    fn test_select_question_starts_recording() {
        let mut h = harness();
        h.manager.start_listening();
        assert_eq!(h.manager.mode(), Mode::ListeningForCommand);

        final_transcript(&mut h, SessionKind::Main, "select question two");
        assert_eq!(h.manager.mode(), Mode::RecordingAnswer(1));
        assert_eq!(h.manager.active_capture_sessions(), 1);

        let log = h.capture_log.lock().unwrap();
        assert_eq!(*log, vec!["start:main", "stop:main", "start:answer"]);
    }

    #[test]
    fn test_dictation_appends_to_buffer() {
        let mut h = harness();
        h.manager.start_listening();
        final_transcript(&mut h, SessionKind::Main, "select question one");

        final_transcript(&mut h, SessionKind::Answer, "the first part");
        final_transcript(&mut h, SessionKind::Answer, "and the rest");
        assert_eq!(
            h.manager.buffer(0).unwrap().flat_text(),
            "the first part and the rest "
        );
    }

    #[test]
    fn test_stop_phrase_ends_recording_and_resumes_after_debounce() {
        let mut h = harness();
        h.manager.start_listening();
        final_transcript(&mut h, SessionKind::Main, "select question two");
        final_transcript(&mut h, SessionKind::Answer, "my answer");

        let timers = final_transcript(&mut h, SessionKind::Answer, "stop over finish");
        assert_eq!(timers, vec![Timer::ResumeMain, Timer::ClearSuppression]);
        assert_eq!(h.manager.mode(), Mode::Idle);
        // The stop-phrase fragment itself is not appended
        assert_eq!(h.manager.buffer(1).unwrap().flat_text(), "my answer ");
        // Read-back of the dictated answer
        assert_eq!(*h.spoken.lock().unwrap(), vec!["my answer"]);

        h.manager.handle_capture(SessionKind::Answer, CaptureEvent::Ended);
        h.manager.handle_timer(Timer::ResumeMain);
        assert_eq!(h.manager.mode(), Mode::ListeningForCommand);
        assert_eq!(h.manager.active_capture_sessions(), 1);
    }

    #[test]
    fn test_suppression_window_blocks_trailing_commands() {
        let mut h = harness();
        h.manager.start_listening();
        final_transcript(&mut h, SessionKind::Main, "select question one");
        final_transcript(&mut h, SessionKind::Answer, "stop over finish");
        h.manager.handle_capture(SessionKind::Answer, CaptureEvent::Ended);
        h.manager.handle_timer(Timer::ResumeMain);

        // Still inside the 1s window: the trailing transcript is dropped
        final_transcript(&mut h, SessionKind::Main, "select question two");
        assert_eq!(h.manager.mode(), Mode::ListeningForCommand);

        h.manager.handle_timer(Timer::ClearSuppression);
        final_transcript(&mut h, SessionKind::Main, "select question two");
        assert_eq!(h.manager.mode(), Mode::RecordingAnswer(1));
    }

    #[test]
    fn test_invalid_question_index_is_ignored() {
        let mut h = harness();
        h.manager.start_listening();
        final_transcript(&mut h, SessionKind::Main, "select question 9");
        assert_eq!(h.manager.mode(), Mode::ListeningForCommand);
    }

    #[test]
    fn test_edit_delete_sentence_then_save_exit_persists_empty() {
        let mut seed = HashMap::new();
        seed.insert(
            0,
            serde_json::to_string(&vec![Run::plain("Hello.")]).unwrap(),
        );
        let mut h = harness_with_store(seed);
        h.manager.start_listening();

        final_transcript(&mut h, SessionKind::Main, "edit question one");
        assert_eq!(h.manager.mode(), Mode::EditingAnswer(0));
        // The main session keeps listening for edit commands
        assert_eq!(h.manager.active_capture_sessions(), 1);

        final_transcript(&mut h, SessionKind::Main, "delete sentence");
        assert!(h.manager.buffer(0).unwrap().is_empty());

        final_transcript(&mut h, SessionKind::Main, "save and exit");
        assert_eq!(h.manager.mode(), Mode::ListeningForCommand);
        assert_eq!(h.saved.lock().unwrap().get(&0).map(String::as_str), Some(""));
    }

    #[test]
    fn test_delete_all_clears_and_exits() {
        let mut seed = HashMap::new();
        seed.insert(
            2,
            serde_json::to_string(&vec![Run::plain("Something here.")]).unwrap(),
        );
        let mut h = harness_with_store(seed);
        h.manager.start_listening();

        final_transcript(&mut h, SessionKind::Main, "edit question three");
        final_transcript(&mut h, SessionKind::Main, "delete all");
        assert_eq!(h.manager.mode(), Mode::ListeningForCommand);
        assert_eq!(h.saved.lock().unwrap().get(&2).map(String::as_str), Some(""));
    }

    #[test]
    fn test_add_text_round_trip() {
        let mut seed = HashMap::new();
        seed.insert(
            0,
            serde_json::to_string(&vec![Run::plain("Start. End.")]).unwrap(),
        );
        let mut h = harness_with_store(seed);
        h.manager.start_listening();

        final_transcript(&mut h, SessionKind::Main, "edit question one");
        final_transcript(&mut h, SessionKind::Main, "add text");
        assert_eq!(h.manager.mode(), Mode::InsertingText(0));
        assert_eq!(h.manager.active_capture_sessions(), 1);

        final_transcript(&mut h, SessionKind::Insert, "inserted words");
        assert_eq!(
            h.manager.buffer(0).unwrap().flat_text(),
            "inserted words Start. End."
        );

        let timers = final_transcript(&mut h, SessionKind::Insert, "stop over finish");
        assert_eq!(timers, vec![Timer::ResumeMain]);
        assert_eq!(h.manager.mode(), Mode::EditingAnswer(0));

        h.manager.handle_capture(SessionKind::Insert, CaptureEvent::Ended);
        h.manager.handle_timer(Timer::ResumeMain);
        assert_eq!(h.manager.mode(), Mode::EditingAnswer(0));
        assert_eq!(h.manager.active_capture_sessions(), 1);
    }

    #[test]
    fn test_highlight_after_selection() {
        let mut seed = HashMap::new();
        seed.insert(
            0,
            serde_json::to_string(&vec![Run::plain("Pick me. Not me.")]).unwrap(),
        );
        let mut h = harness_with_store(seed);
        h.manager.start_listening();

        final_transcript(&mut h, SessionKind::Main, "edit question one");
        final_transcript(&mut h, SessionKind::Main, "select this sentence");
        final_transcript(&mut h, SessionKind::Main, "highlight text");

        let buf = h.manager.buffer(0).unwrap();
        assert_eq!(buf.runs()[0], Run::emphasis("Pick me."));
        assert_eq!(buf.flat_text(), "Pick me. Not me.");
    }

    #[test]
    fn test_edit_other_question_saves_prior() {
        let mut seed = HashMap::new();
        seed.insert(
            0,
            serde_json::to_string(&vec![Run::plain("First.")]).unwrap(),
        );
        let mut h = harness_with_store(seed);
        h.manager.start_listening();

        final_transcript(&mut h, SessionKind::Main, "edit question one");
        final_transcript(&mut h, SessionKind::Main, "edit question two");
        assert_eq!(h.manager.mode(), Mode::EditingAnswer(1));
        assert!(h.saved.lock().unwrap().contains_key(&0));
    }

    #[test]
    fn test_main_session_auto_restarts_after_unintended_end() {
        let mut h = harness();
        h.manager.start_listening();

        let timers = h.manager.handle_capture(SessionKind::Main, CaptureEvent::Ended);
        assert_eq!(timers, vec![Timer::RestartMain]);
        assert_eq!(h.manager.active_capture_sessions(), 0);

        h.manager.handle_timer(Timer::RestartMain);
        assert_eq!(h.manager.active_capture_sessions(), 1);
        assert_eq!(h.manager.mode(), Mode::ListeningForCommand);
    }

    #[test]
    fn test_capture_unavailable_forces_idle_without_restart() {
        let saved = Arc::new(Mutex::new(HashMap::new()));
        let (event_tx, _) = broadcast::channel(16);
        let mut manager = SessionManager::new(
            QuestionSet::from_texts(Vec::new()),
            Box::new(UnavailableCapture),
            Box::new(SharedStore(Arc::clone(&saved))),
            Box::new(LogSpeakerStub),
            event_tx,
        );

        manager.start_listening();
        assert_eq!(manager.mode(), Mode::Idle);

        manager.handle_timer(Timer::ResumeMain);
        assert_eq!(manager.mode(), Mode::Idle);
        assert_eq!(manager.active_capture_sessions(), 0);
    }

    struct LogSpeakerStub;

    impl SpeechOutput for LogSpeakerStub {
        fn speak(&self, _text: &str) {}
    }

    #[test]
    fn test_transient_sub_error_resets_to_idle_then_resumes() {
        let mut h = harness();
        h.manager.start_listening();
        final_transcript(&mut h, SessionKind::Main, "select question one");

        let timers = h.manager.handle_capture(
            SessionKind::Answer,
            CaptureEvent::Error(CaptureError::Transient("mic glitch".to_string())),
        );
        assert_eq!(timers, vec![Timer::ResumeMain]);
        assert_eq!(h.manager.mode(), Mode::Idle);

        h.manager.handle_timer(Timer::ResumeMain);
        assert_eq!(h.manager.mode(), Mode::ListeningForCommand);
    }

    #[test]
    fn test_never_more_than_one_active_session() {
        let mut h = harness();
        let check = |h: &Harness| assert!(h.manager.active_capture_sessions() <= 1);

        h.manager.start_listening();
        check(&h);
        for (kind, text) in [
            (SessionKind::Main, "select question one"),
            (SessionKind::Answer, "some words"),
            (SessionKind::Answer, "stop over finish"),
            (SessionKind::Main, "edit question two"),
            (SessionKind::Main, "add text"),
            (SessionKind::Insert, "stop over finish"),
            (SessionKind::Main, "select question three"),
        ] {
            final_transcript(&mut h, kind, text);
            check(&h);
        }
        for timer in [Timer::ResumeMain, Timer::ClearSuppression, Timer::RestartMain] {
            h.manager.handle_timer(timer);
            check(&h);
        }
    }

    #[test]
    fn test_partial_transcripts_never_reach_buffers() {
        let mut h = harness();
        h.manager.start_listening();
        final_transcript(&mut h, SessionKind::Main, "select question one");
        h.manager.handle_capture(
            SessionKind::Answer,
            CaptureEvent::Partial("half spoken".to_string()),
        );
        assert!(h.manager.buffer(0).unwrap().is_empty());
    }

    #[test]
    fn test_sub_session_restarts_when_ended_mid_dictation() {
        let mut h = harness();
        h.manager.start_listening();
        final_transcript(&mut h, SessionKind::Main, "select question one");

        // Unintended end while still recording: fresh session, same target
        h.manager.handle_capture(SessionKind::Answer, CaptureEvent::Ended);
        assert_eq!(h.manager.mode(), Mode::RecordingAnswer(0));
        assert_eq!(h.manager.active_capture_sessions(), 1);

        final_transcript(&mut h, SessionKind::Answer, "still captured");
        assert_eq!(h.manager.buffer(0).unwrap().flat_text(), "still captured ");
    }

    #[test]
    fn test_export_items_follow_question_order() {
        let mut h = harness();
        h.manager.start_listening();
        final_transcript(&mut h, SessionKind::Main, "select question one");
        final_transcript(&mut h, SessionKind::Answer, "answer one");

        let items = h.manager.export_items();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].plain_answer_text, "answer one");
        assert_eq!(items[0].question_text, "Who are you?");
        assert!(items[1].plain_answer_text.is_empty());
    }
}

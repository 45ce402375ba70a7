//! Per-question rich-text answer buffer
//!
//! Content is an ordered list of styled runs; all cursor and selection
//! arithmetic happens in the flattened-text coordinate space and is mapped
//! back onto runs through the navigator. After every mutation the run list
//! is normalized: empty runs are dropped and adjacent same-style runs are
//! merged.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::navigator;

/// Styling classification of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStyle {
    Plain,
    Emphasis,
}

/// A contiguous span of text sharing one style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub style: RunStyle,
    pub text: String,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            style: RunStyle::Plain,
            text: text.into(),
        }
    }

    pub fn emphasis(text: impl Into<String>) -> Self {
        Self {
            style: RunStyle::Emphasis,
            text: text.into(),
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Byte index of the `char_offset`-th character of `s`
fn byte_at(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

/// Mutable rich-text answer for one question, plus cursor and selection
#[derive(Debug, Clone)]
pub struct AnswerBuffer {
    index: usize,
    runs: Vec<Run>,
    cursor: usize,
    selection: Option<(usize, usize)>,
}

impl AnswerBuffer {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            runs: Vec::new(),
            cursor: 0,
            selection: None,
        }
    }

    /// Rebuild a buffer from its persisted rich-text string.
    ///
    /// The persisted form is the JSON run list; the empty string is an
    /// empty buffer. A string that is not valid run JSON is treated as a
    /// single plain run so hand-written answer files still load.
    pub fn from_rich_text(index: usize, raw: &str) -> Self {
        let mut buf = Self::new(index);
        if raw.is_empty() {
            return buf;
        }
        match serde_json::from_str::<Vec<Run>>(raw) {
            Ok(runs) => buf.runs = runs,
            Err(e) => {
                debug!(index, ?e, "stored answer is not run JSON, keeping as plain text");
                buf.runs = vec![Run::plain(raw)];
            }
        }
        Self::normalize(&mut buf.runs);
        buf
    }

    /// The persisted rich-text string: JSON run list, or "" when empty
    pub fn rich_text(&self) -> String {
        if self.runs.is_empty() {
            return String::new();
        }
        serde_json::to_string(&self.runs).unwrap_or_else(|e| {
            warn!(index = self.index, ?e, "failed to serialize runs");
            String::new()
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Flattened text: every run concatenated in document order
    pub fn flat_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Plain-text view for export; identical to the flattened text
    pub fn plain_text(&self) -> String {
        self.flat_text()
    }

    pub fn flat_len(&self) -> usize {
        self.runs.iter().map(Run::char_len).sum()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, clamped into `[0, flat_len]`
    pub fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.flat_len());
    }

    pub fn selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Drop everything; cursor and selection reset
    pub fn clear(&mut self) {
        self.runs.clear();
        self.cursor = 0;
        self.selection = None;
    }

    /// Append a final dictation fragment, with the trailing space the
    /// dictation flow always leaves between fragments. Cursor follows.
    pub fn append_dictation(&mut self, fragment: &str) {
        let at = self.flat_len();
        self.insert_run_at(at, Run::plain(format!("{fragment} ")));
        self.cursor = self.flat_len();
    }

    /// Set the selection to `[start, end)`, clamped to the text
    pub fn select_range(&mut self, start: usize, end: usize) {
        let total = self.flat_len();
        let start = start.min(total);
        let end = end.clamp(start, total);
        self.selection = Some((start, end));
    }

    /// Select the sentence around the cursor
    pub fn select_current_sentence(&mut self) {
        let flat = self.flat_text();
        let (start, end) = navigator::find_sentence_bounds(&flat, self.cursor);
        debug!(index = self.index, start, end, "sentence selected");
        self.select_range(start, end);
    }

    /// Remove `[start, end)` from the content. The run structure is
    /// renormalized, the cursor lands at `start`, and any selection is
    /// dropped.
    pub fn delete_range(&mut self, start: usize, end: usize) {
        let total = self.flat_len();
        let start = start.min(total);
        let end = end.clamp(start, total);
        if start == end {
            self.cursor = start;
            return;
        }

        let mut acc = 0;
        let mut kept = Vec::with_capacity(self.runs.len());
        for run in &self.runs {
            let len = run.char_len();
            let (a, b) = (acc, acc + len);
            acc = b;

            if b <= start || a >= end {
                kept.push(run.clone());
                continue;
            }

            let head_end = start.saturating_sub(a).min(len);
            let tail_start = end.saturating_sub(a).min(len);
            let mut text = String::new();
            text.push_str(&run.text[..byte_at(&run.text, head_end)]);
            text.push_str(&run.text[byte_at(&run.text, tail_start)..]);
            if !text.is_empty() {
                kept.push(Run {
                    style: run.style,
                    text,
                });
            }
        }

        self.runs = kept;
        Self::normalize(&mut self.runs);
        self.cursor = start;
        self.selection = None;
    }

    /// Delete the sentence around the cursor
    pub fn delete_current_sentence(&mut self) {
        let flat = self.flat_text();
        let (start, end) = navigator::find_sentence_bounds(&flat, self.cursor);
        debug!(index = self.index, start, end, "sentence deleted");
        self.delete_range(start, end);
    }

    /// Insert plain text at the cursor, splitting the containing run if
    /// the cursor falls inside one. The cursor advances past the insert.
    pub fn insert_at_cursor(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let at = self.cursor.min(self.flat_len());
        let inserted = text.chars().count();
        self.insert_run_at(at, Run::plain(text));
        self.cursor = at + inserted;
    }

    /// Replace the current selection with a single emphasis run holding
    /// its flat text. Returns false (and logs) when nothing is selected.
    pub fn wrap_selection_as_emphasis(&mut self) -> bool {
        let Some((start, end)) = self.selection else {
            debug!(index = self.index, "no selection to emphasize");
            return false;
        };
        if start == end {
            debug!(index = self.index, "empty selection, emphasis skipped");
            return false;
        }

        let text = self.flat_slice(start, end);
        self.delete_range(start, end);
        self.insert_run_at(start, Run::emphasis(text));
        self.selection = Some((start, end));
        self.cursor = end;
        true
    }

    /// Move the cursor to the start of the next sentence. Returns false
    /// if there is none.
    pub fn move_cursor_next(&mut self) -> bool {
        let flat = self.flat_text();
        match navigator::next_sentence_start(&flat, self.cursor) {
            Some(offset) => {
                self.cursor = offset;
                true
            }
            None => {
                debug!(index = self.index, "no next sentence");
                false
            }
        }
    }

    /// Move the cursor to the start of the previous sentence. Returns
    /// false if there is none.
    pub fn move_cursor_back(&mut self) -> bool {
        let flat = self.flat_text();
        match navigator::prev_sentence_start(&flat, self.cursor) {
            Some(offset) => {
                self.cursor = offset;
                true
            }
            None => {
                debug!(index = self.index, "no previous sentence");
                false
            }
        }
    }

    /// The flat text of `[start, end)`
    fn flat_slice(&self, start: usize, end: usize) -> String {
        self.flat_text()
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect()
    }

    /// Insert a run at a flat offset, splitting the containing run when
    /// the offset falls inside one. `at` must already be clamped.
    fn insert_run_at(&mut self, at: usize, run: Run) {
        if run.text.is_empty() {
            return;
        }

        match navigator::map_offset_to_run(&self.runs, at) {
            None => {
                // Empty buffer, or offset at the very end of it
                self.runs.push(run);
            }
            Some(pos) => {
                if pos.offset == 0 {
                    self.runs.insert(pos.run, run);
                } else if pos.offset >= self.runs[pos.run].char_len() {
                    self.runs.insert(pos.run + 1, run);
                } else {
                    let split = byte_at(&self.runs[pos.run].text, pos.offset);
                    let tail = self.runs[pos.run].text.split_off(split);
                    let style = self.runs[pos.run].style;
                    self.runs.insert(pos.run + 1, Run { style, text: tail });
                    self.runs.insert(pos.run + 1, run);
                }
            }
        }

        Self::normalize(&mut self.runs);
    }

    /// Drop empty runs and merge adjacent same-style runs
    fn normalize(runs: &mut Vec<Run>) {
        runs.retain(|r| !r.text.is_empty());
        let mut i = 0;
        while i + 1 < runs.len() {
            if runs[i].style == runs[i + 1].style {
                let next = runs.remove(i + 1);
                runs[i].text.push_str(&next.text);
            } else {
                i += 1;
            }
        }
    }
}

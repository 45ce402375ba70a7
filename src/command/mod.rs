//! Voice command interpretation
//!
//! Maps a lower-cased transcript fragment to at most one command.
//! Triggers are matched by substring containment, with a fixed
//! precedence when several phrases co-occur: the stop phrase wins, then
//! the mode-entry phrases, then the edit-mode commands (which are only
//! consulted while an answer is under edit).

use tracing::debug;

use crate::session::Mode;

/// The fixed trigger that terminates whichever capture session is active
pub const STOP_PHRASE: &str = "stop over finish";

/// A recognized voice command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start dictating an answer for the question (0-based index)
    SelectQuestion(usize),
    /// Enter edit mode for the question (0-based index)
    EditQuestion(usize),
    /// Clear the edited buffer and exit edit mode
    DeleteAll,
    /// Select the sentence around the cursor
    SelectThisSentence,
    /// Start a text-insertion sub-session at the cursor
    AddText,
    /// Delete the sentence around the cursor
    DeleteSentence,
    /// Wrap the current selection as emphasis
    HighlightText,
    /// Move the cursor to the next sentence start
    MoveCursorNext,
    /// Move the cursor to the previous sentence start
    MoveCursorBack,
    /// Persist the edited buffer and leave edit mode
    SaveAndExit,
    /// Stop the active capture session
    StopCapture,
}

/// Interpret one transcript fragment in the given mode
pub fn interpret(transcript: &str, mode: Mode) -> Option<Command> {
    let t = transcript.to_lowercase();

    if t.contains(STOP_PHRASE) {
        return Some(Command::StopCapture);
    }

    if let Some(rest) = after(&t, "select question") {
        return match parse_question_number(rest) {
            Some(index) => Some(Command::SelectQuestion(index)),
            None => {
                debug!(transcript = %t, "unrecognized question numeral");
                None
            }
        };
    }

    if let Some(rest) = after(&t, "edit question") {
        return match parse_question_number(rest) {
            Some(index) => Some(Command::EditQuestion(index)),
            None => {
                debug!(transcript = %t, "unrecognized question numeral");
                None
            }
        };
    }

    if !matches!(mode, Mode::EditingAnswer(_)) {
        return None;
    }

    if t.contains("delete all") {
        Some(Command::DeleteAll)
    } else if t.contains("select this sentence") {
        Some(Command::SelectThisSentence)
    } else if t.contains("add text") {
        Some(Command::AddText)
    } else if t.contains("delete sentence") {
        Some(Command::DeleteSentence)
    } else if t.contains("highlight text") {
        Some(Command::HighlightText)
    } else if t.contains("move cursor next") {
        Some(Command::MoveCursorNext)
    } else if t.contains("move cursor back") {
        Some(Command::MoveCursorBack)
    } else if t.contains("save and exit") || t.contains("exit edit") {
        Some(Command::SaveAndExit)
    } else {
        None
    }
}

/// The remainder of `t` after the first occurrence of `phrase`
fn after<'a>(t: &'a str, phrase: &str) -> Option<&'a str> {
    t.find(phrase).map(|i| &t[i + phrase.len()..])
}

/// Parse a spoken question numeral into a 0-based index.
///
/// Accepts the spelled-out words "one" through "five" and digit strings;
/// anything else (including zero) yields `None`.
fn parse_question_number(rest: &str) -> Option<usize> {
    const WORDS: [(&str, usize); 5] = [
        ("one", 1),
        ("two", 2),
        ("three", 3),
        ("four", 4),
        ("five", 5),
    ];

    let n = WORDS
        .iter()
        .find(|(word, _)| rest.contains(word))
        .map(|(_, n)| *n)
        .or_else(|| parse_first_digits(rest))?;

    n.checked_sub(1)
}

/// First contiguous digit sequence in `rest`, parsed as a number
fn parse_first_digits(rest: &str) -> Option<usize> {
    let start = rest.find(|c: char| c.is_ascii_digit())?;
    let digits: String = rest[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTENING: Mode = Mode::ListeningForCommand;
    const EDITING: Mode = Mode::EditingAnswer(0);

    #[test]
    fn test_select_question_word_and_digit_agree() {
        assert_eq!(
            interpret("select question three", LISTENING),
            Some(Command::SelectQuestion(2))
        );
        assert_eq!(
            interpret("select question 3", LISTENING),
            Some(Command::SelectQuestion(2))
        );
    }

    #[test]
    fn test_edit_question_parses_index() {
        assert_eq!(
            interpret("please edit question one now", LISTENING),
            Some(Command::EditQuestion(0))
        );
    }

    #[test]
    fn test_unrecognized_numeral_yields_nothing() {
        assert_eq!(interpret("select question nine", LISTENING), None);
        assert_eq!(interpret("select question 0", LISTENING), None);
        assert_eq!(interpret("select question", LISTENING), None);
    }

    #[test]
    fn test_stop_phrase_beats_everything() {
        assert_eq!(
            interpret("select question one stop over finish", LISTENING),
            Some(Command::StopCapture)
        );
        assert_eq!(
            interpret("stop over finish", EDITING),
            Some(Command::StopCapture)
        );
    }

    #[test]
    fn test_edit_commands_require_edit_mode() {
        assert_eq!(interpret("delete sentence", LISTENING), None);
        assert_eq!(
            interpret("delete sentence", EDITING),
            Some(Command::DeleteSentence)
        );
    }

    #[test]
    fn test_edit_command_table() {
        assert_eq!(interpret("delete all", EDITING), Some(Command::DeleteAll));
        assert_eq!(
            interpret("select this sentence", EDITING),
            Some(Command::SelectThisSentence)
        );
        assert_eq!(interpret("add text", EDITING), Some(Command::AddText));
        assert_eq!(
            interpret("highlight text", EDITING),
            Some(Command::HighlightText)
        );
        assert_eq!(
            interpret("move cursor next", EDITING),
            Some(Command::MoveCursorNext)
        );
        assert_eq!(
            interpret("move cursor back", EDITING),
            Some(Command::MoveCursorBack)
        );
        assert_eq!(
            interpret("save and exit", EDITING),
            Some(Command::SaveAndExit)
        );
        assert_eq!(
            interpret("exit edit mode", EDITING),
            Some(Command::SaveAndExit)
        );
        assert_eq!(interpret("exit edit", EDITING), Some(Command::SaveAndExit));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(
            interpret("Select Question TWO", LISTENING),
            Some(Command::SelectQuestion(1))
        );
    }

    #[test]
    fn test_unrelated_speech_is_ignored() {
        assert_eq!(interpret("the weather is nice today", LISTENING), None);
        assert_eq!(interpret("", LISTENING), None);
    }
}

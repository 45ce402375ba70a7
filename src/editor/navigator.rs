//! Sentence-boundary navigation over flattened answer text
//!
//! All offsets are character offsets into the flattened text (the
//! concatenation of every run, in document order). Sentence boundaries
//! are exactly `.`, `!`, and `?`. These functions carry no session
//! state; callers clamp offsets before mapping them back onto runs.

use super::buffer::Run;

/// Returns true for the three recognized sentence boundary characters
pub fn is_boundary(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Locate the current sentence around `cursor` as a `[start, end)` range.
///
/// `start` is the offset just after the nearest boundary strictly before
/// the cursor (or 0), and `end` is the offset just after the nearest
/// boundary at or after the cursor (or the text length). The boundary
/// character itself belongs to the sentence.
pub fn find_sentence_bounds(flat: &str, cursor: usize) -> (usize, usize) {
    let chars: Vec<char> = flat.chars().collect();
    let cursor = cursor.min(chars.len());

    let mut start = 0;
    for i in (0..cursor).rev() {
        if is_boundary(chars[i]) {
            start = i + 1;
            break;
        }
    }

    let mut end = chars.len();
    for i in cursor..chars.len() {
        if is_boundary(chars[i]) {
            end = i + 1;
            break;
        }
    }

    (start, end)
}

/// Offset of the first non-whitespace character after the next boundary
/// at or beyond the cursor. `None` means there is no further sentence
/// and the cursor should not move.
pub fn next_sentence_start(flat: &str, cursor: usize) -> Option<usize> {
    let chars: Vec<char> = flat.chars().collect();
    let cursor = cursor.min(chars.len());

    let boundary = (cursor..chars.len()).find(|&i| is_boundary(chars[i]))?;
    ((boundary + 1)..chars.len()).find(|&i| !chars[i].is_whitespace())
}

/// Offset of the start of the nearest earlier sentence whose first
/// non-whitespace character lies strictly before the cursor. `None`
/// means there is no previous sentence and the cursor should not move.
pub fn prev_sentence_start(flat: &str, cursor: usize) -> Option<usize> {
    let chars: Vec<char> = flat.chars().collect();
    let cursor = cursor.min(chars.len());

    for b in (0..cursor).rev() {
        if !is_boundary(chars[b]) {
            continue;
        }
        if let Some(start) = ((b + 1)..cursor).find(|&i| !chars[i].is_whitespace()) {
            return Some(start);
        }
        // The sentence after this boundary starts at or past the cursor;
        // keep scanning for an earlier one.
    }

    None
}

/// A resolved position inside the run list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPosition {
    /// Index into the run list
    pub run: usize,
    /// Character offset within that run
    pub offset: usize,
}

/// Map a flat character offset onto `(run, offset-within-run)`.
///
/// An offset that falls exactly on a run boundary resolves to the start
/// of the next run. An offset equal to the total length resolves to the
/// end of the last run. Offsets beyond the total length (and any offset
/// into an empty run list) return `None`; callers must clamp first.
pub fn map_offset_to_run(runs: &[Run], flat_offset: usize) -> Option<RunPosition> {
    let mut acc = 0;
    for (i, run) in runs.iter().enumerate() {
        let len = run.char_len();
        if flat_offset < acc + len {
            return Some(RunPosition {
                run: i,
                offset: flat_offset - acc,
            });
        }
        acc += len;
    }

    if flat_offset == acc && !runs.is_empty() {
        let last = runs.len() - 1;
        return Some(RunPosition {
            run: last,
            offset: runs[last].char_len(),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::buffer::Run;

    const TEXT: &str = "Hi there. How are you? Fine!";

    #[test]
    fn test_bounds_in_first_sentence() {
        // Cursor inside "there"
        assert_eq!(find_sentence_bounds(TEXT, 5), (0, 9));
    }

    #[test]
    fn test_bounds_in_second_sentence() {
        // Cursor on the 'u' of "you"; the sentence spans from just after
        // the first '.' through the '?'
        assert_eq!(find_sentence_bounds(TEXT, 20), (9, 22));
    }

    #[test]
    fn test_bounds_with_cursor_on_boundary() {
        // Cursor sitting exactly on the '.' still yields the first sentence
        assert_eq!(find_sentence_bounds(TEXT, 8), (0, 9));
    }

    #[test]
    fn test_bounds_without_any_boundary() {
        assert_eq!(find_sentence_bounds("no punctuation here", 7), (0, 19));
    }

    #[test]
    fn test_bounds_clamps_out_of_range_cursor() {
        // Clamped to the end of the text, past the final '!': only the
        // empty tail remains
        assert_eq!(find_sentence_bounds(TEXT, 999), (28, 28));
    }

    #[test]
    fn test_bounds_never_contain_interior_boundary() {
        for cursor in 0..=TEXT.chars().count() {
            let (start, end) = find_sentence_bounds(TEXT, cursor);
            assert!(start <= cursor && cursor <= end);
            let chars: Vec<char> = TEXT.chars().collect();
            for i in start..end.saturating_sub(1) {
                assert!(!is_boundary(chars[i]), "boundary inside sentence at {}", i);
            }
        }
    }

    #[test]
    fn test_next_sentence_start() {
        // From inside the first sentence to the 'H' of "How"
        assert_eq!(next_sentence_start(TEXT, 3), Some(10));
        // From the second sentence to the 'F' of "Fine!"
        assert_eq!(next_sentence_start(TEXT, 12), Some(23));
        // Nothing after the final sentence
        assert_eq!(next_sentence_start(TEXT, 25), None);
    }

    #[test]
    fn test_prev_sentence_start() {
        // From inside "Fine!" back to its own start first
        assert_eq!(prev_sentence_start(TEXT, 25), Some(23));
        // From the start of "Fine!" back to the 'H' of "How"
        assert_eq!(prev_sentence_start(TEXT, 23), Some(10));
        // No boundary before the first sentence
        assert_eq!(prev_sentence_start(TEXT, 5), None);
    }

    #[test]
    fn test_map_offset_walks_runs() {
        let runs = vec![Run::plain("abc"), Run::emphasis("de"), Run::plain("f")];

        assert_eq!(
            map_offset_to_run(&runs, 1),
            Some(RunPosition { run: 0, offset: 1 })
        );
        // Tie at a run boundary resolves to the start of the next run
        assert_eq!(
            map_offset_to_run(&runs, 3),
            Some(RunPosition { run: 1, offset: 0 })
        );
        // Offset equal to total length lands at the end of the last run
        assert_eq!(
            map_offset_to_run(&runs, 6),
            Some(RunPosition { run: 2, offset: 1 })
        );
        // Past the end fails; callers clamp first
        assert_eq!(map_offset_to_run(&runs, 7), None);
    }

    #[test]
    fn test_map_offset_on_empty_run_list() {
        assert_eq!(map_offset_to_run(&[], 0), None);
    }
}

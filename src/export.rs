//! Export of answered questions
//!
//! Consumes `{ index, questionText, plainAnswerText }` per question in
//! order and renders a paginated plain-text document: each question gets
//! a fixed layout height, and a page break is emitted when the next
//! block would exceed the page.

use std::fmt::Write as _;
use std::path::PathBuf;

use tracing::info;

/// One question/answer pair handed to the export consumer
#[derive(Debug, Clone)]
pub struct ExportItem {
    pub index: usize,
    pub question_text: String,
    pub plain_answer_text: String,
}

/// Consumes export items and produces a document somewhere
pub trait ExportAdapter: Send {
    fn export(&mut self, items: &[ExportItem]) -> std::io::Result<()>;
}

/// Fixed layout height reserved for one question block
const BLOCK_LINES: usize = 12;
/// Lines available per page
const PAGE_LINES: usize = 48;

/// Render the paginated document; pages are separated by form feeds
pub fn render_document(items: &[ExportItem]) -> String {
    let mut out = String::new();
    let mut used = 0;

    for item in items {
        if used + BLOCK_LINES > PAGE_LINES && used > 0 {
            out.push('\x0c');
            used = 0;
        }
        let _ = writeln!(out, "Question {}", item.index + 1);
        let _ = writeln!(out, "{}", item.question_text);
        let _ = writeln!(out);
        let _ = writeln!(out, "Answer:");
        let _ = writeln!(out, "{}", item.plain_answer_text);
        let _ = writeln!(out);
        used += BLOCK_LINES;
    }

    out
}

/// Writes the rendered document to a file
pub struct FileExporter {
    path: PathBuf,
}

impl FileExporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ExportAdapter for FileExporter {
    fn export(&mut self, items: &[ExportItem]) -> std::io::Result<()> {
        std::fs::write(&self.path, render_document(items))?;
        info!(path = ?self.path, count = items.len(), "answers exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: usize) -> ExportItem {
        ExportItem {
            index,
            question_text: format!("Question text {index}"),
            plain_answer_text: format!("Answer text {index}"),
        }
    }

    #[test]
    fn test_render_contains_questions_in_order() {
        let doc = render_document(&[item(0), item(1)]);
        let q1 = doc.find("Question 1").unwrap();
        let q2 = doc.find("Question 2").unwrap();
        assert!(q1 < q2);
        assert!(doc.contains("Answer text 0"));
    }

    #[test]
    fn test_page_break_after_fixed_height() {
        // 4 blocks fit on a page; the 5th starts a new one
        let items: Vec<ExportItem> = (0..5).map(item).collect();
        let doc = render_document(&items);
        assert_eq!(doc.matches('\x0c').count(), 1);
        let pages: Vec<&str> = doc.split('\x0c').collect();
        assert!(pages[0].contains("Question 4"));
        assert!(pages[1].contains("Question 5"));
    }

    #[test]
    fn test_empty_answer_renders_blank() {
        let doc = render_document(&[ExportItem {
            index: 0,
            question_text: "Q?".to_string(),
            plain_answer_text: String::new(),
        }]);
        assert!(doc.contains("Answer:\n\n"));
    }
}

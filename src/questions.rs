//! Question list loading
//!
//! Questions are supplied as a JSON array of strings at session start.
//! A missing, unreadable, or empty file falls back to a fixed list so the
//! daemon always has something to dictate against.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One question in the fixed, ordered list. The index is 0-based and
/// stable for the lifetime of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub index: usize,
    pub text: String,
}

/// The ordered set of questions for this session
#[derive(Debug, Clone)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Build a set from raw question strings, falling back to the default
    /// list when empty.
    pub fn from_texts(texts: Vec<String>) -> Self {
        let texts = if texts.is_empty() {
            warn!("no questions supplied, using fallback list");
            fallback_questions()
        } else {
            texts
        };

        let questions = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Question {
                index,
                text: text.trim().to_string(),
            })
            .collect();

        Self { questions }
    }

    /// Load questions from a JSON array file. Any failure falls back to
    /// the default list.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(texts) => {
                    info!(?path, count = texts.len(), "questions loaded");
                    Self::from_texts(texts)
                }
                Err(e) => {
                    warn!(?path, ?e, "question file is not a JSON string array");
                    Self::from_texts(Vec::new())
                }
            },
            Err(e) => {
                warn!(?path, ?e, "question file unreadable");
                Self::from_texts(Vec::new())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

fn fallback_questions() -> Vec<String> {
    vec![
        "Who are you?".to_string(),
        "Where do you live?".to_string(),
        "Tell me about your project?".to_string(),
        "How was your day?".to_string(),
    ]
}

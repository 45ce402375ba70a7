//! Answer editing subsystem
//!
//! `navigator` holds the pure sentence/offset algorithms, `buffer` the
//! per-question rich-text content, and `controller` the edit-mode state.

pub mod buffer;
pub mod controller;
pub mod navigator;

pub use buffer::{AnswerBuffer, Run, RunStyle};
pub use controller::{EditModeController, EditState};

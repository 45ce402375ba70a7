//! Edit-mode state tracking
//!
//! At most one answer is ever under edit. Entering an edit while another
//! answer is being edited saves and exits the prior one first; exiting
//! always persists the buffer and clears its selection marking.

use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::store::PersistenceAdapter;

use super::buffer::AnswerBuffer;

/// Whether an answer is currently under edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    NotEditing,
    Editing(usize),
}

/// Finite-state wrapper around the edit lifecycle
#[derive(Debug)]
pub struct EditModeController {
    state: EditState,
}

impl Default for EditModeController {
    fn default() -> Self {
        Self::new()
    }
}

impl EditModeController {
    pub fn new() -> Self {
        Self {
            state: EditState::NotEditing,
        }
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn editing_index(&self) -> Option<usize> {
        match self.state {
            EditState::NotEditing => None,
            EditState::Editing(index) => Some(index),
        }
    }

    /// Enter edit mode for `index`. A different answer already under edit
    /// is saved and exited first; re-entering the same index is a no-op.
    /// The target buffer's cursor collapses to the start of its content.
    pub fn enter(
        &mut self,
        index: usize,
        buffers: &mut [AnswerBuffer],
        store: &mut dyn PersistenceAdapter,
    ) -> Result<(), StoreError> {
        let mut prior_result = Ok(());
        match self.state {
            EditState::Editing(current) if current == index => {
                debug!(index, "already editing this answer");
                return Ok(());
            }
            EditState::Editing(_) => {
                prior_result = self.exit(buffers, store);
            }
            EditState::NotEditing => {}
        }

        if let Some(buf) = buffers.get_mut(index) {
            buf.set_cursor(0);
            buf.clear_selection();
        }

        self.state = EditState::Editing(index);
        info!(index, "edit mode entered");
        prior_result
    }

    /// Leave edit mode, persisting the edited buffer. The buffer itself
    /// survives a failed save so the user can try again.
    pub fn exit(
        &mut self,
        buffers: &mut [AnswerBuffer],
        store: &mut dyn PersistenceAdapter,
    ) -> Result<(), StoreError> {
        let EditState::Editing(index) = self.state else {
            return Ok(());
        };
        self.state = EditState::NotEditing;

        let Some(buf) = buffers.get_mut(index) else {
            warn!(index, "edited buffer not found on exit");
            return Ok(());
        };

        buf.clear_selection();
        let result = store.save(index, &buf.rich_text());
        match &result {
            Ok(()) => info!(index, "edit saved, edit mode exited"),
            Err(e) => warn!(index, ?e, "failed to persist edited answer"),
        }
        result
    }
}

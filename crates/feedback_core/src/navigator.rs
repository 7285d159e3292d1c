//! crates/feedback_core/src/navigator.rs
//!
//! Read-only, one-block-per-page walk over a frozen draft.

use crate::domain::CompetencyBlock;
use std::sync::Arc;

/// Pages through a snapshot of competency blocks.
///
/// The blocks are held behind an `Arc<[_]>`, so the navigator cannot mutate
/// the draft it was built from.
#[derive(Debug, Clone)]
pub struct SurveyPreviewNavigator {
    blocks: Arc<[CompetencyBlock]>,
    cursor: usize,
}

impl SurveyPreviewNavigator {
    pub fn new(blocks: impl Into<Arc<[CompetencyBlock]>>) -> Self {
        Self {
            blocks: blocks.into(),
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The block on the current page, or `None` for an empty draft.
    pub fn current_block(&self) -> Option<&CompetencyBlock> {
        self.blocks.get(self.cursor)
    }

    /// `(page index, page count)`, or `None` for an empty draft.
    pub fn position(&self) -> Option<(usize, usize)> {
        (!self.is_empty()).then_some((self.cursor, self.blocks.len()))
    }

    pub fn has_next(&self) -> bool {
        self.cursor + 1 < self.blocks.len()
    }

    pub fn has_previous(&self) -> bool {
        self.cursor > 0
    }

    /// Moves forward one page. Returns false at the last page.
    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Moves back one page. Returns false at the first page.
    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Jumps to `page`, clamped to the available pages.
    pub fn go_to(&mut self, page: usize) {
        self.cursor = page.min(self.blocks.len().saturating_sub(1));
    }
}

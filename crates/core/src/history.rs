//! Linear undo/redo history of enhancement steps.
//!
//! Step 0 is the loaded image. Every later step is one committed enhancement
//! and remembers the rect, in its parent's pixel space, that produced it.
//! Committing new work below the tail discards the redo branch for good.

use crate::handle::ImageHandle;
use crate::viewport::Rect;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Output of the description service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescription {
    pub selection_description: String,
    pub prompt: String,
}

/// One entry of the history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStep {
    pub image: ImageHandle,
    pub description: Option<ImageDescription>,
    pub original_rect: Option<Rect>,
}

impl HistoryStep {
    /// The initially loaded image.
    pub fn root(image: ImageHandle) -> Self {
        Self {
            image,
            description: None,
            original_rect: None,
        }
    }

    /// A committed enhancement of `original_rect` in the parent step's image.
    pub fn enhancement(
        image: ImageHandle,
        description: ImageDescription,
        original_rect: Rect,
    ) -> Self {
        Self {
            image,
            description: Some(description),
            original_rect: Some(original_rect),
        }
    }

    pub fn is_root(&self) -> bool {
        self.description.is_none() && self.original_rect.is_none()
    }
}

/// Ordered steps plus the index of the displayed one.
#[derive(Debug, Clone, Default)]
pub struct History {
    steps: Vec<HistoryStep>,
    current: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the displayed step, `None` while empty.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn steps(&self) -> &[HistoryStep] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&HistoryStep> {
        self.steps.get(index)
    }

    pub fn current(&self) -> Option<&HistoryStep> {
        self.current.and_then(|i| self.steps.get(i))
    }

    /// The step the current one was derived from.
    pub fn parent_of_current(&self) -> Option<&HistoryStep> {
        match self.current {
            Some(i) if i > 0 => self.steps.get(i - 1),
            _ => None,
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.current, Some(i) if i > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.current, Some(i) if i + 1 < self.steps.len())
    }

    /// Replaces everything with a single root step.
    pub fn reset(&mut self, initial: HistoryStep) {
        self.steps.clear();
        self.steps.push(initial);
        self.current = Some(0);
        debug!("history reset");
    }

    /// Drops all steps.
    pub fn clear(&mut self) {
        self.steps.clear();
        self.current = None;
    }

    /// Appends a new tail step, discarding any redo steps first.
    ///
    /// Rejected (returns `false`) on an empty history: the root comes from [`History::reset`].
    pub fn commit_new(&mut self, step: HistoryStep) -> bool {
        let Some(current) = self.current else {
            return false;
        };

        if current + 1 < self.steps.len() {
            debug!(discarded = self.steps.len() - current - 1, "truncating redo branch");
            self.steps.truncate(current + 1);
        }
        self.steps.push(step);
        self.current = Some(self.steps.len() - 1);
        debug!(index = self.steps.len() - 1, "committed new step");
        true
    }

    /// Replaces the current step in place. Rejected at the root.
    ///
    /// Steps before and after the current one are left as they are.
    pub fn commit_replace(&mut self, step: HistoryStep) -> bool {
        match self.current {
            Some(i) if i > 0 => {
                self.steps[i] = step;
                debug!(index = i, "replaced step");
                true
            }
            _ => false,
        }
    }

    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.current = self.current.map(|i| i - 1);
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.current = self.current.map(|i| i + 1);
        true
    }

    /// Prompts of every step up to and including the current one, oldest first.
    pub fn prompt_context(&self) -> Vec<String> {
        self.prompts_before(self.context_end())
    }

    /// Descriptions of every step up to and including the current one, oldest first.
    pub fn descriptions_through_current(&self) -> Vec<ImageDescription> {
        self.descriptions_before(self.context_end())
    }

    /// Prompts of the steps strictly before `end`, oldest first.
    pub fn prompts_before(&self, end: usize) -> Vec<String> {
        self.descriptions_before(end)
            .into_iter()
            .map(|d| d.prompt)
            .collect()
    }

    /// Descriptions of the steps strictly before `end`, oldest first.
    pub fn descriptions_before(&self, end: usize) -> Vec<ImageDescription> {
        self.steps[..end.min(self.steps.len())]
            .iter()
            .filter_map(|s| s.description.clone())
            .collect()
    }

    fn context_end(&self) -> usize {
        self.current.map_or(0, |i| i + 1)
    }

    /// The history prefix ending at the current step.
    pub fn through_current(&self) -> &[HistoryStep] {
        match self.current {
            Some(i) => &self.steps[..=i],
            None => &[],
        }
    }
}

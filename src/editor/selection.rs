//! Selection tracking
//!
//! The host reports every platform selection change as a snapshot; only
//! selections that are non-empty after trimming and anchored inside the
//! content model are tracked. Anything else clears the tracked selection,
//! which disables the create-annotation affordance.

use crate::content::ContentModel;

/// What the host hands over when the platform selection changes.
#[derive(Debug, Clone)]
pub struct SelectionSnapshot {
    /// Stringified selection text, exactly as selected
    pub text: String,
    /// Child-index path of the anchor node, relative to the content root
    pub anchor_path: Vec<usize>,
    /// Character offset of the anchor within its leaf
    pub anchor_offset: usize,
}

/// A validated selection, ready to become an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSelection {
    pub text: String,
    /// Best-effort character offset from the start of the document text
    pub position: i64,
}

/// Tracks the current valid selection, if any.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    current: Option<TrackedSelection>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a selection change. Returns the tracked selection when the
    /// snapshot is valid; otherwise the tracker clears.
    pub fn on_selection_change(
        &mut self,
        model: &ContentModel,
        snapshot: Option<SelectionSnapshot>,
    ) -> Option<&TrackedSelection> {
        let Some(snapshot) = snapshot else {
            self.current = None;
            return None;
        };

        if snapshot.text.trim().is_empty() {
            self.current = None;
            return None;
        }

        // The anchor must live inside the content model's subtree.
        if model.node_at_path(&snapshot.anchor_path).is_none() {
            tracing::debug!("Selection anchored outside the editor; ignoring");
            self.current = None;
            return None;
        }

        let position = model
            .position_of(&snapshot.anchor_path, snapshot.anchor_offset)
            .unwrap_or(0) as i64;

        self.current = Some(TrackedSelection {
            text: snapshot.text,
            position,
        });
        self.current.as_ref()
    }

    /// The currently tracked selection, if any
    pub fn current(&self) -> Option<&TrackedSelection> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

//! Editor session
//!
//! Composes the content model, annotation store, selection tracker and
//! interaction controller for one open document. This is the surface the
//! host UI drives: selection changes come in, markers and activation
//! decisions come out.

pub mod format;
pub mod interaction;
pub mod selection;

pub use format::{InlineFormatter, InlineStyleKind};
pub use interaction::{InteractionController, PointerEvent, PopupState};
pub use selection::{SelectionSnapshot, SelectionTracker, TrackedSelection};

use crate::content::{anchor, style, ContentModel};
use crate::database::{Annotation, Document};
use crate::error::{AppError, Result};
use crate::services::settings::AnnotationSettings;
use crate::services::{AnnotationsService, DocumentsService};
use std::time::Instant;

/// One open document with its annotations applied.
pub struct EditorSession {
    document: Document,
    content: ContentModel,
    documents: DocumentsService,
    annotations: AnnotationsService,
    selection: SelectionTracker,
    interactions: InteractionController,
    settings: AnnotationSettings,
}

impl EditorSession {
    /// Open a document: parse its content, load its annotations in creation
    /// order, anchor and style a marker for each, and bind interactions.
    ///
    /// Annotations whose text no longer occurs anywhere stay unmarked; they
    /// still appear in the annotation list.
    pub async fn open(
        document: Document,
        documents: DocumentsService,
        annotations: AnnotationsService,
        settings: AnnotationSettings,
    ) -> Result<Self> {
        let mut content = ContentModel::parse(&document.content)?;
        let records = annotations.load_all(&document.id).await?;

        let mut interactions = InteractionController::new();
        for record in &records {
            // Saved markup may already carry the marker; re-application is a
            // no-op then, but the marker still needs its binding.
            if anchor::apply(&mut content, &record.text, &record.id)
                || content.find_marker(&record.id).is_some()
            {
                interactions.bind(&record.id, settings.trigger);
            } else {
                tracing::debug!(
                    "Annotation {} has no matching text; leaving it unmarked",
                    record.id
                );
            }
        }
        style::redecorate_all(&mut content, &settings);

        tracing::info!(
            "Opened document {} with {} annotations ({} anchored)",
            document.id,
            records.len(),
            interactions.bound_count()
        );

        Ok(Self {
            document,
            content,
            documents,
            annotations,
            selection: SelectionTracker::new(),
            interactions,
            settings,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn content(&self) -> &ContentModel {
        &self.content
    }

    /// Serialized content as the host should render it
    pub fn markup(&self) -> String {
        self.content.to_markup()
    }

    /// Current annotation records, creation order
    pub async fn annotations(&self) -> Vec<Annotation> {
        self.annotations.list().await
    }

    /// Ingest a selection change from the host. Returns whether a valid
    /// selection is now tracked (the create-annotation affordance).
    pub fn on_selection_change(&mut self, snapshot: Option<SelectionSnapshot>) -> bool {
        self.selection
            .on_selection_change(&self.content, snapshot)
            .is_some()
    }

    pub fn selection(&self) -> Option<&TrackedSelection> {
        self.selection.current()
    }

    /// Create an annotation from the tracked selection and anchor it.
    ///
    /// The record is stored first; only a successful insert touches the
    /// content model. The selection clears on success.
    pub async fn create_annotation(&mut self, context: &str) -> Result<Annotation> {
        let selection = self
            .selection
            .current()
            .ok_or_else(|| {
                AppError::Validation("No text selected. Please select text first.".to_string())
            })?
            .clone();

        let annotation = self
            .annotations
            .create(&self.document.id, &selection.text, context, selection.position)
            .await?;

        if anchor::apply(&mut self.content, &annotation.text, &annotation.id) {
            style::redecorate_all(&mut self.content, &self.settings);
            self.interactions.bind(&annotation.id, self.settings.trigger);
        }

        self.selection.clear();
        Ok(annotation)
    }

    /// Update an annotation's context note (used by the auto-save path).
    pub async fn update_annotation_context(&self, id: &str, new_context: &str) -> Result<bool> {
        self.annotations.update_context(id, new_context).await
    }

    /// Delete an annotation: record, list entry, marker and binding as one
    /// logical operation. A failed delete leaves all of them in place.
    pub async fn delete_annotation(&mut self, id: &str) -> Result<()> {
        let removed = self.annotations.delete(id).await?;

        anchor::remove(&mut self.content, &removed.id);
        self.interactions.unbind(&removed.id);

        Ok(())
    }

    /// Feed a marker pointer event through its state machine. Returns `true`
    /// when the host should open the annotation detail surface.
    pub fn handle_marker_event(
        &mut self,
        annotation_id: &str,
        event: PointerEvent,
        now: Instant,
    ) -> bool {
        let selection_active = self.selection.current().is_some();
        self.interactions
            .handle(annotation_id, event, now, selection_active)
    }

    /// Apply new annotation settings to every live marker without a reload:
    /// restyle holistically (ambient colors survive) and rebind triggers.
    pub fn apply_settings(&mut self, settings: AnnotationSettings) {
        self.settings = settings;
        let restyled = style::redecorate_all(&mut self.content, &self.settings);
        self.interactions.rebind_all(self.settings.trigger);
        tracing::debug!("Restyled {} markers after settings change", restyled);
    }

    /// Replace the content with host-edited markup and re-apply annotations.
    ///
    /// Re-application is idempotent: text already wrapped stays wrapped once,
    /// and annotations whose text reappeared get their marker back.
    pub async fn sync_content(&mut self, markup: &str) -> Result<()> {
        self.content = ContentModel::parse(markup)?;

        for record in self.annotations.list().await {
            if anchor::apply(&mut self.content, &record.text, &record.id)
                || self.content.find_marker(&record.id).is_some()
            {
                self.interactions.bind(&record.id, self.settings.trigger);
            } else {
                self.interactions.unbind(&record.id);
            }
        }
        style::redecorate_all(&mut self.content, &self.settings);

        // The old tree is gone, so any tracked selection is stale.
        self.selection.clear();
        Ok(())
    }

    /// Persist the current content. Bounded by the save timeout; the
    /// underlying write is never cancelled.
    pub async fn save(&mut self) -> Result<&Document> {
        let markup = self.content.to_markup();
        let document = self.documents.save_content(&self.document.id, &markup).await?;
        self.document = document;
        Ok(&self.document)
    }
}

//! Annotations service
//!
//! The annotation store for the currently open document: an ordered
//! in-memory list kept consistent with the persistence layer. Context edits
//! auto-save through a debouncer that fires after the typing settles and
//! flushes immediately on focus loss.

use crate::config::{AUTO_SAVE_DEBOUNCE, MAX_CONTEXT_LENGTH};
use crate::database::{Annotation, CreateAnnotationRequest, Repository};
use crate::error::{AppError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Service owning the open document's annotation records
#[derive(Clone)]
pub struct AnnotationsService {
    repo: Repository,
    annotations: Arc<Mutex<Vec<Annotation>>>,
}

impl AnnotationsService {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            annotations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Load a document's annotations in creation order, replacing the
    /// in-memory list.
    pub async fn load_all(&self, document_id: &str) -> Result<Vec<Annotation>> {
        let loaded = self.repo.list_annotations(document_id).await?;

        let mut list = self.annotations.lock().await;
        *list = loaded.clone();

        tracing::debug!(
            "Loaded {} annotations for document {}",
            loaded.len(),
            document_id
        );
        Ok(loaded)
    }

    /// Snapshot of the in-memory list
    pub async fn list(&self) -> Vec<Annotation> {
        self.annotations.lock().await.clone()
    }

    /// One annotation from the in-memory list
    pub async fn get(&self, id: &str) -> Option<Annotation> {
        self.annotations.lock().await.iter().find(|a| a.id == id).cloned()
    }

    /// Create an annotation for the selected text.
    ///
    /// A failed insert leaves the in-memory list untouched; no optimistic
    /// entry survives a failed write.
    pub async fn create(
        &self,
        document_id: &str,
        text: &str,
        context: &str,
        position: i64,
    ) -> Result<Annotation> {
        if text.trim().is_empty() {
            return Err(AppError::Validation(
                "No text selected for annotation".to_string(),
            ));
        }
        let context = context.trim();
        if context.is_empty() {
            return Err(AppError::Validation("Please enter some context".to_string()));
        }
        if context.len() > MAX_CONTEXT_LENGTH {
            return Err(AppError::Validation(format!(
                "Context is limited to {} characters",
                MAX_CONTEXT_LENGTH
            )));
        }

        let annotation = self
            .repo
            .create_annotation(CreateAnnotationRequest {
                document_id: document_id.to_string(),
                text: text.to_string(),
                context: context.to_string(),
                position,
            })
            .await?;

        self.annotations.lock().await.push(annotation.clone());

        tracing::info!("Annotation saved: {}", annotation.id);
        Ok(annotation)
    }

    /// Update an annotation's context note.
    ///
    /// Returns `Ok(false)` without a persistence call when the value is
    /// unchanged. The local record is updated before the write; if the write
    /// fails, the local edit stays and the error is reported — local and
    /// remote diverge until a retry succeeds.
    pub async fn update_context(&self, id: &str, new_context: &str) -> Result<bool> {
        {
            let mut list = self.annotations.lock().await;
            let record = list
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| AppError::AnnotationNotFound(id.to_string()))?;

            if record.context == new_context {
                return Ok(false);
            }
            record.context = new_context.to_string();
        }

        self.repo.update_annotation_context(id, new_context).await?;

        tracing::debug!("Annotation context updated: {}", id);
        Ok(true)
    }

    /// Delete an annotation.
    ///
    /// The row goes first; only then is the list entry removed and the
    /// deleted record handed back so the caller can strip its marker. A
    /// failed delete leaves both the entry and the marker in place.
    pub async fn delete(&self, id: &str) -> Result<Annotation> {
        self.repo.delete_annotation(id).await?;

        let mut list = self.annotations.lock().await;
        let index = list
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| AppError::AnnotationNotFound(id.to_string()))?;
        let removed = list.remove(index);

        tracing::info!("Annotation deleted: {}", id);
        Ok(removed)
    }

    /// Number of annotations attached to a document (persisted count, for
    /// dashboard cards)
    pub async fn count(&self, document_id: &str) -> Result<i64> {
        self.repo.count_annotations(document_id).await
    }
}

/// Debounced auto-save for context edits.
///
/// Each keystroke replaces the pending write; the write fires once the
/// typing has settled for the configured delay, or immediately on focus
/// loss via [`ContextAutosave::flush`].
pub struct ContextAutosave {
    service: AnnotationsService,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl ContextAutosave {
    pub fn new(service: AnnotationsService) -> Self {
        Self::with_delay(service, AUTO_SAVE_DEBOUNCE)
    }

    pub fn with_delay(service: AnnotationsService, delay: Duration) -> Self {
        Self {
            service,
            delay,
            pending: None,
        }
    }

    /// Note an edit; the save fires after the delay unless another edit or a
    /// flush supersedes it.
    pub fn on_edit(&mut self, annotation_id: &str, new_context: &str) {
        self.cancel();

        let service = self.service.clone();
        let delay = self.delay;
        let id = annotation_id.to_string();
        let context = new_context.to_string();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = service.update_context(&id, &context).await {
                tracing::warn!("Auto-save of annotation {} failed: {}", id, e);
            }
        }));
    }

    /// Focus loss: drop any pending write and save now.
    pub async fn flush(&mut self, annotation_id: &str, new_context: &str) -> Result<bool> {
        self.cancel();
        self.service.update_context(annotation_id, new_context).await
    }

    /// Abandon the pending write, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl Drop for ContextAutosave {
    fn drop(&mut self) {
        self.cancel();
    }
}

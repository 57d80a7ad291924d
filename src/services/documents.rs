//! Documents service
//!
//! High-level business logic for document lifecycle: creation, listing,
//! renaming, explicit saves and deletion. Saves are guarded against
//! re-entry and abandoned (not cancelled) after a timeout.

use crate::config::{LARGE_DOCUMENT_BYTES, MAX_TITLE_LENGTH, SAVE_TIMEOUT};
use crate::database::{CreateDocumentRequest, Document, Repository};
use crate::error::{AppError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Service for managing documents
#[derive(Clone)]
pub struct DocumentsService {
    repo: Repository,
    saving: Arc<AtomicBool>,
}

impl DocumentsService {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            saving: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a new, empty document
    pub async fn create(&self, user_id: &str, title: &str) -> Result<Document> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation(
                "Please enter a document title".to_string(),
            ));
        }
        if title.len() > MAX_TITLE_LENGTH {
            return Err(AppError::Validation(format!(
                "Title is limited to {} characters",
                MAX_TITLE_LENGTH
            )));
        }

        tracing::info!("Creating new document: {}", title);

        let document = self
            .repo
            .create_document(CreateDocumentRequest {
                user_id: user_id.to_string(),
                title: title.to_string(),
            })
            .await?;

        tracing::info!("Document created successfully: {}", document.id);

        Ok(document)
    }

    /// Get a document by ID
    pub async fn get(&self, id: &str) -> Result<Document> {
        self.repo.get_document(id).await
    }

    /// List a user's documents, most recently updated first
    pub async fn list(&self, user_id: &str) -> Result<Vec<Document>> {
        self.repo.list_documents(user_id).await
    }

    /// Rename a document. Blank or unchanged titles are a no-op; on failure
    /// the stored title stays authoritative.
    pub async fn rename(&self, id: &str, new_title: &str) -> Result<Document> {
        let current = self.repo.get_document(id).await?;

        let new_title = new_title.trim();
        if new_title.is_empty() || new_title == current.title {
            return Ok(current);
        }
        if new_title.len() > MAX_TITLE_LENGTH {
            return Err(AppError::Validation(format!(
                "Title is limited to {} characters",
                MAX_TITLE_LENGTH
            )));
        }

        self.repo.update_document_title(id, new_title).await
    }

    /// Save document content.
    ///
    /// Only one save may be in flight at a time. The wait is bounded: after
    /// the timeout the caller gets [`AppError::SaveTimeout`] and local state
    /// is usable again, but the underlying write keeps running and may still
    /// land.
    pub async fn save_content(&self, id: &str, content: &str) -> Result<Document> {
        if self.saving.swap(true, Ordering::SeqCst) {
            return Err(AppError::SaveInProgress);
        }

        if content.len() > LARGE_DOCUMENT_BYTES {
            tracing::warn!(
                "Document {} is large ({} bytes); save may take a moment",
                id,
                content.len()
            );
        }

        let repo = self.repo.clone();
        let task_id = id.to_string();
        let task_content = content.to_string();
        let write = tokio::spawn(async move {
            repo.update_document_content(&task_id, &task_content).await
        });

        let outcome = match tokio::time::timeout(SAVE_TIMEOUT, write).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(AppError::Generic(format!(
                "Save task failed: {}",
                join_error
            ))),
            Err(_) => {
                tracing::warn!("Save of document {} timed out after {:?}", id, SAVE_TIMEOUT);
                Err(AppError::SaveTimeout)
            }
        };

        self.saving.store(false, Ordering::SeqCst);

        match &outcome {
            Ok(document) => tracing::debug!("Document saved successfully: {}", document.id),
            Err(e) => tracing::warn!("Document save failed: {}", e),
        }

        outcome
    }

    /// Delete a document. Annotations cascade with it.
    pub async fn delete(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting document: {}", id);

        self.repo.delete_document(id).await?;

        tracing::info!("Document deleted successfully: {}", id);

        Ok(())
    }

    /// Short plain-text preview for dashboard cards: markup stripped, first
    /// ten words.
    pub fn preview(content: &str) -> String {
        let text = strip_markup(content);
        let text = text.trim();
        if text.is_empty() {
            return "Empty document".to_string();
        }

        let words: Vec<&str> = text.split_whitespace().take(10).collect();
        let mut preview = words.join(" ");
        if preview.len() < text.len() {
            preview.push_str("...");
        }
        preview
    }
}

/// Drop everything between `<` and `>`, keeping the text in between.
fn strip_markup(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_service() -> (DocumentsService, Repository, String) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        let user = repo
            .create_user("writer@example.com", "not-a-real-hash")
            .await
            .unwrap();

        (DocumentsService::new(repo.clone()), repo, user.id)
    }

    #[tokio::test]
    async fn test_create_requires_title() {
        let (service, _repo, user_id) = create_test_service().await;

        let result = service.create(&user_id, "   ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let document = service.create(&user_id, "  Notes  ").await.unwrap();
        assert_eq!(document.title, "Notes");
    }

    #[tokio::test]
    async fn test_rename_noop_on_same_or_blank_title() {
        let (service, _repo, user_id) = create_test_service().await;
        let document = service.create(&user_id, "Notes").await.unwrap();

        let unchanged = service.rename(&document.id, "Notes").await.unwrap();
        assert_eq!(unchanged.title, "Notes");

        let blank = service.rename(&document.id, "  ").await.unwrap();
        assert_eq!(blank.title, "Notes");

        let renamed = service.rename(&document.id, "Field Notes").await.unwrap();
        assert_eq!(renamed.title, "Field Notes");
    }

    #[tokio::test]
    async fn test_save_content_round_trip() {
        let (service, _repo, user_id) = create_test_service().await;
        let document = service.create(&user_id, "Notes").await.unwrap();

        let saved = service
            .save_content(&document.id, "<p>The quick fox</p>")
            .await
            .unwrap();

        assert_eq!(saved.content, "<p>The quick fox</p>");

        let fetched = service.get(&document.id).await.unwrap();
        assert_eq!(fetched.content, "<p>The quick fox</p>");
    }

    #[tokio::test]
    async fn test_save_rejected_while_one_in_flight() {
        let (service, _repo, user_id) = create_test_service().await;
        let document = service.create(&user_id, "Notes").await.unwrap();

        // Simulate an in-flight save holding the guard.
        service.saving.store(true, Ordering::SeqCst);

        let result = service.save_content(&document.id, "<p>blocked</p>").await;
        assert!(matches!(result, Err(AppError::SaveInProgress)));

        // The store was not touched.
        let fetched = service.get(&document.id).await.unwrap();
        assert_eq!(fetched.content, "");

        service.saving.store(false, Ordering::SeqCst);
        service
            .save_content(&document.id, "<p>unblocked</p>")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_clears_document() {
        let (service, _repo, user_id) = create_test_service().await;
        let document = service.create(&user_id, "Notes").await.unwrap();

        service.delete(&document.id).await.unwrap();

        assert!(service.get(&document.id).await.is_err());
        assert!(service.list(&user_id).await.unwrap().is_empty());
    }

    #[test]
    fn test_preview_strips_markup_and_truncates() {
        assert_eq!(DocumentsService::preview(""), "Empty document");
        assert_eq!(DocumentsService::preview("<p></p>"), "Empty document");
        assert_eq!(
            DocumentsService::preview("<p>Hello <b>bold</b> world</p>"),
            "Hello bold world"
        );
        assert_eq!(
            DocumentsService::preview(
                "<p>one two three four five six seven eight nine ten eleven</p>"
            ),
            "one two three four five six seven eight nine ten..."
        );
    }
}

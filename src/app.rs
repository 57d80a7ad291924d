//! Application state and initialization
//!
//! This module wires the services together and owns the currently open
//! editor session. The host UI keeps one `App` for the lifetime of the
//! process and drives everything through it.

use crate::database::{create_pool, Annotation, Document, Repository, User};
use crate::editor::{EditorSession, SelectionSnapshot};
use crate::error::{AppError, Result};
use crate::services::{
    AnnotationsService, AppSettings, AuthService, DocumentsService, SettingsService,
};
use std::path::PathBuf;

/// Central application state holding all services and the open session
pub struct App {
    pub documents: DocumentsService,
    pub annotations: AnnotationsService,
    pub auth: AuthService,
    pub settings: SettingsService,
    session: Option<EditorSession>,
}

impl App {
    /// Initialize the application: data directories, database pool and
    /// services. Called once on startup.
    pub async fn new(app_data_dir: PathBuf) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("App data directory: {:?}", app_data_dir);

        std::fs::create_dir_all(&app_data_dir)?;

        let pool = create_pool(&app_data_dir.join("marginalia.db")).await?;
        let repo = Repository::new(pool);

        let app = Self {
            documents: DocumentsService::new(repo.clone()),
            annotations: AnnotationsService::new(repo.clone()),
            auth: AuthService::new(repo),
            settings: SettingsService::new(app_data_dir),
            session: None,
        };

        tracing::info!("Application initialized successfully");

        Ok(app)
    }

    /// The open editor session, if any
    pub fn session(&self) -> Option<&EditorSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut EditorSession> {
        self.session.as_mut()
    }

    /// List the signed-in user's documents, most recently updated first.
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        let user = self.require_user().await?;
        self.documents.list(&user.id).await
    }

    /// Create a new document for the signed-in user.
    pub async fn create_document(&self, title: &str) -> Result<Document> {
        let user = self.require_user().await?;
        self.documents.create(&user.id, title).await
    }

    /// Open one of the signed-in user's documents in the editor.
    pub async fn open_document(&mut self, id: &str) -> Result<&EditorSession> {
        let document = self.owned_document(id).await?;
        let settings = self.settings.get_annotation().await?;

        let session = EditorSession::open(
            document,
            self.documents.clone(),
            self.annotations.clone(),
            settings,
        )
        .await?;

        Ok(self.session.insert(session))
    }

    /// Close the open editor session, if any.
    pub fn close_document(&mut self) {
        self.session = None;
    }

    /// Rename one of the signed-in user's documents.
    pub async fn rename_document(&self, id: &str, new_title: &str) -> Result<Document> {
        self.owned_document(id).await?;
        self.documents.rename(id, new_title).await
    }

    /// Delete one of the signed-in user's documents. Annotations cascade,
    /// and the editor session closes if it held the document.
    pub async fn delete_document(&mut self, id: &str) -> Result<()> {
        self.owned_document(id).await?;
        self.documents.delete(id).await?;

        if self
            .session
            .as_ref()
            .map(|s| s.document().id == id)
            .unwrap_or(false)
        {
            self.session = None;
        }

        Ok(())
    }

    /// Ingest a selection change. Returns whether the create-annotation
    /// affordance should be enabled: a valid in-editor selection and a
    /// signed-in user.
    pub async fn selection_changed(&mut self, snapshot: Option<SelectionSnapshot>) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let tracked = session.on_selection_change(snapshot);
        tracked && self.auth.get_session().await.is_some()
    }

    /// Create an annotation from the current selection with the given
    /// context note.
    pub async fn create_annotation(&mut self, context: &str) -> Result<Annotation> {
        self.require_user().await?;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| AppError::Validation("No document is currently open".to_string()))?;
        session.create_annotation(context).await
    }

    /// Number of annotations on a document, for dashboard cards.
    pub async fn annotation_count(&self, document_id: &str) -> Result<i64> {
        self.annotations.count(document_id).await
    }

    /// Persist new settings and reapply them to the open session's markers
    /// without a reload.
    pub async fn update_settings(&mut self, settings: AppSettings) -> Result<()> {
        self.settings.save(&settings).await?;

        if let Some(session) = self.session.as_mut() {
            session.apply_settings(settings.annotation);
        }

        Ok(())
    }

    async fn require_user(&self) -> Result<User> {
        self.auth.current_user().await.ok_or(AppError::NotSignedIn)
    }

    /// Fetch a document and verify the signed-in user owns it. Documents of
    /// other users read as not found.
    async fn owned_document(&self, id: &str) -> Result<Document> {
        let user = self.require_user().await?;
        let document = self.documents.get(id).await?;
        if document.user_id != user.id {
            return Err(AppError::DocumentNotFound(id.to_string()));
        }
        Ok(document)
    }
}

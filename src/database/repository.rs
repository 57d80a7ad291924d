//! Repository layer for database operations
//!
//! This module provides CRUD operations for all entities. It is the crate's
//! row-store client: every persistence call the services make goes through
//! here.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ===== Documents =====

    /// Create a new document with empty content
    pub async fn create_document(&self, req: CreateDocumentRequest) -> Result<Document> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (id, user_id, title, content, created_at, updated_at)
            VALUES (?, ?, ?, '', ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.user_id)
        .bind(&req.title)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created document: {}", id);
        Ok(document)
    }

    /// Get a document by ID
    pub async fn get_document(&self, id: &str) -> Result<Document> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::DocumentNotFound(id.to_string()))?;

        Ok(document)
    }

    /// List a user's documents, most recently updated first
    pub async fn list_documents(&self, user_id: &str) -> Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents
            WHERE user_id = ?
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Update a document's title
    pub async fn update_document_title(&self, id: &str, title: &str) -> Result<Document> {
        let rows = sqlx::query("UPDATE documents SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::DocumentNotFound(id.to_string()));
        }

        self.get_document(id).await
    }

    /// Replace a document's content, refreshing its updated_at timestamp
    pub async fn update_document_content(&self, id: &str, content: &str) -> Result<Document> {
        let now = Utc::now();

        let rows = sqlx::query("UPDATE documents SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::DocumentNotFound(id.to_string()));
        }

        self.get_document(id).await
    }

    /// Delete a document. Its annotations go with it (foreign key cascade).
    pub async fn delete_document(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::DocumentNotFound(id.to_string()));
        }

        tracing::debug!("Deleted document: {}", id);
        Ok(())
    }

    // ===== Annotations =====

    /// Create an annotation
    pub async fn create_annotation(&self, req: CreateAnnotationRequest) -> Result<Annotation> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let annotation = sqlx::query_as::<_, Annotation>(
            r#"
            INSERT INTO annotations (id, document_id, text, context, position, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.document_id)
        .bind(&req.text)
        .bind(&req.context)
        .bind(req.position)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created annotation: {} for document: {}", id, req.document_id);
        Ok(annotation)
    }

    /// List a document's annotations in creation order
    pub async fn list_annotations(&self, document_id: &str) -> Result<Vec<Annotation>> {
        let annotations = sqlx::query_as::<_, Annotation>(
            r#"
            SELECT * FROM annotations
            WHERE document_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(annotations)
    }

    /// Update an annotation's context note
    pub async fn update_annotation_context(&self, id: &str, context: &str) -> Result<()> {
        let rows = sqlx::query("UPDATE annotations SET context = ? WHERE id = ?")
            .bind(context)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::AnnotationNotFound(id.to_string()));
        }

        Ok(())
    }

    /// Delete an annotation
    pub async fn delete_annotation(&self, id: &str) -> Result<()> {
        let rows = sqlx::query("DELETE FROM annotations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::AnnotationNotFound(id.to_string()));
        }

        tracing::debug!("Deleted annotation: {}", id);
        Ok(())
    }

    /// Number of annotations attached to a document
    pub async fn count_annotations(&self, document_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM annotations WHERE document_id = ?")
                .bind(document_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    // ===== Users and auth sessions =====

    /// Create a user with an already-hashed password
    pub async fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        if self.get_user_credentials(email).await?.is_some() {
            return Err(AppError::EmailTaken(email.to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, email, created_at
            "#,
        )
        .bind(&id)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created user: {}", id);
        Ok(user)
    }

    /// Look up login credentials by email
    pub async fn get_user_credentials(&self, email: &str) -> Result<Option<UserCredentials>> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            r#"
            SELECT id, email, password_hash FROM users WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credentials)
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, created_at FROM users WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Record a new auth session
    pub async fn create_auth_session(
        &self,
        token: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO auth_sessions (token, user_id, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up an auth session by token
    pub async fn get_auth_session(&self, token: &str) -> Result<Option<AuthSessionRecord>> {
        let session = sqlx::query_as::<_, AuthSessionRecord>(
            r#"
            SELECT * FROM auth_sessions WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Delete an auth session
    pub async fn delete_auth_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

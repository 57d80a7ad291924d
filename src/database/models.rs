//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for serialization to the host UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A rich-text document owned by one user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// Serialized rich-text markup
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create document request
#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub user_id: String,
    pub title: String,
}

/// A contextual annotation anchored to a document substring
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Annotation {
    pub id: String,
    pub document_id: String,
    /// The exact substring that was selected; doubles as the anchor key
    pub text: String,
    /// Free-form note attached to the span
    pub context: String,
    /// Best-effort character offset at creation time, never re-validated
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// Create annotation request
#[derive(Debug, Deserialize)]
pub struct CreateAnnotationRequest {
    pub document_id: String,
    pub text: String,
    pub context: String,
    pub position: i64,
}

/// A registered user, safe to hand to the host UI
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Login credentials row; never leaves the auth service
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

/// A live auth session row
#[derive(Debug, Clone, FromRow)]
pub struct AuthSessionRecord {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

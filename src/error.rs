//! Error types for the marginalia engine
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to the host UI for transient display.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Markup error: {0}")]
    Markup(#[from] quick_xml::Error),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Annotation not found: {0}")]
    AnnotationNotFound(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Please log in to continue")]
    NotSignedIn,

    #[error("Email is already registered: {0}")]
    EmailTaken(String),

    #[error("Save timed out")]
    SaveTimeout,

    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

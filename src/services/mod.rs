//! Services module
//!
//! Business logic services that coordinate between the editor session and
//! the repository.

pub mod annotations;
pub mod auth;
pub mod documents;
pub mod settings;

pub use annotations::{AnnotationsService, ContextAutosave};
pub use auth::{AuthEvent, AuthService, AuthSession};
pub use documents::DocumentsService;
pub use settings::{
    AnnotationSettings, AnnotationStyleKind, AnnotationTrigger, AppSettings, PopupCloseMode,
    SettingsService,
};

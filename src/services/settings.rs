//! Settings service
//!
//! Manages device-local preferences using JSON file storage. Settings are
//! loaded once at startup and written back whenever the user saves the
//! settings panel; annotation appearance changes are reapplied to live
//! markers by the editor session without a reload.

use crate::config::{self, DEFAULT_ANNOTATION_COLOR};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Visual mode for annotation markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStyleKind {
    Highlight,
    Underline,
}

/// How a marker opens its annotation detail surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationTrigger {
    Click,
    Hover,
}

/// How the annotation detail popup is dismissed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PopupCloseMode {
    ClickOutside,
    XOnly,
}

/// Annotation appearance and behavior preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSettings {
    #[serde(default = "default_style")]
    pub style: AnnotationStyleKind,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_trigger")]
    pub trigger: AnnotationTrigger,
    #[serde(default = "default_close_mode")]
    pub popup_close_mode: PopupCloseMode,
}

fn default_style() -> AnnotationStyleKind {
    AnnotationStyleKind::Highlight
}

fn default_color() -> String {
    DEFAULT_ANNOTATION_COLOR.to_string()
}

fn default_trigger() -> AnnotationTrigger {
    AnnotationTrigger::Click
}

fn default_close_mode() -> PopupCloseMode {
    PopupCloseMode::ClickOutside
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            style: default_style(),
            color: default_color(),
            trigger: default_trigger(),
            popup_close_mode: default_close_mode(),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub annotation: AnnotationSettings,
    #[serde(default)]
    pub dark_mode: bool,
}

impl AppSettings {
    /// Reject values the settings panel should never hand us.
    pub fn validate(&self) -> Result<()> {
        if !config::is_valid_hex_color(&self.annotation.color) {
            return Err(AppError::Validation(format!(
                "Annotation color must be a #rrggbb value, got '{}'",
                self.annotation.color
            )));
        }
        Ok(())
    }
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join("settings.json"),
        }
    }

    /// Load settings from disk or create defaults if not present
    pub async fn load(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Validate and save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        settings.validate()?;

        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Generic(format!("Failed to serialize settings: {}", e)))?;

        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    /// Get annotation appearance settings
    pub async fn get_annotation(&self) -> Result<AnnotationSettings> {
        let settings = self.load().await?;
        Ok(settings.annotation)
    }

    /// Update annotation appearance settings
    pub async fn update_annotation(&self, annotation: AnnotationSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.annotation = annotation;
        self.save(&settings).await?;
        Ok(())
    }

    /// Get the dark-mode flag
    pub async fn get_dark_mode(&self) -> Result<bool> {
        let settings = self.load().await?;
        Ok(settings.dark_mode)
    }

    /// Update the dark-mode flag
    pub async fn update_dark_mode(&self, dark_mode: bool) -> Result<()> {
        let mut settings = self.load().await?;
        settings.dark_mode = dark_mode;
        self.save(&settings).await?;
        Ok(())
    }
}

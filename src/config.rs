//! Application configuration constants
//!
//! Central location for all configuration constants, resource limits,
//! and validation boundaries used throughout the engine.

use std::time::Duration;

// ===== Annotation Appearance =====

/// Default marker color (amber) applied until the user picks another one
pub const DEFAULT_ANNOTATION_COLOR: &str = "#fbbf24";

/// Alpha applied to the marker background in highlight mode
pub const HIGHLIGHT_ALPHA: f32 = 0.3;

/// Corner radius of the highlight fill in pixels
pub const HIGHLIGHT_RADIUS_PX: u32 = 3;

/// Underline thickness in pixels
pub const UNDERLINE_THICKNESS_PX: u32 = 3;

/// Underline offset from the text baseline in pixels
pub const UNDERLINE_OFFSET_PX: u32 = 3;

// ===== Interaction Timing =====

/// Delay after pointer-up before the dragging flag clears.
/// Short enough that an intentional click is never swallowed.
pub const DRAG_RESET_DELAY: Duration = Duration::from_millis(50);

/// Maximum press duration still counted as a click.
/// Anything longer is treated as a drag-to-select gesture.
pub const CLICK_MAX_PRESS: Duration = Duration::from_millis(200);

// ===== Persistence Timing =====

/// Context auto-save fires this long after the last edit
pub const AUTO_SAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Document saves are abandoned (not cancelled) after this long
pub const SAVE_TIMEOUT: Duration = Duration::from_secs(15);

/// Content size above which a save logs an advisory
pub const LARGE_DOCUMENT_BYTES: usize = 100 * 1024;

// ===== Auth Limits =====

/// Minimum password length accepted at sign-up
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Auth sessions expire this many days after creation
pub const SESSION_TTL_DAYS: i64 = 30;

// ===== Validation Limits =====

/// Maximum length for a document title
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum length for an annotation context note
pub const MAX_CONTEXT_LENGTH: usize = 10_000;

/// Check that a color string is a `#rrggbb` hex value.
/// Manual parsing instead of regex to avoid adding the `regex` crate dependency.
pub fn is_valid_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_validation() {
        assert!(is_valid_hex_color("#fbbf24"));
        assert!(is_valid_hex_color("#000000"));
        assert!(is_valid_hex_color("#ABCDEF"));

        assert!(!is_valid_hex_color("fbbf24"));
        assert!(!is_valid_hex_color("#fbbf2"));
        assert!(!is_valid_hex_color("#fbbf244"));
        assert!(!is_valid_hex_color("#fbbf2g"));
        assert!(!is_valid_hex_color(""));
    }
}

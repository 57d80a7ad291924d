//! Marker style engine
//!
//! Derives the rendered appearance of annotation markers from the user's
//! settings and applies it as an inline style. Restyling is holistic: every
//! property is replaced except an ambient text color captured at anchor
//! time, which always survives.

use super::Element;
use crate::config::{
    DEFAULT_ANNOTATION_COLOR, HIGHLIGHT_ALPHA, HIGHLIGHT_RADIUS_PX, UNDERLINE_OFFSET_PX,
    UNDERLINE_THICKNESS_PX,
};
use crate::config::is_valid_hex_color;
use crate::content::ContentModel;
use crate::services::settings::{AnnotationSettings, AnnotationStyleKind};

/// Computed inline style for a marker element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerStyle {
    css: String,
}

impl MarkerStyle {
    /// Derive the marker appearance from the current settings.
    pub fn compute(settings: &AnnotationSettings) -> Self {
        let css = match settings.style {
            AnnotationStyleKind::Highlight => format!(
                "background-color: {}; padding: 2px 4px; border-radius: {}px; \
                 text-decoration: none; cursor: pointer; transition: all 0.2s",
                hex_to_rgba(&settings.color, HIGHLIGHT_ALPHA)
                    .unwrap_or_else(default_highlight_fill),
                HIGHLIGHT_RADIUS_PX,
            ),
            AnnotationStyleKind::Underline => format!(
                "text-decoration: underline; text-decoration-color: {}; \
                 text-decoration-thickness: {}px; text-underline-offset: {}px; \
                 text-decoration-skip-ink: none; background: transparent; \
                 padding: 2px 0; cursor: pointer; transition: all 0.2s",
                valid_color_or_default(&settings.color),
                UNDERLINE_THICKNESS_PX,
                UNDERLINE_OFFSET_PX,
            ),
        };
        Self { css }
    }

    pub fn css(&self) -> &str {
        &self.css
    }
}

/// Apply a computed style to one marker, preserving any ambient text color
/// already present on it.
pub fn decorate(marker: &mut Element, style: &MarkerStyle) {
    let preserved = marker.style_property("color");
    let mut css = style.css().to_string();
    if let Some(color) = preserved {
        css.push_str("; color: ");
        css.push_str(&color);
    }
    marker.set_attr("style", css);
}

/// Re-style every marker in the model from the given settings.
///
/// Used when the user saves a style or color change: live markers update in
/// place, no reload. Returns the number of markers touched.
pub fn redecorate_all(model: &mut ContentModel, settings: &AnnotationSettings) -> usize {
    let style = MarkerStyle::compute(settings);
    let mut count = 0;
    model.for_each_element_mut(&mut |el| {
        if el.is_marker() {
            decorate(el, &style);
            count += 1;
        }
    });
    count
}

/// Convert `#rrggbb` into an `rgba(r, g, b, a)` fill.
pub fn hex_to_rgba(hex: &str, alpha: f32) -> Option<String> {
    if !is_valid_hex_color(hex) {
        return None;
    }
    let r = u8::from_str_radix(&hex[1..3], 16).ok()?;
    let g = u8::from_str_radix(&hex[3..5], 16).ok()?;
    let b = u8::from_str_radix(&hex[5..7], 16).ok()?;
    Some(format!("rgba({}, {}, {}, {})", r, g, b, alpha))
}

fn valid_color_or_default(color: &str) -> &str {
    if is_valid_hex_color(color) {
        color
    } else {
        DEFAULT_ANNOTATION_COLOR
    }
}

fn default_highlight_fill() -> String {
    // The default color is a known-good constant.
    hex_to_rgba(DEFAULT_ANNOTATION_COLOR, HIGHLIGHT_ALPHA)
        .unwrap_or_else(|| format!("rgba(251, 191, 36, {})", HIGHLIGHT_ALPHA))
}

//! Host formatting capability
//!
//! Inline formatting (bold, alignment, fonts, colors) is executed by the
//! host platform's native text-editing surface, not by this crate. The
//! trait below is the seam: the host implements it, the toolbar layer calls
//! through it, and the annotation engine stays platform-independent.

use crate::error::Result;

/// Inline formatting operations the host surface understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineStyleKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    BulletList,
    NumberList,
    FontName,
    TextColor,
    HighlightColor,
    AlignLeft,
    AlignCenter,
    AlignRight,
    Justify,
}

/// Capability interface for the host's native text-editing commands.
pub trait InlineFormatter {
    /// Apply a formatting command to the current selection. `value` carries
    /// the parameter for value-taking kinds (font name, colors).
    fn apply_inline_style(&mut self, kind: InlineStyleKind, value: Option<&str>) -> Result<()>;

    /// Whether the current selection already carries the given style, used
    /// to render toolbar toggle state.
    fn query_inline_state(&self, kind: InlineStyleKind) -> bool;
}

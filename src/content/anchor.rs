//! Annotation anchoring
//!
//! An annotation is keyed by the exact substring that was selected when it
//! was created. Anchoring walks the text leaves of the content model in
//! document order and wraps the first occurrence of that substring in a
//! marker element. Later occurrences are left alone, and a miss is not an
//! error: the record simply has no visible marker until matching text
//! reappears.

use super::{Element, Node, ANNOTATION_ID_ATTR, MARKER_CLASS, TEXT_COLOR_ATTR};
use crate::content::ContentModel;

/// Ambient text color found on an enclosing wrapper, carried onto the marker
/// so existing formatting is not visually lost under the decoration.
#[derive(Debug, Clone)]
enum AmbientColor {
    /// From an inline `style="color: …"` declaration
    Style(String),
    /// From a `data-text-color` attribute
    DataAttr(String),
}

/// Wrap the first occurrence of `text` in a marker for `annotation_id`.
///
/// Returns `false` without touching the model when `text` is empty or no
/// unwrapped leaf contains it. Text already inside a marker is never
/// considered, so re-applying for an anchored annotation is a no-op.
pub fn apply(model: &mut ContentModel, text: &str, annotation_id: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    apply_in(&mut model.nodes, text, annotation_id, None)
}

fn apply_in(
    nodes: &mut Vec<Node>,
    text: &str,
    annotation_id: &str,
    inherited: Option<&AmbientColor>,
) -> bool {
    let mut index = 0;
    while index < nodes.len() {
        let split = match &nodes[index] {
            Node::Text(content) => content.find(text).map(|at| {
                (
                    content[..at].to_string(),
                    content[at + text.len()..].to_string(),
                )
            }),
            Node::Element(_) => None,
        };

        if let Some((before, after)) = split {
            let mut replacement = Vec::with_capacity(3);
            if !before.is_empty() {
                replacement.push(Node::Text(before));
            }
            replacement.push(Node::Element(make_marker(text, annotation_id, inherited)));
            if !after.is_empty() {
                replacement.push(Node::Text(after));
            }

            nodes.remove(index);
            for (offset, piece) in replacement.into_iter().enumerate() {
                nodes.insert(index + offset, piece);
            }
            return true;
        }

        if let Node::Element(el) = &mut nodes[index] {
            // Markers never nest; their text is already claimed.
            if !el.is_marker() {
                let own = ambient_color_of(el);
                let effective = own.as_ref().or(inherited);
                if apply_in(&mut el.children, text, annotation_id, effective) {
                    return true;
                }
            }
        }
        index += 1;
    }
    false
}

/// Strip every marker for `annotation_id`, splicing its text back into the
/// surrounding run and merging the seams.
///
/// Returns `true` if at least one marker was removed.
pub fn remove(model: &mut ContentModel, annotation_id: &str) -> bool {
    let mut removed = false;
    while remove_first(&mut model.nodes, annotation_id) {
        removed = true;
    }
    if removed {
        model.normalize();
    }
    removed
}

fn remove_first(nodes: &mut Vec<Node>, annotation_id: &str) -> bool {
    for index in 0..nodes.len() {
        let replace = match &nodes[index] {
            Node::Element(el) if el.is_marker() && el.annotation_id() == Some(annotation_id) => {
                Some(el.plain_text())
            }
            _ => None,
        };
        if let Some(text) = replace {
            nodes[index] = Node::Text(text);
            return true;
        }
        if let Node::Element(el) = &mut nodes[index] {
            if remove_first(&mut el.children, annotation_id) {
                return true;
            }
        }
    }
    false
}

fn make_marker(text: &str, annotation_id: &str, ambient: Option<&AmbientColor>) -> Element {
    let mut marker = Element::new("span");
    marker.set_attr("class", MARKER_CLASS);
    marker.set_attr(ANNOTATION_ID_ATTR, annotation_id);
    match ambient {
        Some(AmbientColor::Style(color)) => {
            marker.set_attr("style", format!("color: {}", color));
        }
        Some(AmbientColor::DataAttr(color)) => {
            marker.set_attr(TEXT_COLOR_ATTR, color.clone());
        }
        None => {}
    }
    marker.children.push(Node::Text(text.to_string()));
    marker
}

/// The wrapper's own text color, if it declares one. An inline style
/// declaration wins over the `data-text-color` attribute.
fn ambient_color_of(el: &Element) -> Option<AmbientColor> {
    if let Some(color) = el.style_property("color") {
        return Some(AmbientColor::Style(color));
    }
    el.attr(TEXT_COLOR_ATTR)
        .map(|color| AmbientColor::DataAttr(color.to_string()))
}

//! Rich-text content model
//!
//! The document body is a tree of text runs and inline wrapper elements,
//! parsed from and serialized to well-formed rich-text markup. The host
//! editing surface mutates the same markup; this module gives the engine a
//! structural view of it for anchoring and styling.

pub mod anchor;
pub mod style;

use crate::error::Result;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Class carried by every annotation marker element
pub const MARKER_CLASS: &str = "annotated-text";

/// Attribute linking a marker back to its annotation record
pub const ANNOTATION_ID_ATTR: &str = "data-annotation-id";

/// Attribute carrying an ambient text color captured at anchor time
pub const TEXT_COLOR_ATTR: &str = "data-text-color";

/// A node in the content tree: a text run or an inline wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Element(Element),
}

/// An inline wrapper element (`<b>`, `<span style="…">`, marker spans, …).
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| k != name);
    }

    /// Whether this element is an annotation marker.
    pub fn is_marker(&self) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|part| part == MARKER_CLASS))
            .unwrap_or(false)
    }

    pub fn annotation_id(&self) -> Option<&str> {
        self.attr(ANNOTATION_ID_ATTR)
    }

    /// Read one property out of the inline `style` attribute.
    pub fn style_property(&self, property: &str) -> Option<String> {
        let style = self.attr("style")?;
        for declaration in style.split(';') {
            let mut parts = declaration.splitn(2, ':');
            let name = parts.next()?.trim();
            if name.eq_ignore_ascii_case(property) {
                let value = parts.next()?.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
        None
    }

    /// Concatenated text of this element's subtree.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

/// The parsed document body. The node list is the element's child order;
/// text may appear at the top level alongside wrappers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentModel {
    pub nodes: Vec<Node>,
}

impl ContentModel {
    /// Parse serialized rich-text markup into a tree.
    ///
    /// The stored format is well-formed: every tag is closed (`<br/>`, not
    /// `<br>`) and attribute values are quoted.
    pub fn parse(markup: &str) -> Result<Self> {
        let mut reader = Reader::from_str(markup);
        let mut stack: Vec<Element> = Vec::new();
        let mut roots: Vec<Node> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let element = element_from_start(&start)?;
                    stack.push(element);
                }
                Event::End(_) => {
                    if let Some(done) = stack.pop() {
                        attach(&mut stack, &mut roots, Node::Element(done));
                    }
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut roots, Node::Element(element));
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| {
                            crate::error::AppError::Generic(format!("Malformed text run: {}", e))
                        })?
                        .into_owned();
                    if !text.is_empty() {
                        attach(&mut stack, &mut roots, Node::Text(text));
                    }
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    if !text.is_empty() {
                        attach(&mut stack, &mut roots, Node::Text(text));
                    }
                }
                Event::Eof => break,
                // Comments, processing instructions and declarations carry no
                // document content.
                _ => {}
            }
        }

        // Unclosed tags: fold whatever is left on the stack into the tree
        // rather than dropping content.
        while let Some(done) = stack.pop() {
            attach(&mut stack, &mut roots, Node::Element(done));
        }

        Ok(Self { nodes: roots })
    }

    /// Serialize back to markup. Inverse of [`ContentModel::parse`] for any
    /// tree this engine produces.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_nodes(&self.nodes, &mut out);
        out
    }

    /// Concatenated text of every text leaf, in document order.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.nodes, &mut out);
        out
    }

    /// Merge adjacent text leaves and drop empty ones, recursively.
    pub fn normalize(&mut self) {
        normalize_nodes(&mut self.nodes);
    }

    /// Resolve a child-index path to a node, if it exists.
    pub fn node_at_path(&self, path: &[usize]) -> Option<&Node> {
        let (&last, ancestors) = path.split_last()?;
        let mut nodes = &self.nodes;
        for &index in ancestors {
            match nodes.get(index)? {
                Node::Element(el) => nodes = &el.children,
                // A text leaf can only terminate a path.
                Node::Text(_) => return None,
            }
        }
        nodes.get(last)
    }

    /// Character offset of `(path, offset_in_leaf)` from the start of the
    /// document text, or `None` when the path does not resolve.
    pub fn position_of(&self, path: &[usize], offset_in_leaf: usize) -> Option<usize> {
        let mut total = 0usize;
        if position_walk(&self.nodes, path, offset_in_leaf, &mut total) {
            Some(total)
        } else {
            None
        }
    }

    /// Visit every element in document order, mutably.
    pub fn for_each_element_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        visit_elements_mut(&mut self.nodes, f);
    }

    /// The marker element for an annotation, if present.
    pub fn find_marker(&self, annotation_id: &str) -> Option<&Element> {
        find_marker_in(&self.nodes, annotation_id)
    }
}

fn element_from_start(start: &quick_xml::events::BytesStart<'_>) -> Result<Element> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(tag);
    for attr in start.attributes() {
        let attr =
            attr.map_err(|e| crate::error::AppError::Generic(format!("Malformed attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| crate::error::AppError::Generic(format!("Malformed attribute: {}", e)))?
            .into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&quick_xml::escape::escape(text.as_str())),
            Node::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (key, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&quick_xml::escape::escape(value.as_str()));
                    out.push('"');
                }
                if el.children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    write_nodes(&el.children, out);
                    out.push_str("</");
                    out.push_str(&el.tag);
                    out.push('>');
                }
            }
        }
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => collect_text(&el.children, out),
        }
    }
}

fn normalize_nodes(nodes: &mut Vec<Node>) {
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
    for mut node in nodes.drain(..) {
        if let Node::Element(el) = &mut node {
            normalize_nodes(&mut el.children);
        }
        if let Node::Text(text) = &node {
            if text.is_empty() {
                continue;
            }
            if let Some(Node::Text(previous)) = merged.last_mut() {
                previous.push_str(text);
                continue;
            }
        }
        merged.push(node);
    }
    *nodes = merged;
}

fn position_walk(nodes: &[Node], path: &[usize], offset: usize, total: &mut usize) -> bool {
    let Some((&head, rest)) = path.split_first() else {
        return false;
    };
    if head >= nodes.len() {
        return false;
    }
    for node in &nodes[..head] {
        match node {
            Node::Text(text) => *total += text.chars().count(),
            Node::Element(el) => *total += el.plain_text().chars().count(),
        }
    }
    match &nodes[head] {
        Node::Text(text) => {
            if !rest.is_empty() {
                return false;
            }
            *total += text.chars().count().min(offset);
            true
        }
        Node::Element(el) => {
            if rest.is_empty() {
                // Path ends on an element: position is the start of it.
                true
            } else {
                position_walk(&el.children, rest, offset, total)
            }
        }
    }
}

fn visit_elements_mut(nodes: &mut [Node], f: &mut impl FnMut(&mut Element)) {
    for node in nodes {
        if let Node::Element(el) = node {
            f(el);
            visit_elements_mut(&mut el.children, f);
        }
    }
}

fn find_marker_in<'a>(nodes: &'a [Node], annotation_id: &str) -> Option<&'a Element> {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.is_marker() && el.annotation_id() == Some(annotation_id) {
                return Some(el);
            }
            if let Some(found) = find_marker_in(&el.children, annotation_id) {
                return Some(found);
            }
        }
    }
    None
}

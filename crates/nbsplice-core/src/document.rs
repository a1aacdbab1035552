//! Document tree.
//!
//! A small docutils-style node tree: elements carry a tag, classes,
//! attributes and children; text nodes are leaves.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Node type (`container`, `literal_block`, `rubric`, ...)
    pub tag: String,

    /// CSS classes
    pub classes: Vec<String>,

    /// Other attributes, sorted by name
    pub attributes: BTreeMap<String, String>,

    /// Child nodes
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Add a class.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Append a child.
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several children.
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Whether the element carries the given class.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Attribute value.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Node {
    /// Create a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    /// The element, if this is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    /// Tag name (`#text` for text nodes).
    pub fn tag(&self) -> &str {
        match self {
            Node::Element(element) => &element.tag,
            Node::Text(_) => "#text",
        }
    }

    /// Children (empty for text nodes).
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(element) => &element.children,
            Node::Text(_) => &[],
        }
    }

    /// Child at `index`.
    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children().get(index)
    }

    /// Concatenated text content.
    pub fn astext(&self) -> String {
        match self {
            Node::Text(text) => text.clone(),
            Node::Element(element) => element.children.iter().map(Node::astext).collect(),
        }
    }

    /// Indented pseudo-XML rendering, used in diagnostics.
    pub fn pformat(&self) -> String {
        let mut out = String::new();
        self.pformat_into(&mut out, 0);
        out
    }

    fn pformat_into(&self, out: &mut String, depth: usize) {
        let indent = "    ".repeat(depth);
        match self {
            Node::Text(text) => {
                for line in text.lines() {
                    let _ = writeln!(out, "{}{}", indent, line);
                }
            }
            Node::Element(element) => {
                let _ = write!(out, "{}<{}", indent, element.tag);
                if !element.classes.is_empty() {
                    let _ = write!(out, " classes=\"{}\"", element.classes.join(" "));
                }
                for (key, value) in &element.attributes {
                    let _ = write!(out, " {}=\"{}\"", key, value);
                }
                out.push_str(">\n");
                for child in &element.children {
                    child.pformat_into(out, depth + 1);
                }
            }
        }
    }
}

/// The document being built: top-level children plus substitution tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Top-level nodes
    pub children: Vec<Node>,

    /// Substitution definitions by name
    pub substitution_defs: BTreeMap<String, Node>,

    /// Normalized substitution name → reference name
    pub substitution_names: BTreeMap<String, String>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or replace) a substitution.
    pub fn set_substitution(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.substitution_defs.insert(
            name.to_string(),
            Element::new("substitution_definition")
                .with_attr("names", name)
                .with_child(Node::text(value))
                .into(),
        );
        self.substitution_names
            .insert(name.to_lowercase(), name.to_string());
    }

    /// Text of a substitution.
    pub fn substitution(&self, name: &str) -> Option<String> {
        self.substitution_defs.get(name).map(Node::astext)
    }

    /// Pseudo-XML rendering of every top-level node.
    pub fn pformat(&self) -> String {
        self.children.iter().map(Node::pformat).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Element::new("container")
            .with_class("cell")
            .with_child(Element::new("literal_block").with_child(Node::text("x = 1")))
            .with_child(
                Element::new("container")
                    .with_class("cell_output")
                    .with_child(Element::new("literal_block").with_child(Node::text("1\n"))),
            )
            .into()
    }

    #[test]
    fn test_astext_concatenates_descendants() {
        assert_eq!(sample().astext(), "x = 11\n");
    }

    #[test]
    fn test_child_navigation() {
        let node = sample();
        let literal = node.child(1).and_then(|n| n.child(0)).unwrap();
        assert_eq!(literal.tag(), "literal_block");
        assert_eq!(literal.astext(), "1\n");
        assert!(node.child(5).is_none());
        assert!(Node::text("leaf").child(0).is_none());
    }

    #[test]
    fn test_pformat() {
        let expected = "<container classes=\"cell\">\n    <literal_block>\n        x = 1\n    <container classes=\"cell_output\">\n        <literal_block>\n            1\n";
        assert_eq!(sample().pformat(), expected);
    }

    #[test]
    fn test_substitutions() {
        let mut document = Document::new();
        document.set_substitution("wordcount-words", "12");
        assert_eq!(document.substitution("wordcount-words").as_deref(), Some("12"));
        assert_eq!(
            document.substitution_names.get("wordcount-words").map(String::as_str),
            Some("wordcount-words")
        );
    }
}

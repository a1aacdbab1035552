//! Design components (tab sets and friends).
//!
//! Components are plain `container` elements tagged with a
//! `design_component` attribute; writers turn them into the matching markup.

use crate::document::{Element, Node};

/// Extension name that provides the component writers.
pub const DESIGN_EXTENSION: &str = "design";

/// Create a design component.
pub fn create_component(
    name: &str,
    classes: &[&str],
    children: Vec<Node>,
    selected: bool,
) -> Element {
    let mut element = Element::new("container")
        .with_attr("design_component", name)
        .with_attr("is_div", "true");
    for class in classes {
        element = element.with_class(*class);
    }
    if selected {
        element = element.with_attr("selected", "true");
    }
    element.with_children(children)
}

/// Design component name of a node, if it is one.
pub fn component_name(node: &Node) -> Option<&str> {
    node.as_element()
        .and_then(|element| element.attr("design_component"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_component() {
        let node: Node =
            create_component("tab-item", &["sd-tab-item"], vec![Node::text("x")], true).into();
        let element = node.as_element().unwrap();

        assert_eq!(component_name(&node), Some("tab-item"));
        assert!(element.has_class("sd-tab-item"));
        assert_eq!(element.attr("selected"), Some("true"));
        assert_eq!(node.astext(), "x");
    }

    #[test]
    fn test_unselected_has_no_attribute() {
        let element = create_component("tab-set", &["sd-tab-set"], Vec::new(), false);
        assert!(element.attr("selected").is_none());
    }
}

//! HTML writer for built pages.

use std::fmt::Write as _;

use nbsplice_core::components::component_name;
use nbsplice_core::{AssetRef, Element, Node};

/// Escape text for HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render Markdown to HTML.
pub fn markdown_to_html(source: &str) -> String {
    let parser = pulldown_cmark::Parser::new_ext(source, pulldown_cmark::Options::all());
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

/// A complete page: head assets, then body nodes.
pub fn write_page(title: &str, js: &[&AssetRef], css: &[&AssetRef], body: &[Node]) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape(title));

    for asset in css {
        let _ = writeln!(
            html,
            "<link rel=\"stylesheet\" href=\"{}\"{}>",
            escape(&asset.url),
            attributes(asset)
        );
    }
    for asset in js {
        let _ = writeln!(
            html,
            "<script src=\"{}\"{}></script>",
            escape(&asset.url),
            attributes(asset)
        );
    }

    html.push_str("</head>\n<body>\n");
    let mut writer = BodyWriter::new();
    for node in body {
        writer.node(node);
    }
    html.push_str(&writer.finish());
    html.push_str("</body>\n</html>\n");
    html
}

fn attributes(asset: &AssetRef) -> String {
    asset
        .attributes
        .iter()
        .map(|(k, v)| format!(" {}=\"{}\"", escape(k), escape(v)))
        .collect()
}

/// Writes body nodes. Tab set ids count from zero per writer, so a page's
/// markup does not depend on what was written before it.
#[derive(Debug, Default)]
pub struct BodyWriter {
    out: String,
    tab_sets: usize,
}

impl BodyWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Written HTML.
    pub fn finish(self) -> String {
        self.out
    }

    /// Append the HTML for one node.
    pub fn node(&mut self, node: &Node) {
        let element = match node {
            Node::Text(text) => {
                self.out.push_str(&escape(text));
                return;
            }
            Node::Element(element) => element,
        };

        if component_name(node) == Some("tab-set") {
            self.tab_set(element);
            return;
        }

        match element.tag.as_str() {
            "raw" => {
                if element.attr("format") == Some("html") {
                    self.out.push_str(&node.astext());
                }
            }
            "literal_block" => {
                let _ = write!(self.out, "<pre{}>", class_attr(element));
                self.out.push_str(&escape(&node.astext()));
                self.out.push_str("</pre>\n");
            }
            "math_block" => {
                let math = escape(&node.astext());
                let _ = writeln!(self.out, "<div class=\"math\">\\[{}\\]</div>", math);
            }
            "image" => {
                let _ = writeln!(
                    self.out,
                    "<img{} src=\"{}\">",
                    class_attr(element),
                    escape(element.attr("uri").unwrap_or_default())
                );
            }
            "rubric" => {
                let _ = write!(self.out, "<p class=\"rubric\">");
                self.children(element);
                self.out.push_str("</p>\n");
            }
            "paragraph" => {
                self.out.push_str("<p>");
                self.children(element);
                self.out.push_str("</p>\n");
            }
            "literal" => {
                self.out.push_str("<code>");
                self.children(element);
                self.out.push_str("</code>");
            }
            "emphasis" => {
                self.out.push_str("<em>");
                self.children(element);
                self.out.push_str("</em>");
            }
            "strong" => {
                self.out.push_str("<strong>");
                self.children(element);
                self.out.push_str("</strong>");
            }
            "system_message" => {
                let _ = write!(
                    self.out,
                    "<div class=\"system-message\" data-line=\"{}\">",
                    escape(element.attr("line").unwrap_or_default())
                );
                self.children(element);
                self.out.push_str("</div>\n");
            }
            _ => {
                let _ = write!(self.out, "<div{}>", class_attr(element));
                self.children(element);
                self.out.push_str("</div>\n");
            }
        }
    }

    fn children(&mut self, element: &Element) {
        for child in &element.children {
            self.node(child);
        }
    }

    /// Tabs as radio inputs followed by label and content, one group per set.
    fn tab_set(&mut self, element: &Element) {
        let set = self.tab_sets;
        self.tab_sets += 1;

        let _ = writeln!(self.out, "<div{}>", class_attr(element));
        for (i, item) in element.children.iter().enumerate() {
            let Some(item) = item.as_element() else {
                continue;
            };
            let id = format!("sd-tab-item-{}-{}", set, i);
            let checked = if item.attr("selected") == Some("true") {
                " checked=\"checked\""
            } else {
                ""
            };
            let _ = writeln!(
                self.out,
                "<input id=\"{}\" name=\"sd-tab-set-{}\" type=\"radio\"{}>",
                id, set, checked
            );

            for part in &item.children {
                match part.as_element() {
                    Some(label) if label.tag == "rubric" => {
                        let _ = write!(self.out, "<label class=\"sd-tab-label\" for=\"{}\">", id);
                        self.children(label);
                        self.out.push_str("</label>\n");
                    }
                    _ => self.node(part),
                }
            }
        }
        self.out.push_str("</div>\n");
    }
}

fn class_attr(element: &Element) -> String {
    if element.classes.is_empty() {
        String::new()
    } else {
        format!(" class=\"{}\"", escape(&element.classes.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbsplice_core::components::create_component;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    fn tab_set_node() -> Node {
        let item = |label: &str, selected| -> Node {
            create_component(
                "tab-item",
                &["sd-tab-item"],
                vec![
                    Element::new("rubric").with_child(Node::text(label)).into(),
                    create_component("tab-content", &["sd-tab-content"], vec![Node::text(label)], false)
                        .into(),
                ],
                selected,
            )
            .into()
        };
        create_component("tab-set", &["sd-tab-set"], vec![item("bokeh", true), item("plotly", false)], false)
            .into()
    }

    #[test]
    fn test_literal_block_and_raw() {
        let mut writer = BodyWriter::new();
        writer.node(
            &Element::new("literal_block")
                .with_class("output")
                .with_child(Node::text("1 < 2"))
                .into(),
        );
        writer.node(
            &Element::new("raw")
                .with_attr("format", "html")
                .with_child(Node::text("<b>bold</b>"))
                .into(),
        );
        assert_eq!(writer.finish(), "<pre class=\"output\">1 &lt; 2</pre>\n<b>bold</b>");
    }

    #[test]
    fn test_tab_set_markup() {
        let mut writer = BodyWriter::new();
        writer.node(&tab_set_node());
        let out = writer.finish();

        assert!(out.starts_with("<div class=\"sd-tab-set\">"));
        assert_eq!(out.matches("type=\"radio\"").count(), 2);
        assert_eq!(out.matches("checked=\"checked\"").count(), 1);
        assert!(out.contains("\">bokeh</label>"));
        assert!(out.contains("<div class=\"sd-tab-content\">plotly</div>"));
    }

    #[test]
    fn test_tab_ids_count_per_page() {
        let body = [tab_set_node(), tab_set_node()];
        let first = write_page("A", &[], &[], &body);
        let second = write_page("A", &[], &[], &body);

        assert_eq!(first, second);
        assert!(first.contains("id=\"sd-tab-item-0-0\""));
        assert!(first.contains("name=\"sd-tab-set-1\""));
        assert!(!first.contains("sd-tab-set-2"));
    }

    #[test]
    fn test_page_head_assets() {
        let js = AssetRef {
            url: "https://cdn.example/a.js".to_string(),
            attributes: Default::default(),
        };
        let css = AssetRef {
            url: "https://cdn.example/a.css".to_string(),
            attributes: Default::default(),
        };
        let page = write_page("Plots", &[&js], &[&css], &[]);
        assert!(page.contains("<script src=\"https://cdn.example/a.js\"></script>"));
        assert!(page.contains("<link rel=\"stylesheet\" href=\"https://cdn.example/a.css\">"));
        assert!(page.contains("<title>Plots</title>"));
    }
}

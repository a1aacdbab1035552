//! Rendering of notebook cells into document nodes.
//!
//! Every code cell becomes:
//!
//! ```text
//! container.cell
//! ├── container.cell_input
//! │   └── literal_block        (cell source)
//! └── container.cell_output    (omitted when the cell has no outputs)
//!     └── one node per output  (literal_block, raw, image, ...)
//! ```
//!
//! Each output is rendered from exactly one MIME representation, chosen by
//! priority. Plugins can reorder priorities and take over rendering.

use base64::Engine as _;

use crate::document::{Document, Element, Node};
use crate::notebook::{CellOutput, CodeCell, JupyterCell, JupyterNotebook, MimeData, OutputData};

/// Builder name used when matching priority overrides.
pub const HTML_BUILDER: &str = "html";

/// Default MIME priority for HTML output, highest first.
const DEFAULT_MIME_PRIORITY: &[&str] = &[
    "application/vnd.jupyter.widget-view+json",
    "application/javascript",
    "text/html",
    "image/svg+xml",
    "image/png",
    "image/jpeg",
    "text/markdown",
    "text/latex",
    "text/plain",
];

/// Words per minute used for the reading-time substitution.
const WORDS_PER_MINUTE: usize = 200;

/// Hook into MIME output rendering.
pub trait MimeRenderPlugin: Send + Sync {
    /// `(builder, mime type, priority)` overrides; `"*"` matches every builder.
    /// Lower priorities win.
    fn mime_priority_overrides(&self) -> Vec<(String, String, usize)> {
        Vec::new()
    }

    /// Render `data`, or return `None` to fall through to the default renderer.
    /// Returning `Some(vec![])` drops the output.
    fn handle_mime(&self, data: &MimeData, inline: bool) -> Option<Vec<Node>>;
}

/// Renders executed notebooks into document nodes.
pub struct NbRenderer {
    priority: Vec<String>,
    plugins: Vec<Box<dyn MimeRenderPlugin>>,
}

impl NbRenderer {
    /// Create a renderer with the default HTML priority list.
    pub fn new() -> Self {
        Self {
            priority: DEFAULT_MIME_PRIORITY.iter().map(|m| m.to_string()).collect(),
            plugins: Vec::new(),
        }
    }

    /// Register a plugin and apply its priority overrides.
    pub fn add_plugin(&mut self, plugin: impl MimeRenderPlugin + 'static) {
        for (builder, mime, priority) in plugin.mime_priority_overrides() {
            if builder != "*" && builder != HTML_BUILDER {
                continue;
            }
            self.priority.retain(|m| m != &mime);
            let index = priority.min(self.priority.len());
            self.priority.insert(index, mime);
        }
        self.plugins.push(Box::new(plugin));
    }

    /// MIME types in priority order.
    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// Append one node per code cell to `document` and record word-count
    /// substitutions for the notebook's markdown.
    pub fn render_notebook(&self, notebook: &JupyterNotebook, document: &mut Document) {
        let mut words = 0;

        for (index, cell) in notebook.cells.iter().enumerate() {
            match cell {
                JupyterCell::Code(code) => document.children.push(self.render_cell(index, code)),
                JupyterCell::Markdown(text) => {
                    let source = text.source.text();
                    words += source.split_whitespace().count();
                    document.children.push(render_markdown(&source));
                }
                JupyterCell::Raw(_) => {}
            }
        }

        document.set_substitution("wordcount-words", words.to_string());
        document.set_substitution(
            "wordcount-minutes",
            words.div_ceil(WORDS_PER_MINUTE).to_string(),
        );
    }

    /// Render one code cell.
    pub fn render_cell(&self, index: usize, cell: &CodeCell) -> Node {
        let input = Element::new("container").with_class("cell_input").with_child(
            Element::new("literal_block")
                .with_attr("language", "ipython3")
                .with_child(Node::text(cell.source.text())),
        );

        let mut container = Element::new("container")
            .with_class("cell")
            .with_attr("cell_index", index.to_string())
            .with_child(input);

        let outputs: Vec<Node> = cell
            .outputs
            .iter()
            .flat_map(|output| self.render_output(output))
            .collect();

        if !outputs.is_empty() {
            container = container.with_child(
                Element::new("container")
                    .with_class("cell_output")
                    .with_children(outputs),
            );
        }

        container.into()
    }

    fn render_output(&self, output: &CellOutput) -> Vec<Node> {
        match output {
            CellOutput::Stream { name, text } => vec![
                Element::new("literal_block")
                    .with_class("output")
                    .with_class(if name == "stderr" { "stderr" } else { "stream" })
                    .with_child(Node::text(text.text()))
                    .into(),
            ],
            CellOutput::Error {
                ename,
                evalue,
                traceback,
            } => {
                let text = if traceback.is_empty() {
                    format!("{}: {}", ename, evalue)
                } else {
                    strip_ansi(&traceback.join("\n"))
                };
                vec![
                    Element::new("literal_block")
                        .with_class("output")
                        .with_class("traceback")
                        .with_child(Node::text(text))
                        .into(),
                ]
            }
            CellOutput::ExecuteResult { data, .. } | CellOutput::DisplayData { data, .. } => {
                self.render_mime_bundle(data)
            }
        }
    }

    fn render_mime_bundle(&self, data: &OutputData) -> Vec<Node> {
        let entries = data.entries();
        let Some(selected) = self.select(&entries) else {
            tracing::debug!(
                "No renderable MIME type among {:?}",
                entries.iter().map(|e| &e.mime_type).collect::<Vec<_>>()
            );
            return Vec::new();
        };

        for plugin in &self.plugins {
            if let Some(nodes) = plugin.handle_mime(selected, false) {
                return nodes;
            }
        }

        vec![render_mime(selected)]
    }

    fn select<'a>(&self, entries: &'a [MimeData]) -> Option<&'a MimeData> {
        self.priority
            .iter()
            .find_map(|mime| entries.iter().find(|e| &e.mime_type == mime))
    }
}

impl Default for NbRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Default rendering of a selected MIME representation.
fn render_mime(data: &MimeData) -> Node {
    match data.mime_type.as_str() {
        "text/html" | "image/svg+xml" => raw_html(&data.content),
        "application/javascript" => raw_html(&format!(
            "<script type=\"text/javascript\">{}</script>",
            data.content
        )),
        "image/png" | "image/jpeg" => render_image(&data.mime_type, &data.content),
        "text/markdown" => render_markdown(&data.content),
        "text/latex" => Element::new("math_block")
            .with_class("output")
            .with_child(Node::text(data.content.clone()))
            .into(),
        _ => Element::new("literal_block")
            .with_class("output")
            .with_class(data.mime_type.replace(['/', '+', '.'], "_"))
            .with_child(Node::text(data.content.clone()))
            .into(),
    }
}

fn raw_html(html: &str) -> Node {
    Element::new("raw")
        .with_attr("format", "html")
        .with_child(Node::text(html.to_string()))
        .into()
}

/// Inline image; the base64 payload is validated and normalized.
fn render_image(mime: &str, encoded: &str) -> Node {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    match base64::engine::general_purpose::STANDARD.decode(&compact) {
        Ok(bytes) => Element::new("image")
            .with_class("output")
            .with_attr(
                "uri",
                format!(
                    "data:{};base64,{}",
                    mime,
                    base64::engine::general_purpose::STANDARD.encode(bytes)
                ),
            )
            .into(),
        Err(e) => {
            tracing::warn!("Dropping malformed {} output: {}", mime, e);
            Element::new("literal_block")
                .with_class("output")
                .with_class("stderr")
                .with_child(Node::text(format!("[invalid {} data: {}]", mime, e)))
                .into()
        }
    }
}

fn render_markdown(source: &str) -> Node {
    let parser = pulldown_cmark::Parser::new_ext(source, pulldown_cmark::Options::all());
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    Element::new("container")
        .with_class("markdown")
        .with_child(raw_html(&html))
        .into()
}

/// Remove ANSI color sequences from kernel tracebacks.
fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

//! Jupyter notebook (.ipynb) model.
//!
//! Covers the subset of nbformat 4.5 that synthetic notebooks are built from
//! and that executed notebooks come back in.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A Jupyter notebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JupyterNotebook {
    /// Notebook metadata
    #[serde(default)]
    pub metadata: JupyterMetadata,

    /// Format version (always 4)
    pub nbformat: u32,

    /// Minor format version
    pub nbformat_minor: u32,

    /// Notebook cells
    pub cells: Vec<JupyterCell>,
}

/// Jupyter notebook metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JupyterMetadata {
    /// Kernel specification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernelspec: Option<KernelSpec>,

    /// Language info
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_info: Option<LanguageInfo>,

    /// Anything else the engine recorded
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Kernel specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelSpec {
    /// Display name
    pub display_name: String,

    /// Language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Kernel name
    pub name: String,
}

/// Language information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    /// Language name
    pub name: String,

    /// File extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,

    /// MIME type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,

    /// Version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Text stored either as one string or as a list of lines.
///
/// nbformat allows both; writers usually emit lines, readers must accept either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultilineString {
    Single(String),
    Lines(Vec<String>),
}

impl MultilineString {
    /// Split text into nbformat lines (each keeps its trailing newline).
    pub fn from_text(text: &str) -> Self {
        MultilineString::Lines(text.split_inclusive('\n').map(String::from).collect())
    }

    /// Joined text.
    pub fn text(&self) -> String {
        match self {
            MultilineString::Single(s) => s.clone(),
            MultilineString::Lines(lines) => lines.concat(),
        }
    }
}

impl Default for MultilineString {
    fn default() -> Self {
        MultilineString::Lines(Vec::new())
    }
}

/// A Jupyter cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum JupyterCell {
    Code(CodeCell),
    Markdown(TextCell),
    Raw(TextCell),
}

impl JupyterCell {
    /// Cell source text.
    pub fn source(&self) -> String {
        match self {
            JupyterCell::Code(cell) => cell.source.text(),
            JupyterCell::Markdown(cell) | JupyterCell::Raw(cell) => cell.source.text(),
        }
    }
}

/// An executable cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeCell {
    /// nbformat 4.5 cell id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Cell metadata
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,

    /// Cell source
    pub source: MultilineString,

    /// Outputs recorded by the last execution
    #[serde(default)]
    pub outputs: Vec<CellOutput>,

    /// Execution count (`null` when never executed)
    #[serde(default)]
    pub execution_count: Option<u32>,
}

/// A markdown or raw cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextCell {
    /// nbformat 4.5 cell id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Cell metadata
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,

    /// Cell source
    pub source: MultilineString,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

/// Cell output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "output_type")]
pub enum CellOutput {
    /// Standard output/error
    #[serde(rename = "stream")]
    Stream { name: String, text: MultilineString },

    /// Rich display data
    #[serde(rename = "execute_result")]
    ExecuteResult {
        #[serde(default)]
        execution_count: Option<u32>,
        data: OutputData,
        #[serde(default = "empty_object")]
        metadata: serde_json::Value,
    },

    /// Display data
    #[serde(rename = "display_data")]
    DisplayData {
        data: OutputData,
        #[serde(default = "empty_object")]
        metadata: serde_json::Value,
    },

    /// Error output
    #[serde(rename = "error")]
    Error {
        ename: String,
        evalue: String,
        traceback: Vec<String>,
    },
}

/// Output data with multiple representations, keyed by MIME type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputData {
    /// Plain text
    #[serde(rename = "text/plain", default, skip_serializing_if = "Option::is_none")]
    pub text_plain: Option<MultilineString>,

    /// HTML
    #[serde(rename = "text/html", default, skip_serializing_if = "Option::is_none")]
    pub text_html: Option<MultilineString>,

    /// PNG image (base64)
    #[serde(rename = "image/png", default, skip_serializing_if = "Option::is_none")]
    pub image_png: Option<MultilineString>,

    /// JPEG image (base64)
    #[serde(rename = "image/jpeg", default, skip_serializing_if = "Option::is_none")]
    pub image_jpeg: Option<MultilineString>,

    /// SVG image
    #[serde(rename = "image/svg+xml", default, skip_serializing_if = "Option::is_none")]
    pub image_svg: Option<MultilineString>,

    /// JSON data
    #[serde(rename = "application/json", default, skip_serializing_if = "Option::is_none")]
    pub application_json: Option<serde_json::Value>,

    /// Any other MIME type (widget state, library-specific bundles, ...)
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// One MIME representation of an output.
#[derive(Debug, Clone, PartialEq)]
pub struct MimeData {
    pub mime_type: String,
    pub content: String,
}

impl OutputData {
    /// All representations as `(mime type, text content)` pairs.
    pub fn entries(&self) -> Vec<MimeData> {
        let named = [
            ("text/plain", &self.text_plain),
            ("text/html", &self.text_html),
            ("image/png", &self.image_png),
            ("image/jpeg", &self.image_jpeg),
            ("image/svg+xml", &self.image_svg),
        ];

        let mut entries: Vec<MimeData> = named
            .into_iter()
            .filter_map(|(mime, value)| {
                value.as_ref().map(|v| MimeData {
                    mime_type: mime.to_string(),
                    content: v.text(),
                })
            })
            .collect();

        if let Some(json) = &self.application_json {
            entries.push(MimeData {
                mime_type: "application/json".to_string(),
                content: json.to_string(),
            });
        }

        for (mime, value) in &self.other {
            let content = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Array(items) if items.iter().all(|i| i.is_string()) => items
                    .iter()
                    .filter_map(|i| i.as_str())
                    .collect::<String>(),
                other => other.to_string(),
            };
            entries.push(MimeData {
                mime_type: mime.clone(),
                content,
            });
        }

        entries
    }
}

impl JupyterNotebook {
    /// Create a new empty notebook.
    pub fn new() -> Self {
        Self {
            metadata: JupyterMetadata::default(),
            nbformat: 4,
            nbformat_minor: 5,
            cells: Vec::new(),
        }
    }

    /// Serialize to the nbformat JSON exchange format.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse nbformat JSON.
    pub fn from_json(source: &str) -> Result<Self> {
        let notebook: Self = serde_json::from_str(source)?;
        if notebook.nbformat != 4 {
            return Err(Error::Notebook(format!(
                "unsupported nbformat version {}",
                notebook.nbformat
            )));
        }
        Ok(notebook)
    }

    /// Read a notebook from a file.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    /// Code cells in order.
    pub fn code_cells(&self) -> impl Iterator<Item = &CodeCell> {
        self.cells.iter().filter_map(|cell| match cell {
            JupyterCell::Code(code) => Some(code),
            _ => None,
        })
    }
}

impl Default for JupyterNotebook {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds synthetic notebooks out of code fragments.
pub struct NotebookBuilder {
    kernel: String,
}

impl NotebookBuilder {
    /// Create a builder targeting the given Jupyter kernel.
    pub fn new(kernel: impl Into<String>) -> Self {
        Self {
            kernel: kernel.into(),
        }
    }

    /// One unexecuted code cell per fragment, in fragment order.
    pub fn from_fragments(&self, fragments: &[String]) -> JupyterNotebook {
        let mut notebook = JupyterNotebook::new();
        notebook.metadata.kernelspec = Some(KernelSpec {
            display_name: self.kernel.clone(),
            language: None,
            name: self.kernel.clone(),
        });

        notebook.cells = fragments
            .iter()
            .map(|fragment| {
                JupyterCell::Code(CodeCell {
                    id: Some(cell_id()),
                    metadata: empty_object(),
                    source: MultilineString::from_text(fragment),
                    outputs: Vec::new(),
                    execution_count: None,
                })
            })
            .collect();

        notebook
    }
}

impl Default for NotebookBuilder {
    fn default() -> Self {
        Self::new("python3")
    }
}

/// nbformat cell ids are 1-64 chars of `[a-zA-Z0-9-_]`.
fn cell_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

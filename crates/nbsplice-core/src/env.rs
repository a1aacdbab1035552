//! Build environment.
//!
//! One `BuildEnv` exists per build worker and is passed explicitly to every
//! directive. It owns document-name resolution, the notebook engine settings,
//! extension/config registries and the per-page asset tracker.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::assets::PageAssets;

/// When the engine executes notebooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Never execute; render stored outputs.
    Off,
    /// Execute notebooks that have no stored outputs.
    #[default]
    Auto,
    /// Execute and cache outputs.
    Cache,
    /// Always execute.
    Force,
}

impl ExecutionMode {
    /// Whether a notebook needs running under this mode.
    pub fn should_execute(self, has_outputs: bool) -> bool {
        match self {
            ExecutionMode::Off => false,
            ExecutionMode::Auto => !has_outputs,
            ExecutionMode::Cache | ExecutionMode::Force => true,
        }
    }
}

/// Notebook engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NbConfig {
    /// Execution mode
    pub execution_mode: ExecutionMode,

    /// Fail on the first cell error instead of rendering the traceback
    pub execution_raise_on_error: bool,

    /// Per-cell timeout in seconds
    pub execution_timeout: u64,

    /// Jupyter kernel name
    pub kernel: String,

    /// Explicit `jupyter` executable (looked up in PATH otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jupyter: Option<PathBuf>,
}

impl Default for NbConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Auto,
            execution_raise_on_error: false,
            execution_timeout: 30,
            kernel: "python3".to_string(),
            jupyter: None,
        }
    }
}

/// Build environment for one worker.
#[derive(Debug)]
pub struct BuildEnv {
    /// Source directory
    srcdir: PathBuf,

    /// Suffix of source documents
    source_suffix: String,

    /// Document currently being processed
    docname: String,

    /// Document names resolved to explicit paths
    overrides: FxHashMap<String, PathBuf>,

    /// Embedded executions started per document
    exec_counters: FxHashMap<String, usize>,

    /// Enabled extensions
    extensions: BTreeSet<String>,

    /// Extension config values
    config: BTreeMap<String, serde_json::Value>,

    /// Notebook engine settings
    pub nb_config: NbConfig,

    /// Per-page JS/CSS registrations
    pub assets: PageAssets,
}

impl BuildEnv {
    /// Create an environment rooted at `srcdir`.
    pub fn new(srcdir: impl AsRef<Path>) -> Self {
        Self {
            srcdir: srcdir.as_ref().to_path_buf(),
            source_suffix: ".md".to_string(),
            docname: String::new(),
            overrides: FxHashMap::default(),
            exec_counters: FxHashMap::default(),
            extensions: BTreeSet::new(),
            config: BTreeMap::new(),
            nb_config: NbConfig::default(),
            assets: PageAssets::new(),
        }
    }

    /// Source directory.
    pub fn srcdir(&self) -> &Path {
        &self.srcdir
    }

    /// Document currently being processed.
    pub fn docname(&self) -> &str {
        &self.docname
    }

    /// Start processing a document.
    pub fn begin_document(&mut self, docname: impl Into<String>) {
        self.docname = docname.into();
    }

    /// Replace the current docname, returning the previous one.
    pub(crate) fn replace_docname(&mut self, docname: String) -> String {
        std::mem::replace(&mut self.docname, docname)
    }

    /// Resolve a document name to its source path.
    pub fn doc2path(&self, docname: &str) -> PathBuf {
        match self.overrides.get(docname) {
            Some(path) => path.clone(),
            None => self
                .srcdir
                .join(format!("{}{}", docname, self.source_suffix)),
        }
    }

    /// Whether `docname` is currently resolved through an override.
    pub fn is_overridden(&self, docname: &str) -> bool {
        self.overrides.contains_key(docname)
    }

    /// Install a resolution override, returning the one it shadows.
    pub(crate) fn install_override(&mut self, docname: &str, path: PathBuf) -> Option<PathBuf> {
        self.overrides.insert(docname.to_string(), path)
    }

    /// Undo [`install_override`](Self::install_override).
    pub(crate) fn restore_override(&mut self, docname: &str, previous: Option<PathBuf>) {
        match previous {
            Some(path) => {
                self.overrides.insert(docname.to_string(), path);
            }
            None => {
                self.overrides.remove(docname);
            }
        }
    }

    /// Next embedded-execution index for a document (starts at 0).
    pub(crate) fn next_exec_index(&mut self, docname: &str) -> usize {
        let counter = self.exec_counters.entry(docname.to_string()).or_insert(0);
        let index = *counter;
        *counter += 1;
        index
    }

    /// Enable an extension by name.
    pub fn enable_extension(&mut self, name: impl Into<String>) {
        self.extensions.insert(name.into());
    }

    /// Whether an extension is enabled.
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    /// Register a config value default; an existing value wins.
    pub fn add_config_value(&mut self, name: &str, default: serde_json::Value) {
        self.config.entry(name.to_string()).or_insert(default);
    }

    /// Set a config value.
    pub fn set_config_value(&mut self, name: &str, value: serde_json::Value) {
        self.config.insert(name.to_string(), value);
    }

    /// Config value by name.
    pub fn config_value(&self, name: &str) -> Option<&serde_json::Value> {
        self.config.get(name)
    }
}

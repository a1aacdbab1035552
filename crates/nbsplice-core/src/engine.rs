//! Notebook execution engines.
//!
//! An engine takes a serialized notebook and appends the rendered output
//! nodes to a document. The notebook file itself is found through the build
//! environment: `env.doc2path(env.docname())`.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::document::Document;
use crate::env::{BuildEnv, NbConfig};
use crate::error::{Error, Result};
use crate::notebook::JupyterNotebook;
use crate::render::NbRenderer;

/// Parses, executes and renders notebooks.
pub trait NotebookEngine {
    /// Render `source` (nbformat JSON) into `document`, executing it first if
    /// `env.nb_config` asks for it. Nodes are appended to `document.children`.
    fn parse(&self, source: &str, document: &mut Document, env: &BuildEnv) -> Result<()>;
}

/// Engine backed by `jupyter nbconvert --execute`.
pub struct JupyterEngine {
    renderer: NbRenderer,
}

impl JupyterEngine {
    /// Create an engine with the default renderer.
    pub fn new() -> Self {
        Self {
            renderer: NbRenderer::new(),
        }
    }

    /// Create an engine with a custom renderer.
    pub fn with_renderer(renderer: NbRenderer) -> Self {
        Self { renderer }
    }

    /// Find the `jupyter` executable.
    pub fn find_jupyter(config: &NbConfig) -> Result<PathBuf> {
        if let Some(path) = &config.jupyter {
            return Ok(path.clone());
        }
        which::which("jupyter")
            .map_err(|_| Error::EngineUnavailable("jupyter not found in PATH".to_string()))
    }

    /// Execute the notebook at `path` and return the executed notebook.
    fn execute(&self, path: &Path, env: &BuildEnv) -> Result<JupyterNotebook> {
        let config = &env.nb_config;
        let jupyter = Self::find_jupyter(config)?;
        let docname = env.docname().to_string();

        let mut command = Command::new(&jupyter);
        command
            .args(["nbconvert", "--to", "notebook", "--execute", "--stdout"])
            .arg(format!(
                "--ExecutePreprocessor.timeout={}",
                config.execution_timeout
            ))
            .arg(format!(
                "--ExecutePreprocessor.kernel_name={}",
                config.kernel
            ));
        if !config.execution_raise_on_error {
            command.arg("--allow-errors");
        }
        command.arg(path);
        if env.srcdir().is_dir() {
            command.current_dir(env.srcdir());
        }

        tracing::debug!("Executing {} via {}", path.display(), jupyter.display());

        let output = command.output().map_err(|e| {
            Error::EngineUnavailable(format!("failed to run {}: {}", jupyter.display(), e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Execution {
                docname,
                message: stderr.trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        JupyterNotebook::from_json(&stdout).map_err(|e| Error::Execution {
            docname,
            message: format!("engine returned an unreadable notebook: {}", e),
        })
    }
}

impl Default for JupyterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NotebookEngine for JupyterEngine {
    fn parse(&self, source: &str, document: &mut Document, env: &BuildEnv) -> Result<()> {
        let notebook = JupyterNotebook::from_json(source)?;
        let has_outputs = notebook.code_cells().any(|cell| !cell.outputs.is_empty());

        let notebook = if env.nb_config.execution_mode.should_execute(has_outputs) {
            let path = env.doc2path(env.docname());
            self.execute(&path, env)?
        } else {
            notebook
        };

        self.renderer.render_notebook(&notebook, document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::ExecutionMode;
    use crate::notebook::NotebookBuilder;

    #[test]
    fn test_explicit_jupyter_path_wins() {
        let config = NbConfig {
            jupyter: Some(PathBuf::from("/opt/jupyter/bin/jupyter")),
            ..Default::default()
        };
        assert_eq!(
            JupyterEngine::find_jupyter(&config).unwrap(),
            PathBuf::from("/opt/jupyter/bin/jupyter")
        );
    }

    #[test]
    fn test_mode_off_renders_without_running() {
        let mut env = BuildEnv::new(".");
        env.nb_config.execution_mode = ExecutionMode::Off;
        env.nb_config.jupyter = Some(PathBuf::from("/nonexistent/jupyter"));

        let notebook = NotebookBuilder::default()
            .from_fragments(&["a = 1".to_string(), "b = 2".to_string()]);
        let mut document = Document::new();

        JupyterEngine::new()
            .parse(&notebook.to_json().unwrap(), &mut document, &env)
            .unwrap();
        assert_eq!(document.children.len(), 2);
    }

    #[test]
    fn test_missing_executable_is_engine_unavailable() {
        let mut env = BuildEnv::new(".");
        env.nb_config.execution_mode = ExecutionMode::Force;
        env.nb_config.jupyter = Some(PathBuf::from("/nonexistent/jupyter"));

        let notebook = NotebookBuilder::default().from_fragments(&["a = 1".to_string()]);
        let mut document = Document::new();

        let err = JupyterEngine::new()
            .parse(&notebook.to_json().unwrap(), &mut document, &env)
            .unwrap_err();
        assert!(matches!(err, Error::EngineUnavailable(_)));
        assert!(document.children.is_empty());
    }
}

//! Temporary-notebook materializer.
//!
//! Runs a batch of code fragments through a [`NotebookEngine`] as a
//! synthetic notebook and hands back one output node per fragment.
//!
//! # Architecture
//!
//! ```text
//! fragments ──► NotebookBuilder ──► nbformat JSON ──► EphemeralBinding (temp .ipynb,
//!                                                     docname override, forced execution)
//!                                                             │
//!                                   DocumentCheckpoint ◄── engine.parse()
//!                                          │
//!                                          ▼
//!                              appended nodes (returned),
//!                              word counts restored, binding released
//! ```
//!
//! Both guards restore their state on drop, so an engine error leaves the
//! environment and the document exactly as they were.

use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::document::{Document, Node};
use crate::engine::NotebookEngine;
use crate::env::{BuildEnv, ExecutionMode};
use crate::error::Result;
use crate::notebook::NotebookBuilder;

/// Substitutions the engine adds for reading statistics.
pub const WORDCOUNT_SUBSTITUTIONS: [&str; 2] = ["wordcount-words", "wordcount-minutes"];

/// Execute code fragments and return the resulting nodes, one per fragment.
///
/// The nodes are detached from `document`; the caller decides where they go.
pub fn execute_cells(
    fragments: &[String],
    document: &mut Document,
    env: &mut BuildEnv,
    engine: &dyn NotebookEngine,
) -> Result<Vec<Node>> {
    let notebook = NotebookBuilder::new(env.nb_config.kernel.clone()).from_fragments(fragments);
    let source = notebook.to_json()?;

    let binding = EphemeralBinding::acquire(env, &source)?;
    let mut checkpoint = DocumentCheckpoint::new(document);

    engine.parse(&source, &mut checkpoint, &binding)?;
    let nodes = checkpoint.take_appended();

    if nodes.len() != fragments.len() {
        tracing::debug!(
            "Engine returned {} nodes for {} fragments in {}",
            nodes.len(),
            fragments.len(),
            binding.docname()
        );
    }

    Ok(nodes)
}

/// A synthetic document name bound to a temporary notebook file.
///
/// While alive, the environment resolves the synthetic name to the temp file,
/// treats it as the current document and forces raising execution. Dropping
/// the binding restores all of it and deletes the file.
pub struct EphemeralBinding<'env> {
    env: &'env mut BuildEnv,
    docname: String,
    path: PathBuf,
    file: Option<NamedTempFile>,
    previous_override: Option<PathBuf>,
    previous_docname: String,
    previous_mode: ExecutionMode,
    previous_raise: bool,
}

impl<'env> EphemeralBinding<'env> {
    /// Write `source` to a fresh temp file and bind it into `env`.
    pub fn acquire(env: &'env mut BuildEnv, source: &str) -> Result<Self> {
        let enclosing = env.docname().to_string();
        let index = env.next_exec_index(&enclosing);
        let prefix = format!("{}-exec{}-", sanitize(&enclosing), index);

        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".ipynb")
            .tempfile()?;
        file.write_all(source.as_bytes())?;
        file.flush()?;

        let path = file.path().to_path_buf();
        let docname = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| prefix.clone());

        let previous_override = env.install_override(&docname, path.clone());
        let previous_docname = env.replace_docname(docname.clone());
        let previous_mode = std::mem::replace(&mut env.nb_config.execution_mode, ExecutionMode::Force);
        let previous_raise = std::mem::replace(&mut env.nb_config.execution_raise_on_error, true);

        tracing::debug!("Bound {} → {}", docname, path.display());

        Ok(Self {
            env,
            docname,
            path,
            file: Some(file),
            previous_override,
            previous_docname,
            previous_mode,
            previous_raise,
        })
    }

    /// Synthetic document name.
    pub fn docname(&self) -> &str {
        &self.docname
    }

    /// Temp notebook path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Deref for EphemeralBinding<'_> {
    type Target = BuildEnv;

    fn deref(&self) -> &BuildEnv {
        self.env
    }
}

impl Drop for EphemeralBinding<'_> {
    fn drop(&mut self) {
        self.env.nb_config.execution_raise_on_error = self.previous_raise;
        self.env.nb_config.execution_mode = self.previous_mode;
        self.env
            .replace_docname(std::mem::take(&mut self.previous_docname));
        self.env
            .restore_override(&self.docname, self.previous_override.take());

        if let Some(file) = self.file.take() {
            if let Err(e) = file.close() {
                tracing::warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }

        tracing::debug!("Released {}", self.docname);
    }
}

/// Records where a document ended and which word-count substitutions it had.
///
/// Dropping the checkpoint truncates anything appended after it and puts the
/// word-count substitutions back exactly as they were.
pub struct DocumentCheckpoint<'doc> {
    document: &'doc mut Document,
    after_last_child: usize,
    saved: Vec<SavedSubstitution>,
}

struct SavedSubstitution {
    name: &'static str,
    definition: Option<Node>,
    reference: Option<String>,
}

impl<'doc> DocumentCheckpoint<'doc> {
    /// Take a checkpoint of `document`.
    pub fn new(document: &'doc mut Document) -> Self {
        let saved = WORDCOUNT_SUBSTITUTIONS
            .iter()
            .map(|&name| SavedSubstitution {
                name,
                definition: document.substitution_defs.get(name).cloned(),
                reference: document.substitution_names.get(name).cloned(),
            })
            .collect();

        Self {
            after_last_child: document.children.len(),
            document,
            saved,
        }
    }

    /// Detach and return every node appended since the checkpoint.
    pub fn take_appended(&mut self) -> Vec<Node> {
        let at = self.after_last_child.min(self.document.children.len());
        self.document.children.split_off(at)
    }
}

impl Deref for DocumentCheckpoint<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        self.document
    }
}

impl DerefMut for DocumentCheckpoint<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        self.document
    }
}

impl Drop for DocumentCheckpoint<'_> {
    fn drop(&mut self) {
        self.document.children.truncate(self.after_last_child);

        for saved in self.saved.drain(..) {
            match saved.definition {
                Some(node) => {
                    self.document
                        .substitution_defs
                        .insert(saved.name.to_string(), node);
                }
                None => {
                    self.document.substitution_defs.remove(saved.name);
                }
            }
            match saved.reference {
                Some(reference) => {
                    self.document
                        .substitution_names
                        .insert(saved.name.to_string(), reference);
                }
                None => {
                    self.document.substitution_names.remove(saved.name);
                }
            }
        }
    }
}

/// Make a docname usable as a file name prefix.
fn sanitize(docname: &str) -> String {
    let cleaned: String = docname
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "doc".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("guide/intro.v2"), "guide_intro_v2");
        assert_eq!(sanitize(""), "doc");
    }

    #[test]
    fn test_binding_restores_env() {
        let mut env = BuildEnv::new("/docs");
        env.begin_document("guide/intro");

        let (docname, path) = {
            let binding = EphemeralBinding::acquire(&mut env, "{}").unwrap();
            assert!(binding.docname().starts_with("guide_intro-exec0-"));
            assert_eq!(binding.docname(), binding.env.docname());
            assert_eq!(binding.doc2path(binding.docname()), binding.path());
            assert_eq!(binding.nb_config.execution_mode, ExecutionMode::Force);
            assert!(binding.nb_config.execution_raise_on_error);
            assert!(binding.path().exists());
            (binding.docname().to_string(), binding.path().to_path_buf())
        };

        assert_eq!(env.docname(), "guide/intro");
        assert!(!env.is_overridden(&docname));
        assert_eq!(env.doc2path(&docname), PathBuf::from(format!("/docs/{}.md", docname)));
        assert_eq!(env.nb_config.execution_mode, ExecutionMode::Auto);
        assert!(!env.nb_config.execution_raise_on_error);
        assert!(!path.exists());
    }

    #[test]
    fn test_consecutive_bindings_get_distinct_names() {
        let mut env = BuildEnv::new(".");
        env.begin_document("index");

        let first = EphemeralBinding::acquire(&mut env, "{}").unwrap().docname().to_string();
        let second = EphemeralBinding::acquire(&mut env, "{}").unwrap().docname().to_string();
        assert!(first.starts_with("index-exec0-"));
        assert!(second.starts_with("index-exec1-"));
    }

    #[test]
    fn test_checkpoint_rolls_back_on_drop() {
        let mut document = Document::new();
        document.children.push(Node::text("existing"));
        document.set_substitution("wordcount-words", "7");

        {
            let mut checkpoint = DocumentCheckpoint::new(&mut document);
            checkpoint.children.push(Element::new("container").into());
            checkpoint.set_substitution("wordcount-words", "0");
            checkpoint.set_substitution("wordcount-minutes", "0");
        }

        assert_eq!(document.children, vec![Node::text("existing")]);
        assert_eq!(document.substitution("wordcount-words").as_deref(), Some("7"));
        assert!(document.substitution("wordcount-minutes").is_none());
        assert!(!document.substitution_names.contains_key("wordcount-minutes"));
    }

    #[test]
    fn test_take_appended() {
        let mut document = Document::new();
        document.children.push(Node::text("existing"));

        let mut checkpoint = DocumentCheckpoint::new(&mut document);
        checkpoint.children.push(Node::text("a"));
        checkpoint.children.push(Node::text("b"));
        let appended = checkpoint.take_appended();
        drop(checkpoint);

        assert_eq!(appended, vec![Node::text("a"), Node::text("b")]);
        assert_eq!(document.children, vec![Node::text("existing")]);
    }
}

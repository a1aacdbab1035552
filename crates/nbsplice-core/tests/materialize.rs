//! Integration tests for the temporary-notebook materializer.
//!
//! Uses a scripted engine that reads the bound notebook from disk, so the
//! tests exercise the real docname binding and cleanup paths.

use std::cell::RefCell;
use std::path::PathBuf;

use nbsplice_core::{
    BuildEnv, Document, Element, Error, ExecutionMode, JupyterNotebook, Node, NotebookEngine,
    Result, execute_cells,
};

// =============================================================================
// Test Helpers
// =============================================================================

/// What the engine saw while it ran.
#[derive(Debug, Clone)]
struct Observed {
    docname: String,
    path: PathBuf,
    path_existed: bool,
    mode: ExecutionMode,
    raise_on_error: bool,
}

/// Echoes each cell's source as its stdout; a cell containing `raise` fails.
#[derive(Default)]
struct ScriptedEngine {
    observed: RefCell<Option<Observed>>,
}

impl ScriptedEngine {
    fn observed(&self) -> Observed {
        self.observed.borrow().clone().expect("engine was not called")
    }
}

impl NotebookEngine for ScriptedEngine {
    fn parse(&self, source: &str, document: &mut Document, env: &BuildEnv) -> Result<()> {
        let path = env.doc2path(env.docname());
        *self.observed.borrow_mut() = Some(Observed {
            docname: env.docname().to_string(),
            path: path.clone(),
            path_existed: path.exists(),
            mode: env.nb_config.execution_mode,
            raise_on_error: env.nb_config.execution_raise_on_error,
        });

        let on_disk = JupyterNotebook::read_from_file(&path)?;
        assert_eq!(on_disk.to_json()?, source, "bound file holds the submitted notebook");

        for cell in &on_disk.cells {
            let code = cell.source();
            if code.contains("raise") {
                return Err(Error::Execution {
                    docname: env.docname().to_string(),
                    message: "RuntimeError".to_string(),
                });
            }
            document.children.push(
                Element::new("container")
                    .with_class("cell")
                    .with_child(Element::new("literal_block").with_child(Node::text(code.clone())))
                    .with_child(
                        Element::new("container").with_class("cell_output").with_child(
                            Element::new("literal_block")
                                .with_child(Node::text(format!("out:{}", code))),
                        ),
                    )
                    .into(),
            );
        }

        document.set_substitution("wordcount-words", "0");
        document.set_substitution("wordcount-minutes", "0");
        Ok(())
    }
}

fn env() -> BuildEnv {
    let mut env = BuildEnv::new("/docs");
    env.begin_document("guide/plots");
    env
}

fn fragments(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("x = {}", i)).collect()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_one_node_per_fragment_in_order() {
    for n in 0..5 {
        let mut env = env();
        let mut document = Document::new();
        let engine = ScriptedEngine::default();

        let nodes = execute_cells(&fragments(n), &mut document, &mut env, &engine).unwrap();

        assert_eq!(nodes.len(), n);
        for (i, node) in nodes.iter().enumerate() {
            let output = node.child(1).and_then(|o| o.child(0)).unwrap();
            assert_eq!(output.astext(), format!("out:x = {}", i));
        }
        assert!(document.children.is_empty(), "nodes are detached from the document");
    }
}

#[test]
fn test_existing_children_are_untouched() {
    let mut env = env();
    let mut document = Document::new();
    document.children.push(Node::text("intro"));
    let engine = ScriptedEngine::default();

    let nodes = execute_cells(&fragments(2), &mut document, &mut env, &engine).unwrap();

    assert_eq!(nodes.len(), 2);
    assert_eq!(document.children, vec![Node::text("intro")]);
}

#[test]
fn test_binding_is_active_during_and_reverted_after() {
    let mut env = env();
    let mut document = Document::new();
    let engine = ScriptedEngine::default();

    execute_cells(&fragments(1), &mut document, &mut env, &engine).unwrap();
    let observed = engine.observed();

    assert!(observed.docname.starts_with("guide_plots-exec0-"));
    assert!(observed.path_existed);
    assert_eq!(observed.mode, ExecutionMode::Force);
    assert!(observed.raise_on_error);

    assert_eq!(env.docname(), "guide/plots");
    assert!(!env.is_overridden(&observed.docname));
    assert_eq!(
        env.doc2path(&observed.docname),
        PathBuf::from(format!("/docs/{}.md", observed.docname))
    );
    assert!(!observed.path.exists(), "temp notebook is deleted");
    assert_eq!(env.nb_config.execution_mode, ExecutionMode::Auto);
    assert!(!env.nb_config.execution_raise_on_error);
}

#[test]
fn test_failure_cleans_up_and_propagates() {
    let mut env = env();
    let mut document = Document::new();
    document.children.push(Node::text("intro"));
    document.set_substitution("wordcount-words", "42");
    let before = document.clone();
    let engine = ScriptedEngine::default();

    let batch = vec!["ok = 1".to_string(), "raise RuntimeError()".to_string()];
    let err = execute_cells(&batch, &mut document, &mut env, &engine).unwrap_err();
    let observed = engine.observed();

    assert!(matches!(err, Error::Execution { .. }));
    assert_eq!(document, before, "partial output rolled back");
    assert_eq!(env.docname(), "guide/plots");
    assert!(!env.is_overridden(&observed.docname));
    assert!(!observed.path.exists());
    assert_eq!(env.nb_config.execution_mode, ExecutionMode::Auto);
}

#[test]
fn test_word_counts_are_preserved() {
    let mut env = env();
    let mut document = Document::new();
    document.set_substitution("wordcount-words", "1234");
    document.set_substitution("wordcount-minutes", "7");
    let defs_before = document.substitution_defs.clone();
    let names_before = document.substitution_names.clone();
    let engine = ScriptedEngine::default();

    execute_cells(&fragments(3), &mut document, &mut env, &engine).unwrap();

    assert_eq!(document.substitution_defs, defs_before);
    assert_eq!(document.substitution_names, names_before);
}

#[test]
fn test_word_counts_not_introduced() {
    let mut env = env();
    let mut document = Document::new();
    let engine = ScriptedEngine::default();

    execute_cells(&fragments(1), &mut document, &mut env, &engine).unwrap();

    assert!(document.substitution_defs.is_empty());
    assert!(document.substitution_names.is_empty());
}

#[test]
fn test_successive_calls_use_fresh_names() {
    let mut env = env();
    let mut document = Document::new();
    let engine = ScriptedEngine::default();

    execute_cells(&fragments(1), &mut document, &mut env, &engine).unwrap();
    let first = engine.observed().docname;
    execute_cells(&fragments(1), &mut document, &mut env, &engine).unwrap();
    let second = engine.observed().docname;

    assert_ne!(first, second);
    assert!(second.starts_with("guide_plots-exec1-"));
}

//! Embedded notebook execution for documentation builds.
//!
//! This crate provides:
//! - A synthetic notebook model (nbformat 4.5)
//! - The materializer that executes code fragments through a notebook engine
//!   and splices the rendered nodes back out of the document
//! - A docutils-style document tree and build environment
//! - Per-page asset registration
//! - The directive surface and extension registry
//!
//! # Architecture
//!
//! ```text
//! directive body ──► fragments ──► execute_cells ──► NotebookEngine ──► Document nodes
//!                                       │                  │
//!                                       ▼                  ▼
//!                              EphemeralBinding        NbRenderer
//!                         (temp .ipynb + docname)   (MIME plugins)
//! ```

pub mod app;
pub mod assets;
pub mod components;
pub mod directive;
pub mod document;
pub mod engine;
pub mod env;
pub mod error;
pub mod materialize;
pub mod notebook;
pub mod render;

pub use app::App;
pub use assets::{AssetPayload, AssetRef, PageAssets};
pub use directive::{Directive, DirectiveContext, DirectiveInvocation, ExecJupyterDirective};
pub use document::{Document, Element, Node};
pub use engine::{JupyterEngine, NotebookEngine};
pub use env::{BuildEnv, ExecutionMode, NbConfig};
pub use error::{Error, Result};
pub use materialize::{DocumentCheckpoint, EphemeralBinding, WORDCOUNT_SUBSTITUTIONS, execute_cells};
pub use notebook::{JupyterNotebook, NotebookBuilder};
pub use render::{MimeRenderPlugin, NbRenderer};

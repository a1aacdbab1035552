//! Extension registry.
//!
//! An [`App`] collects directives, config defaults and MIME render plugins
//! from extension `setup` functions, then runs directives for the front end.

use std::collections::BTreeMap;

use crate::directive::{Directive, DirectiveContext, DirectiveInvocation, ExecJupyterDirective};
use crate::document::{Document, Node};
use crate::engine::{JupyterEngine, NotebookEngine};
use crate::env::BuildEnv;
use crate::error::{Error, Result};
use crate::render::{MimeRenderPlugin, NbRenderer};

/// Extension name of the core `exec-jupyter` directive.
pub const CORE_EXTENSION: &str = "nbsplice";

/// Directive registry plus the build environment it runs against.
pub struct App {
    /// Build environment
    pub env: BuildEnv,

    directives: BTreeMap<&'static str, Box<dyn Directive>>,
    renderer: NbRenderer,
}

impl App {
    /// Create an app with the core extension set up.
    pub fn new(env: BuildEnv) -> Self {
        let mut app = Self {
            env,
            directives: BTreeMap::new(),
            renderer: NbRenderer::new(),
        };
        app.setup_extension(CORE_EXTENSION, setup);
        app
    }

    /// Run an extension's setup function once and mark it enabled.
    pub fn setup_extension(&mut self, name: &str, setup: impl FnOnce(&mut App)) {
        if self.env.has_extension(name) {
            return;
        }
        self.env.enable_extension(name);
        setup(self);
        tracing::debug!("Extension {} set up", name);
    }

    /// Register a directive under its name.
    pub fn add_directive(&mut self, directive: impl Directive + 'static) {
        self.directives.insert(directive.name(), Box::new(directive));
    }

    /// Register a config value default.
    pub fn add_config_value(&mut self, name: &str, default: serde_json::Value) {
        self.env.add_config_value(name, default);
    }

    /// Register a MIME render plugin for the engine built by [`build_engine`](Self::build_engine).
    pub fn add_mime_plugin(&mut self, plugin: impl MimeRenderPlugin + 'static) {
        self.renderer.add_plugin(plugin);
    }

    /// Whether a directive is registered.
    pub fn has_directive(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    /// Build a Jupyter engine with every registered plugin.
    ///
    /// Plugins are moved into the engine; later registrations start afresh.
    pub fn build_engine(&mut self) -> JupyterEngine {
        JupyterEngine::with_renderer(std::mem::take(&mut self.renderer))
    }

    /// Run a directive invocation against `document`.
    pub fn run_directive(
        &mut self,
        invocation: &DirectiveInvocation,
        document: &mut Document,
        engine: &dyn NotebookEngine,
    ) -> Result<Vec<Node>> {
        let directive = self
            .directives
            .get(invocation.name.as_str())
            .ok_or_else(|| Error::Directive(format!("unknown directive \"{}\"", invocation.name)))?;

        if let Some(unknown) = invocation
            .options
            .keys()
            .find(|key| !directive.option_names().contains(&key.as_str()))
        {
            return Err(Error::Directive(format!("unknown option: \"{}\"", unknown)));
        }

        if !directive.has_content() && !invocation.content.is_empty() {
            return Err(Error::Directive("no content permitted".to_string()));
        }

        let mut ctx = DirectiveContext {
            env: &mut self.env,
            document,
            engine,
        };
        directive.run(invocation, &mut ctx)
    }
}

/// Core extension setup.
pub fn setup(app: &mut App) {
    app.add_directive(ExecJupyterDirective);
}

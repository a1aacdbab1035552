//! The `holoviews` directive.
//!
//! Runs the same code once per requested backend in a single notebook:
//!
//! ```text
//! per backend:  [hv.extension('<backend>')] [user code] [probe]
//!                        header                 plot     asset URLs
//! ```
//!
//! The probe outputs are merged into one asset registration for the page,
//! and the plots are returned as-is (one backend) or as a tab set.

use nbsplice_core::components::{DESIGN_EXTENSION, create_component};
use nbsplice_core::directive::inline_text;
use nbsplice_core::{
    AssetPayload, Directive, DirectiveContext, DirectiveInvocation, Element, Error, Node, Result,
    execute_cells,
};

use crate::backend::{Backend, HoloViewsConfig};
use crate::probe::{PROBE_SOURCE, parse_probe};

/// Cells emitted per backend: init, user code, probe.
pub const FRAGMENTS_PER_BACKEND: usize = 3;

/// Key namespace for registered assets.
pub const ASSET_NAMESPACE: &str = "holoviews";

/// Renders HoloViews code with one or more plotting backends.
pub struct HoloViewsDirective;

impl HoloViewsDirective {
    /// Fragment batch for `code` across `backends`.
    pub fn fragments(code: &str, backends: &[Backend]) -> Vec<String> {
        backends
            .iter()
            .flat_map(|backend| {
                [
                    backend.init_fragment(),
                    code.to_string(),
                    PROBE_SOURCE.to_string(),
                ]
            })
            .collect()
    }

    /// Backends requested by the invocation, falling back to config.
    fn requested_backends(
        invocation: &DirectiveInvocation,
        config: &HoloViewsConfig,
    ) -> Result<Vec<Backend>> {
        let backends = match invocation.option("backends") {
            Some(argument) => Backend::parse_list(argument)?,
            None => config.backends.clone(),
        };
        if backends.is_empty() {
            return Err(Error::Directive(
                "at least one HoloViews backend is required".to_string(),
            ));
        }
        Ok(backends)
    }
}

impl Directive for HoloViewsDirective {
    fn name(&self) -> &'static str {
        "holoviews"
    }

    fn option_names(&self) -> &'static [&'static str] {
        &["backends"]
    }

    fn run(
        &self,
        invocation: &DirectiveInvocation,
        ctx: &mut DirectiveContext<'_>,
    ) -> Result<Vec<Node>> {
        let config = HoloViewsConfig::from_env(ctx.env)?;
        let backends = Self::requested_backends(invocation, &config)?;

        if backends.len() > 1 && !ctx.env.has_extension(DESIGN_EXTENSION) {
            return Err(Error::Directive(format!(
                "`{}` extension is required for multiple backends",
                DESIGN_EXTENSION
            )));
        }

        let fragments = Self::fragments(&invocation.code(), &backends);
        let results_raw = execute_cells(&fragments, ctx.document, ctx.env, ctx.engine)?;

        if results_raw.len() != FRAGMENTS_PER_BACKEND * backends.len() {
            return Err(Error::UnexpectedOutputShape {
                message: format!(
                    "expected {} outputs from HoloViews execution ({} per backend), got {}",
                    FRAGMENTS_PER_BACKEND * backends.len(),
                    FRAGMENTS_PER_BACKEND,
                    results_raw.len()
                ),
                rendering: render_all(&results_raw),
            });
        }

        let mut payload = AssetPayload::with_js(config.core_js_urls());
        for backend in &backends {
            payload.extend(
                backend.static_js_urls().iter().map(|url| url.to_string()),
                Vec::<String>::new(),
            );
        }

        let groups = results_raw.chunks_exact(FRAGMENTS_PER_BACKEND);
        for (backend, group) in backends.iter().zip(groups) {
            let urls = parse_probe(&group[2])?;
            tracing::debug!(
                "{} needs {} scripts, {} stylesheets",
                backend,
                urls.js.len(),
                urls.css.len()
            );
            payload.extend(urls.js, urls.css);
        }

        let docname = ctx.env.docname().to_string();
        payload.register(&mut ctx.env.assets, &docname, ASSET_NAMESPACE);

        let plots = results_raw
            .into_iter()
            .skip(1)
            .step_by(FRAGMENTS_PER_BACKEND);

        if backends.len() == 1 {
            return Ok(plots.collect());
        }

        Ok(vec![tab_set(backends.into_iter().zip(plots).collect())])
    }
}

/// One tab per backend, first selected.
fn tab_set(plots: Vec<(Backend, Node)>) -> Node {
    let mut tab_set = create_component("tab-set", &["sd-tab-set"], Vec::new(), false);

    for (i, (backend, plot)) in plots.into_iter().enumerate() {
        let label = Element::new("rubric")
            .with_class("sd-tab-label")
            .with_attr("rawsource", backend.name())
            .with_children(inline_text(backend.name()));
        let content = create_component("tab-content", &["sd-tab-content"], vec![plot], false);
        let item = create_component(
            "tab-item",
            &["sd-tab-item"],
            vec![label.into(), content.into()],
            i == 0,
        );
        tab_set.children.push(item.into());
    }

    tab_set.into()
}

fn render_all(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(Node::pformat)
        .collect::<Vec<_>>()
        .join("\n\n")
}

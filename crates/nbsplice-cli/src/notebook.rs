//! Notebook command: show the synthetic notebooks a page would execute.

use std::path::Path;

use nbsplice_core::{App, DirectiveInvocation, NotebookBuilder};
use nbsplice_holoviews::{Backend, HoloViewsConfig, HoloViewsDirective};

use crate::build::make_app;
use crate::config::BuildConfig;
use crate::page::directives;

/// Fragments a directive would execute, or `None` if it executes nothing.
pub fn fragments(app: &App, invocation: &DirectiveInvocation) -> anyhow::Result<Option<Vec<String>>> {
    match invocation.name.as_str() {
        "exec-jupyter" => Ok(Some(vec![invocation.code()])),
        "holoviews" if app.has_directive("holoviews") => {
            let backends = match invocation.option("backends") {
                Some(argument) => Backend::parse_list(argument)?,
                None => HoloViewsConfig::from_env(&app.env)?.backends,
            };
            Ok(Some(HoloViewsDirective::fragments(&invocation.code(), &backends)))
        }
        _ => Ok(None),
    }
}

/// Execute the notebook command: print a JSON array with one notebook per
/// executing directive. Nothing is run.
pub fn execute(page: &str, config: &BuildConfig) -> anyhow::Result<()> {
    let path = Path::new(page);
    if !path.exists() {
        anyhow::bail!("Page not found: {}", page);
    }
    let srcdir = path.parent().unwrap_or(Path::new("."));
    let source = std::fs::read_to_string(path)?;

    let app = make_app(srcdir, config)?;
    let builder = NotebookBuilder::new(app.env.nb_config.kernel.clone());

    let mut notebooks = Vec::new();
    for invocation in directives(&source) {
        match fragments(&app, &invocation)? {
            Some(fragments) => {
                tracing::debug!(
                    "{} directive at line {}: {} cells",
                    invocation.name,
                    invocation.lineno,
                    fragments.len()
                );
                notebooks.push(serde_json::to_value(builder.from_fragments(&fragments))?);
            }
            None => tracing::debug!(
                "{} directive at line {} executes nothing",
                invocation.name,
                invocation.lineno
            ),
        }
    }

    println!("{}", serde_json::to_string_pretty(&notebooks)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holoviews_fragments_follow_config() {
        let config = BuildConfig {
            holoviews_backends: Some(vec!["matplotlib".to_string(), "plotly".to_string()]),
            ..Default::default()
        };
        let app = make_app(Path::new("/docs"), &config).unwrap();
        let invocation = DirectiveInvocation {
            name: "holoviews".to_string(),
            content: vec!["hv.Curve([1])".to_string()],
            ..Default::default()
        };

        let fragments = fragments(&app, &invocation).unwrap().unwrap();
        assert_eq!(fragments.len(), 6);
        assert_eq!(fragments[0], Backend::Matplotlib.init_fragment());
        assert_eq!(fragments[3], Backend::Plotly.init_fragment());
    }

    #[test]
    fn test_unknown_directive_executes_nothing() {
        let app = make_app(Path::new("/docs"), &BuildConfig::default()).unwrap();
        let invocation = DirectiveInvocation {
            name: "note".to_string(),
            ..Default::default()
        };
        assert!(fragments(&app, &invocation).unwrap().is_none());
    }
}

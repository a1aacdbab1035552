//! Build command implementation.
//!
//! Renders every Markdown page under the source directory to HTML, running
//! directive blocks through the notebook engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use nbsplice_core::components::DESIGN_EXTENSION;
use nbsplice_core::directive::system_message;
use nbsplice_core::{App, BuildEnv, Document, Element, Error, Node, NotebookEngine};

use crate::config::BuildConfig;
use crate::html;
use crate::page::{Segment, parse_page};
use crate::report;

/// Source suffix of pages.
const PAGE_SUFFIX: &str = "md";

/// Build an app with the configured extensions set up and settings applied.
pub fn make_app(srcdir: &Path, config: &BuildConfig) -> anyhow::Result<App> {
    let mut app = App::new(BuildEnv::new(srcdir));

    for extension in config.extensions() {
        match extension.as_str() {
            nbsplice_holoviews::EXTENSION => {
                app.setup_extension(nbsplice_holoviews::EXTENSION, nbsplice_holoviews::setup)
            }
            DESIGN_EXTENSION => app.setup_extension(DESIGN_EXTENSION, |_| {}),
            other => anyhow::bail!("Unknown extension: {}", other),
        }
    }

    config.apply(&mut app.env);
    Ok(app)
}

/// Outcome of a build.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Pages written
    pub pages: usize,
    /// Directives that ran
    pub directives: usize,
    /// Directives replaced by an error message
    pub failed: usize,
}

/// Execute the build command.
pub fn execute(srcdir: &str, outdir: &str, config: &BuildConfig) -> anyhow::Result<BuildSummary> {
    let srcdir = Path::new(srcdir);
    if !srcdir.is_dir() {
        anyhow::bail!("Source directory not found: {}", srcdir.display());
    }
    let srcdir = srcdir.canonicalize()?;
    let outdir = PathBuf::from(outdir);
    fs::create_dir_all(&outdir)?;
    let outdir = outdir.canonicalize()?;

    let mut app = make_app(&srcdir, config)?;
    let engine = app.build_engine();

    let pages = collect_pages(&srcdir, &outdir)?;
    tracing::info!("Building {} pages from {}", pages.len(), srcdir.display());

    report::header();

    let mut summary = BuildSummary::default();

    for path in &pages {
        let docname = docname(&srcdir, path);
        let start = Instant::now();
        report::page_started(&docname);

        let source = fs::read_to_string(path)?;
        let page = build_page(&mut app, &engine, &docname, &source)?;

        let target = outdir.join(format!("{}.html", docname));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &page.html)?;

        summary.pages += 1;
        summary.directives += page.directives;
        summary.failed += page.failed;

        report::page_finished(page.failed, start.elapsed());
    }

    report::summary(&summary, &outdir);

    Ok(summary)
}

/// A rendered page.
#[derive(Debug)]
pub struct BuiltPage {
    pub html: String,
    pub directives: usize,
    pub failed: usize,
}

/// Render one page. Directive errors become inline messages; anything else
/// fails the build.
pub fn build_page(
    app: &mut App,
    engine: &dyn NotebookEngine,
    docname: &str,
    source: &str,
) -> anyhow::Result<BuiltPage> {
    app.env.begin_document(docname);
    app.env.assets.clear_page(docname);

    let mut document = Document::new();
    let mut directives = 0;
    let mut failed = 0;

    for segment in parse_page(source) {
        match segment {
            Segment::Markdown(markdown) => {
                document.children.push(
                    Element::new("raw")
                        .with_attr("format", "html")
                        .with_child(Node::text(html::markdown_to_html(&markdown)))
                        .into(),
                );
            }
            Segment::Directive(invocation) => {
                directives += 1;
                match app.run_directive(&invocation, &mut document, engine) {
                    Ok(nodes) => document.children.extend(nodes),
                    Err(Error::Directive(message)) => {
                        tracing::warn!(
                            "{}:{}: {} directive: {}",
                            docname,
                            invocation.lineno,
                            invocation.name,
                            message
                        );
                        failed += 1;
                        document
                            .children
                            .push(system_message(&invocation, &message));
                    }
                    Err(e) => {
                        tracing::error!(
                            "{}:{}: {} directive failed",
                            docname,
                            invocation.lineno,
                            invocation.name
                        );
                        return Err(e.into());
                    }
                }
            }
        }
    }

    let js = app.env.assets.js_files(docname);
    let css = app.env.assets.css_files(docname);
    let html = html::write_page(&page_title(source, docname), &js, &css, &document.children);

    Ok(BuiltPage {
        html,
        directives,
        failed,
    })
}

/// First level-one heading, or the docname.
fn page_title(source: &str, docname: &str) -> String {
    source
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .unwrap_or_else(|| docname.to_string())
}

/// Document name of a page: its path relative to the source directory,
/// without suffix, `/`-separated.
pub fn docname(srcdir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(srcdir).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Markdown pages under `srcdir`, sorted. Hidden directories, `_build` and
/// the output directory are skipped.
fn collect_pages(srcdir: &Path, outdir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    let mut pending = vec![srcdir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            let skipped = name
                .as_deref()
                .is_some_and(|n| n.starts_with('.') || n == "_build");

            if path.is_dir() {
                if !skipped && path != outdir {
                    pending.push(path);
                }
            } else if path.extension().is_some_and(|ext| ext == PAGE_SUFFIX) {
                pages.push(path);
            }
        }
    }

    pages.sort();
    Ok(pages)
}

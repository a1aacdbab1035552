//! Plotting backends and extension configuration.

use std::fmt;
use std::str::FromStr;

use nbsplice_core::directive::choice_list;
use nbsplice_core::{BuildEnv, Error, Result};

/// Config value: backends used when a directive has no `backends` option.
pub const CONFIG_BACKENDS: &str = "holoviews_backends";
/// Config value: Bokeh release whose client runtime is loaded on the page.
pub const CONFIG_BOKEH_VERSION: &str = "holoviews_bokeh_version";
/// Config value: Panel CDN `dist/` base URL.
pub const CONFIG_PANEL_CDN: &str = "holoviews_panel_cdn";

/// Default Bokeh release.
pub const DEFAULT_BOKEH_VERSION: &str = "3.6.3";
/// Default Panel CDN base.
pub const DEFAULT_PANEL_CDN: &str = "https://cdn.holoviz.org/panel/1.6.1/dist/";

/// Plotly.js release loaded for the plotly backend.
pub const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// A HoloViews plotting backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Bokeh,
    Matplotlib,
    Plotly,
}

impl Backend {
    /// Every supported backend.
    pub const ALL: [Backend; 3] = [Backend::Bokeh, Backend::Matplotlib, Backend::Plotly];

    /// Identifiers accepted in options and config.
    pub const NAMES: &'static [&'static str] = &["bokeh", "matplotlib", "plotly"];

    /// Identifier, as passed to `hv.extension`.
    pub fn name(self) -> &'static str {
        match self {
            Backend::Bokeh => "bokeh",
            Backend::Matplotlib => "matplotlib",
            Backend::Plotly => "plotly",
        }
    }

    /// Cell that loads HoloViews with this backend selected.
    pub fn init_fragment(self) -> String {
        format!("import holoviews as hv\nhv.extension('{}')", self.name())
    }

    /// Scripts this backend's plots need beyond the shared runtime.
    pub fn static_js_urls(self) -> &'static [&'static str] {
        match self {
            Backend::Bokeh | Backend::Matplotlib => &[],
            Backend::Plotly => &[PLOTLY_JS],
        }
    }

    /// Parse a comma-separated `backends` option.
    pub fn parse_list(argument: &str) -> Result<Vec<Backend>> {
        choice_list(argument, Self::NAMES)?
            .iter()
            .map(|name| name.parse())
            .collect()
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|backend| backend.name() == s)
            .ok_or_else(|| Error::Directive(format!("unknown HoloViews backend \"{}\"", s)))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// HoloViews settings read from the build environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoloViewsConfig {
    /// Default backends
    pub backends: Vec<Backend>,

    /// Bokeh release
    pub bokeh_version: String,

    /// Panel CDN base URL (ends with `/`)
    pub panel_cdn: String,
}

impl Default for HoloViewsConfig {
    fn default() -> Self {
        Self {
            backends: vec![Backend::Bokeh],
            bokeh_version: DEFAULT_BOKEH_VERSION.to_string(),
            panel_cdn: DEFAULT_PANEL_CDN.to_string(),
        }
    }
}

impl HoloViewsConfig {
    /// Read config values, falling back to defaults for missing ones.
    pub fn from_env(env: &BuildEnv) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = env.config_value(CONFIG_BACKENDS) {
            let names: Vec<String> = serde_json::from_value(value.clone()).map_err(|e| {
                Error::Directive(format!("{} must be a list of strings: {}", CONFIG_BACKENDS, e))
            })?;
            config.backends = names
                .iter()
                .map(|name| name.parse())
                .collect::<Result<_>>()?;
        }
        if let Some(version) = env.config_value(CONFIG_BOKEH_VERSION).and_then(|v| v.as_str()) {
            config.bokeh_version = version.to_string();
        }
        if let Some(cdn) = env.config_value(CONFIG_PANEL_CDN).and_then(|v| v.as_str()) {
            config.panel_cdn = if cdn.ends_with('/') {
                cdn.to_string()
            } else {
                format!("{}/", cdn)
            };
        }

        Ok(config)
    }

    /// Client runtime scripts every HoloViews page needs.
    pub fn core_js_urls(&self) -> Vec<String> {
        let release = "https://cdn.bokeh.org/bokeh/release";
        vec![
            format!("{}/bokeh-{}.min.js", release, self.bokeh_version),
            format!("{}/bokeh-widgets-{}.min.js", release, self.bokeh_version),
            format!("{}/bokeh-tables-{}.min.js", release, self.bokeh_version),
            format!("{}panel.min.js", self.panel_cdn),
        ]
    }
}

//! Project configuration (`nbsplice.json`).

use std::path::{Path, PathBuf};

use nbsplice_core::{BuildEnv, ExecutionMode};
use nbsplice_holoviews::backend::{CONFIG_BACKENDS, CONFIG_BOKEH_VERSION, CONFIG_PANEL_CDN};
use serde::{Deserialize, Serialize};

/// Config file looked up in the source directory.
pub const CONFIG_FILE: &str = "nbsplice.json";

/// Build settings read from `nbsplice.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Extensions to enable besides the core one (`holoviews`, `design`)
    pub extensions: Option<Vec<String>>,
    /// Default HoloViews backends
    pub holoviews_backends: Option<Vec<String>>,
    /// Bokeh release for the core script URLs
    pub bokeh_version: Option<String>,
    /// Panel CDN dist prefix
    pub panel_cdn_dist: Option<String>,
    /// When notebooks execute
    pub execution_mode: Option<ExecutionMode>,
    /// Per-cell kernel timeout in seconds
    pub execution_timeout: Option<u64>,
    /// Explicit `jupyter` executable
    pub jupyter: Option<PathBuf>,
    /// Kernel name
    pub kernel: Option<String>,
}

/// Default extension set when none is configured.
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["holoviews", "design"];

impl BuildConfig {
    /// Load `path`, or `<srcdir>/nbsplice.json` if it exists, or defaults.
    pub fn load(srcdir: &Path, path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = srcdir.join(CONFIG_FILE);
                if !default.exists() {
                    tracing::debug!("No {} in {}, using defaults", CONFIG_FILE, srcdir.display());
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Extensions to set up.
    pub fn extensions(&self) -> Vec<String> {
        match &self.extensions {
            Some(extensions) => extensions.clone(),
            None => DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Apply settings to an environment. Extension defaults must already be
    /// registered so configured values replace them.
    pub fn apply(&self, env: &mut BuildEnv) {
        if let Some(backends) = &self.holoviews_backends {
            env.set_config_value(CONFIG_BACKENDS, serde_json::json!(backends));
        }
        if let Some(version) = &self.bokeh_version {
            env.set_config_value(CONFIG_BOKEH_VERSION, serde_json::json!(version));
        }
        if let Some(cdn) = &self.panel_cdn_dist {
            env.set_config_value(CONFIG_PANEL_CDN, serde_json::json!(cdn));
        }
        if let Some(mode) = self.execution_mode {
            env.nb_config.execution_mode = mode;
        }
        if let Some(timeout) = self.execution_timeout {
            env.nb_config.execution_timeout = timeout;
        }
        if let Some(jupyter) = &self.jupyter {
            env.nb_config.jupyter = Some(jupyter.clone());
        }
        if let Some(kernel) = &self.kernel {
            env.nb_config.kernel = kernel.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::load(dir.path(), None).unwrap();
        assert_eq!(config, BuildConfig::default());
        assert_eq!(config.extensions(), vec!["holoviews", "design"]);
    }

    #[test]
    fn test_load_and_apply() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"holoviews_backends": ["plotly"], "execution_timeout": 90, "kernel": "py311"}"#,
        )
        .unwrap();

        let config = BuildConfig::load(dir.path(), None).unwrap();
        let mut env = BuildEnv::new(dir.path());
        config.apply(&mut env);

        assert_eq!(
            env.config_value(CONFIG_BACKENDS),
            Some(&serde_json::json!(["plotly"]))
        );
        assert_eq!(env.nb_config.execution_timeout, 90);
        assert_eq!(env.nb_config.kernel, "py311");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, r#"{"backend": "bokeh"}"#).unwrap();

        let err = BuildConfig::load(dir.path(), Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }
}

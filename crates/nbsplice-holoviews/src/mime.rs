//! MIME render plugin for HoloViews notebook outputs.

use nbsplice_core::notebook::MimeData;
use nbsplice_core::{MimeRenderPlugin, Node};

/// Bundles HoloViews emits to bootstrap its JS in live notebooks.
pub const HV_MIME_TYPES: [&str; 2] = [
    "application/vnd.holoviews_load.v0+json",
    "application/vnd.holoviews_exec.v0+json",
];

/// Selects the HoloViews bootstrap bundles ahead of everything else and drops
/// them, since the page loads the client runtime through registered assets.
pub struct HoloViewsMimeRenderer;

impl MimeRenderPlugin for HoloViewsMimeRenderer {
    fn mime_priority_overrides(&self) -> Vec<(String, String, usize)> {
        HV_MIME_TYPES
            .iter()
            .map(|mime| ("*".to_string(), mime.to_string(), 1))
            .collect()
    }

    fn handle_mime(&self, data: &MimeData, inline: bool) -> Option<Vec<Node>> {
        if !inline && HV_MIME_TYPES.contains(&data.mime_type.as_str()) {
            return Some(Vec::new());
        }
        None
    }
}

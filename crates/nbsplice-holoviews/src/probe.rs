//! Asset-collection probe.
//!
//! The probe cell runs after the user's code and prints which client-side
//! scripts and stylesheets the loaded plotting models need. The printed JSON
//! is the only channel back from the kernel, so its shape is fixed:
//!
//! ```text
//! container.cell
//! ├── cell_input
//! └── container.cell_output
//!     └── literal_block    {"js": [...], "css": [...]}
//! ```

use serde::Deserialize;

use nbsplice_core::{Error, Node, Result};

/// Python source of the probe cell.
pub const PROBE_SOURCE: &str = include_str!("collect-urls.py");

/// Payload printed by the probe cell.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbePayload {
    pub js: Vec<String>,
    pub css: Vec<String>,
}

/// Text printed by the probe, found at cell → output container → literal block.
pub fn probe_text(cell: &Node) -> Option<String> {
    let output = cell.child(1).filter(|n| n.tag() == "container")?;
    let literal = output.child(0).filter(|n| n.tag() == "literal_block")?;
    Some(literal.astext())
}

/// Parse the payload out of a rendered probe cell.
pub fn parse_probe(cell: &Node) -> Result<ProbePayload> {
    let text = probe_text(cell).ok_or_else(|| Error::ProbeOutput {
        reason: "no printed output in the probe cell".to_string(),
        rendering: cell.pformat(),
    })?;

    serde_json::from_str(text.trim()).map_err(|e| Error::ProbeOutput {
        reason: e.to_string(),
        rendering: cell.pformat(),
    })
}

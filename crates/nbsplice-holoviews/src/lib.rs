//! HoloViews support for nbsplice.
//!
//! Adds a `holoviews` directive that renders one block of plotting code with
//! several backends, registers the client-side assets the plots need, and
//! shows multiple renderings as tabs.
//!
//! ~~~text
//! ```{holoviews}
//! :backends: bokeh, plotly
//! hv.Curve([1, 2, 3])
//! ```
//! ~~~

pub mod backend;
pub mod directive;
pub mod mime;
pub mod probe;

pub use backend::{Backend, HoloViewsConfig};
pub use directive::HoloViewsDirective;
pub use mime::HoloViewsMimeRenderer;
pub use probe::{PROBE_SOURCE, ProbePayload};

use nbsplice_core::App;

/// Extension name.
pub const EXTENSION: &str = "holoviews";

/// Register the directive, its config values and the MIME plugin.
pub fn setup(app: &mut App) {
    app.add_directive(HoloViewsDirective);
    app.add_config_value(backend::CONFIG_BACKENDS, serde_json::json!(["bokeh"]));
    app.add_config_value(
        backend::CONFIG_BOKEH_VERSION,
        serde_json::json!(backend::DEFAULT_BOKEH_VERSION),
    );
    app.add_config_value(
        backend::CONFIG_PANEL_CDN,
        serde_json::json!(backend::DEFAULT_PANEL_CDN),
    );
    app.add_mime_plugin(HoloViewsMimeRenderer);
}

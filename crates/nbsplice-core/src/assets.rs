//! Per-page client asset registration.
//!
//! Executed notebook outputs often need JS/CSS on the page that shows them.
//! Registrations are keyed per page, and a key only ever registers once.

use std::collections::BTreeMap;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;

/// A registered script or stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub url: String,
    pub attributes: BTreeMap<String, String>,
}

type PageTable = IndexMap<String, AssetRef>;

/// JS/CSS registrations for every page of the build.
#[derive(Debug, Default)]
pub struct PageAssets {
    js: FxHashMap<String, PageTable>,
    css: FxHashMap<String, PageTable>,
}

impl PageAssets {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a script for a page. Returns `false` if `key` was already taken.
    pub fn add_js_file(
        &mut self,
        docname: &str,
        key: &str,
        url: &str,
        attributes: BTreeMap<String, String>,
    ) -> bool {
        register(&mut self.js, docname, key, url, attributes)
    }

    /// Register a stylesheet for a page. Returns `false` if `key` was already taken.
    pub fn add_css_file(
        &mut self,
        docname: &str,
        key: &str,
        url: &str,
        attributes: BTreeMap<String, String>,
    ) -> bool {
        register(&mut self.css, docname, key, url, attributes)
    }

    /// Scripts registered for a page, in registration order.
    pub fn js_files(&self, docname: &str) -> Vec<&AssetRef> {
        self.js
            .get(docname)
            .map(|table| table.values().collect())
            .unwrap_or_default()
    }

    /// Stylesheets registered for a page, in registration order.
    pub fn css_files(&self, docname: &str) -> Vec<&AssetRef> {
        self.css
            .get(docname)
            .map(|table| table.values().collect())
            .unwrap_or_default()
    }

    /// Forget everything registered for a page (the page is being rebuilt).
    pub fn clear_page(&mut self, docname: &str) {
        self.js.remove(docname);
        self.css.remove(docname);
    }
}

fn register(
    tables: &mut FxHashMap<String, PageTable>,
    docname: &str,
    key: &str,
    url: &str,
    attributes: BTreeMap<String, String>,
) -> bool {
    let table = tables.entry(docname.to_string()).or_default();
    if table.contains_key(key) {
        return false;
    }
    table.insert(
        key.to_string(),
        AssetRef {
            url: url.to_string(),
            attributes,
        },
    );
    true
}

/// Deduplicated script and stylesheet URLs, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPayload {
    pub js: IndexSet<String>,
    pub css: IndexSet<String>,
}

impl AssetPayload {
    /// Start from a list of script URLs.
    pub fn with_js<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            js: urls.into_iter().map(Into::into).collect(),
            css: IndexSet::new(),
        }
    }

    /// Merge URLs, keeping first-seen order.
    pub fn extend<J, C>(&mut self, js: J, css: C)
    where
        J: IntoIterator<Item = String>,
        C: IntoIterator<Item = String>,
    {
        self.js.extend(js);
        self.css.extend(css);
    }

    /// Register every URL for `docname` under `"<namespace>-<url>"` keys.
    pub fn register(&self, assets: &mut PageAssets, docname: &str, namespace: &str) {
        let mut added = 0;
        for url in &self.js {
            let key = format!("{}-{}", namespace, url);
            if assets.add_js_file(docname, &key, url, BTreeMap::new()) {
                added += 1;
            }
        }
        for url in &self.css {
            let key = format!("{}-{}", namespace, url);
            if assets.add_css_file(docname, &key, url, BTreeMap::new()) {
                added += 1;
            }
        }
        tracing::debug!("Registered {} new {} assets for {}", added, namespace, docname);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_registers_once() {
        let mut assets = PageAssets::new();
        assert!(assets.add_js_file("index", "k", "https://cdn/a.js", BTreeMap::new()));
        assert!(!assets.add_js_file("index", "k", "https://cdn/b.js", BTreeMap::new()));

        let files = assets.js_files("index");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].url, "https://cdn/a.js");
    }

    #[test]
    fn test_pages_are_independent() {
        let mut assets = PageAssets::new();
        assets.add_js_file("a", "k", "https://cdn/a.js", BTreeMap::new());
        assets.add_js_file("b", "k", "https://cdn/a.js", BTreeMap::new());
        assert_eq!(assets.js_files("a").len(), 1);
        assert_eq!(assets.js_files("b").len(), 1);

        assets.clear_page("a");
        assert!(assets.js_files("a").is_empty());
        assert_eq!(assets.js_files("b").len(), 1);
    }

    #[test]
    fn test_payload_dedupes_in_order() {
        let mut payload = AssetPayload::with_js(["one.js", "two.js"]);
        payload.extend(
            vec!["two.js".to_string(), "three.js".to_string()],
            vec!["a.css".to_string(), "a.css".to_string()],
        );

        let js: Vec<&str> = payload.js.iter().map(String::as_str).collect();
        assert_eq!(js, ["one.js", "two.js", "three.js"]);
        assert_eq!(payload.css.len(), 1);
    }

    #[test]
    fn test_payload_register_is_idempotent() {
        let mut assets = PageAssets::new();
        let payload = AssetPayload::with_js(["https://cdn/x.js"]);

        payload.register(&mut assets, "index", "holoviews");
        payload.register(&mut assets, "index", "holoviews");

        assert_eq!(assets.js_files("index").len(), 1);
    }
}

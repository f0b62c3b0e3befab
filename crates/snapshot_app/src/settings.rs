//! Settings file loading.
//!
//! The file is RON. Task options live under `task` and use the camelCase
//! names of the configuration surface:
//!
//! ```ron
//! (
//!     renderEndpoint: "http://localhost:3000/render",
//!     task: (
//!         sitemapUrl: "https://example.com/sitemap.xml",
//!         rexclude: "/admin/",
//!         sitePath: "https://example.com",
//!         snapshotPath: "snapshots/",
//!         removeScripts: true,
//!         replaceStrings: [{"https://example.com": ""}],
//!     ),
//! )
//! ```
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use snapshot_engine::SnapshotOptions;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AppSettings {
    /// Rendering service that turns a URL into rendered markup.
    pub render_endpoint: String,
    pub render_timeout_secs: u64,
    pub sitemap_timeout_secs: u64,
    pub task: SnapshotOptions,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            render_endpoint: "http://localhost:3000/render".to_string(),
            render_timeout_secs: 120,
            sitemap_timeout_secs: 30,
            task: SnapshotOptions::default(),
        }
    }
}

pub fn parse(content: &str) -> anyhow::Result<AppSettings> {
    ron::from_str(content).context("invalid settings file")
}

/// Load settings from `path`, or defaults when no file is given.
pub fn load(path: Option<&Path>) -> anyhow::Result<AppSettings> {
    let Some(path) = path else {
        return Ok(AppSettings::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    parse(&content).with_context(|| format!("in {}", path.display()))
}

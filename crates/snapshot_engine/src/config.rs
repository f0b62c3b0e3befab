use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use snapshot_core::{
    ExclusionFilter, PipelineSettings, ReplaceRule, SanitizeFn, SnapshotNaming, TransformChain,
};

use crate::render::{Cookie, RenderOptions};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("either `urls` or `sitemapUrl` must be set")]
    NoSource,
    #[error("`urls` and `sitemapUrl` are mutually exclusive")]
    AmbiguousSource,
    #[error("invalid `rexclude` pattern: {0}")]
    Exclude(#[source] regex::Error),
    #[error("`replaceStrings[{index}]` must map exactly one pattern, found {found}")]
    ReplaceArity { index: usize, found: usize },
    #[error("invalid `replaceStrings[{index}]` pattern `{pattern}`: {source}")]
    ReplacePattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// User-facing task options. Field names follow the camelCase configuration surface.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SnapshotOptions {
    pub urls: Vec<String>,
    pub sitemap_url: String,
    pub rexclude: String,
    pub file_name_prefix: String,
    pub snapshot_path: String,
    pub site_path: String,
    pub remove_scripts: bool,
    pub remove_link_tags: bool,
    pub remove_meta_tags: bool,
    /// Ordered single-entry maps of `pattern -> replacement`.
    pub replace_strings: Vec<BTreeMap<String, String>>,
    pub ms_wait_for_pages: u64,
    pub body_attr: Option<String>,
    pub cookies: Vec<Cookie>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            sitemap_url: String::new(),
            rexclude: String::new(),
            file_name_prefix: "snapshot_".to_string(),
            snapshot_path: String::new(),
            site_path: String::new(),
            remove_scripts: false,
            remove_link_tags: false,
            remove_meta_tags: false,
            replace_strings: Vec::new(),
            ms_wait_for_pages: 500,
            body_attr: None,
            cookies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    /// Page paths given directly.
    List(Vec<String>),
    /// Root sitemap to resolve into page paths.
    Sitemap(String),
}

/// Validated options with every pattern compiled.
#[derive(Debug, Clone)]
pub struct TaskPlan {
    pub source: UrlSource,
    pub exclusion: ExclusionFilter,
    pub pipeline: PipelineSettings,
    pub render: RenderOptions,
}

impl TaskPlan {
    /// Replace the default file-name sanitizer.
    pub fn with_sanitizer(mut self, sanitize: Arc<SanitizeFn>) -> Self {
        self.pipeline.naming = self.pipeline.naming.with_sanitizer(sanitize);
        self
    }
}

impl SnapshotOptions {
    pub fn validate(&self) -> Result<TaskPlan, ConfigError> {
        let source = match (self.urls.is_empty(), self.sitemap_url.is_empty()) {
            (false, false) => return Err(ConfigError::AmbiguousSource),
            (true, true) => return Err(ConfigError::NoSource),
            (false, true) => UrlSource::List(self.urls.clone()),
            (true, false) => UrlSource::Sitemap(self.sitemap_url.clone()),
        };

        let exclusion = ExclusionFilter::new(&self.rexclude).map_err(ConfigError::Exclude)?;

        let mut transform = TransformChain::new()
            .remove_scripts(self.remove_scripts)
            .remove_link_tags(self.remove_link_tags)
            .remove_meta_tags(self.remove_meta_tags);
        for (index, entry) in self.replace_strings.iter().enumerate() {
            let mut pairs = entry.iter();
            let (Some((pattern, replacement)), None) = (pairs.next(), pairs.next()) else {
                return Err(ConfigError::ReplaceArity {
                    index,
                    found: entry.len(),
                });
            };
            let rule = ReplaceRule::new(pattern, replacement.clone()).map_err(|source| {
                ConfigError::ReplacePattern {
                    index,
                    pattern: pattern.clone(),
                    source,
                }
            })?;
            transform = transform.replace(rule);
        }

        Ok(TaskPlan {
            source,
            exclusion,
            pipeline: PipelineSettings {
                site_path: self.site_path.clone(),
                naming: SnapshotNaming::new(&self.snapshot_path, &self.file_name_prefix),
                transform,
            },
            render: RenderOptions {
                wait_for_page: Duration::from_millis(self.ms_wait_for_pages),
                body_attr: self.body_attr.clone(),
                cookies: self.cookies.clone(),
            },
        })
    }
}

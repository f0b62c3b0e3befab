use std::fmt;
use std::sync::Arc;

/// Pluggable file-name sanitizer applied to the relative page path.
pub type SanitizeFn = dyn Fn(&str) -> String + Send + Sync;

/// Default sanitizer: `#`, `/` and `!` become `_`.
pub fn default_sanitize(relative: &str) -> String {
    relative.replace(['#', '/', '!'], "_")
}

/// Strip the site-path prefix from a rendered URL.
///
/// A URL that does not start with `site_path` is returned unchanged.
pub fn relative_path<'a>(site_path: &str, rendered_url: &'a str) -> &'a str {
    if site_path.is_empty() {
        return rendered_url;
    }
    rendered_url.strip_prefix(site_path).unwrap_or(rendered_url)
}

/// Builds `{snapshot_path}{file_name_prefix}{sanitize(relative)}.html`.
///
/// The snapshot path is concatenated as a string, so it needs its own
/// trailing separator when it names a directory.
#[derive(Clone)]
pub struct SnapshotNaming {
    snapshot_path: String,
    file_name_prefix: String,
    sanitize: Arc<SanitizeFn>,
}

impl SnapshotNaming {
    pub fn new(snapshot_path: impl Into<String>, file_name_prefix: impl Into<String>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            file_name_prefix: file_name_prefix.into(),
            sanitize: Arc::new(default_sanitize),
        }
    }

    pub fn with_sanitizer(mut self, sanitize: Arc<SanitizeFn>) -> Self {
        self.sanitize = sanitize;
        self
    }

    pub fn file_name(&self, relative: &str) -> String {
        format!(
            "{}{}{}.html",
            self.snapshot_path,
            self.file_name_prefix,
            (self.sanitize)(relative)
        )
    }
}

impl Default for SnapshotNaming {
    fn default() -> Self {
        Self::new("", "snapshot_")
    }
}

impl fmt::Debug for SnapshotNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotNaming")
            .field("snapshot_path", &self.snapshot_path)
            .field("file_name_prefix", &self.file_name_prefix)
            .finish_non_exhaustive()
    }
}

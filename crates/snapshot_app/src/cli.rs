use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use engine_logging::{engine_info, LogDestination};
use log::LevelFilter;
use snapshot_engine::{
    FetchSettings, HttpRenderService, RenderEngine, ReqwestFetcher, SnapshotTask,
};

use crate::settings::{self, AppSettings};

/// Render pages through a browser rendering service and save the HTML snapshots.
///
/// Pages come either from `--url` (repeatable) or from a sitemap hierarchy
/// resolved from `--sitemap-url`. Command-line values override the settings file.
#[derive(Debug, Parser)]
#[command(name = "html_snapshot", version)]
pub struct Args {
    /// RON settings file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Page path to snapshot; replaces the page source of the settings file
    #[arg(long = "url", value_name = "PATH")]
    urls: Vec<String>,

    /// Root sitemap to resolve into page paths
    #[arg(long)]
    sitemap_url: Option<String>,

    /// Skip sitemap entries whose location matches this regex
    #[arg(long)]
    rexclude: Option<String>,

    /// Prefix prepended to every page path before rendering
    #[arg(long)]
    site_path: Option<String>,

    /// Prefix for snapshot file paths (include a trailing `/` for a directory)
    #[arg(long)]
    snapshot_path: Option<String>,

    #[arg(long)]
    file_name_prefix: Option<String>,

    /// Rendering service endpoint
    #[arg(long)]
    render_endpoint: Option<String>,

    /// Time given to each page to settle, in milliseconds
    #[arg(long)]
    ms_wait_for_pages: Option<u64>,

    #[arg(long)]
    remove_scripts: bool,

    #[arg(long)]
    remove_link_tags: bool,

    #[arg(long)]
    remove_meta_tags: bool,

    /// Also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Apply command-line overrides on top of file settings.
    fn apply(&self, settings: &mut AppSettings) {
        let task = &mut settings.task;
        if !self.urls.is_empty() || self.sitemap_url.is_some() {
            task.urls = self.urls.clone();
            task.sitemap_url = self.sitemap_url.clone().unwrap_or_default();
        }
        if let Some(rexclude) = &self.rexclude {
            task.rexclude = rexclude.clone();
        }
        if let Some(site_path) = &self.site_path {
            task.site_path = site_path.clone();
        }
        if let Some(snapshot_path) = &self.snapshot_path {
            task.snapshot_path = snapshot_path.clone();
        }
        if let Some(prefix) = &self.file_name_prefix {
            task.file_name_prefix = prefix.clone();
        }
        if let Some(ms) = self.ms_wait_for_pages {
            task.ms_wait_for_pages = ms;
        }
        task.remove_scripts |= self.remove_scripts;
        task.remove_link_tags |= self.remove_link_tags;
        task.remove_meta_tags |= self.remove_meta_tags;
        if let Some(endpoint) = &self.render_endpoint {
            settings.render_endpoint = endpoint.clone();
        }
    }
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let mut settings = settings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    let plan = settings.task.validate()?;

    let fetcher = ReqwestFetcher::new(FetchSettings {
        request_timeout: Duration::from_secs(settings.sitemap_timeout_secs),
        ..FetchSettings::default()
    })?;
    let renderer = HttpRenderService::new(
        settings.render_endpoint.clone(),
        Duration::from_secs(settings.render_timeout_secs),
    )?;
    let engine = RenderEngine::spawn(Arc::new(renderer));

    let report = SnapshotTask::new(plan, Arc::new(fetcher), engine)
        .run()
        .await?;
    engine_info!(
        "html-snapshot run {} finished: {} of {} pages written",
        report.run_id,
        report.written.len(),
        report.url_count
    );
    Ok(())
}

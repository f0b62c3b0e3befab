//! Snapshot engine: sitemap IO, render engine and task execution.
mod config;
mod decode;
mod engine;
mod fetch;
mod persist;
mod render;
mod resolver;
mod sitemap;
mod task;
mod types;

pub use config::{ConfigError, SnapshotOptions, TaskPlan, UrlSource};
pub use decode::{decode_body, DecodeError};
pub use engine::RenderEngine;
pub use fetch::{FetchSettings, ReqwestFetcher, SitemapFetcher};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use render::{
    Cookie, HttpRenderService, RenderFailure, RenderOptions, RenderRequest, RenderedPage, Renderer,
};
pub use resolver::resolve_sitemap;
pub use sitemap::{parse_sitemap, SitemapError};
pub use task::{SnapshotTask, TaskError, TaskReport};
pub use types::{FailureKind, FetchError};

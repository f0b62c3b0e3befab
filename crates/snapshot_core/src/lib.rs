//! Snapshot core: pure resolution and pipeline state machines.
mod effect;
mod event;
mod exclude;
mod msg;
mod naming;
mod resolve;
mod run;
mod sitemap;
mod state;
mod transform;
mod update;

pub use effect::{AbortReason, Effect, Outcome};
pub use event::{RenderEvent, RenderEventKind};
pub use exclude::ExclusionFilter;
pub use msg::Msg;
pub use naming::{default_sanitize, relative_path, SanitizeFn, SnapshotNaming};
pub use resolve::{FetchRequest, NodeId, ResolutionTree, ResolveError, ResolveStep};
pub use run::{JobId, RunId};
pub use sitemap::{location_path, SitemapDocument};
pub use state::{Phase, PipelineSettings, PipelineState, SnapshotJob};
pub use transform::{ReplaceRule, TransformChain};
pub use update::update;

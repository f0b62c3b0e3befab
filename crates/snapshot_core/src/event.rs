use crate::{JobId, RunId};

/// Event emitted by the rendering collaborator, tagged with the run and job that requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderEvent {
    pub run_id: RunId,
    pub job_id: JobId,
    pub kind: RenderEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEventKind {
    /// Rendering finished; `url` is the URL the engine reports for the page.
    PageReady { html: String, url: String },
    /// A console line printed by the page while rendering.
    Console(String),
    /// Rendering failed. Fatal for the run.
    Error {
        message: String,
        trace: Option<String>,
    },
}

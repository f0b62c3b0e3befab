#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Begin dispatching the run's URL list.
    Start,
    /// An event arrived on the render bus. It may belong to another run.
    Render(crate::RenderEvent),
    /// The snapshot for a job has been persisted.
    SnapshotWritten { job_id: crate::JobId, file: String },
    /// Persisting the snapshot for a job failed.
    SnapshotFailed {
        job_id: crate::JobId,
        file: String,
        message: String,
    },
}

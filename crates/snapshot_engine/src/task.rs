use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use engine_logging::{engine_error, engine_info, engine_warn};
use snapshot_core::{
    update, AbortReason, Effect, JobId, Msg, Outcome, PipelineState, ResolveError, RunId,
};
use tokio::sync::broadcast::error::RecvError;

use crate::config::{TaskPlan, UrlSource};
use crate::engine::RenderEngine;
use crate::fetch::SitemapFetcher;
use crate::persist::AtomicFileWriter;
use crate::render::RenderRequest;
use crate::resolver::resolve_sitemap;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("{0}")]
    Aborted(AbortReason),
    #[error("render engine stopped before the run finished")]
    EngineStopped,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub run_id: RunId,
    pub url_count: usize,
    /// Snapshot files in the order they were committed.
    pub written: Vec<String>,
}

/// One invocation of the snapshot task: resolve URLs, then render and write them in order.
pub struct SnapshotTask {
    plan: TaskPlan,
    fetcher: Arc<dyn SitemapFetcher>,
    engine: RenderEngine,
    writer: AtomicFileWriter,
    run_id: RunId,
}

impl SnapshotTask {
    pub fn new(plan: TaskPlan, fetcher: Arc<dyn SitemapFetcher>, engine: RenderEngine) -> Self {
        let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        Self {
            plan,
            fetcher,
            engine,
            writer: AtomicFileWriter::new(PathBuf::from(".")),
            run_id: RunId::from_millis(millis),
        }
    }

    /// Resolve snapshot file names against `base` instead of the working directory.
    pub fn with_output_base(mut self, base: PathBuf) -> Self {
        self.writer = AtomicFileWriter::new(base);
        self
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub async fn run(self) -> Result<TaskReport, TaskError> {
        engine_info!("running html-snapshot task (run {})", self.run_id);

        let urls = match &self.plan.source {
            UrlSource::List(urls) => urls.clone(),
            UrlSource::Sitemap(root) => {
                let urls =
                    resolve_sitemap(self.fetcher.clone(), root, self.plan.exclusion.clone())
                        .await?;
                engine_info!("Finished scraping sitemap");
                urls
            }
        };
        let url_count = urls.len();

        let mut events = self.engine.subscribe();
        let mut state = PipelineState::new(self.run_id.clone(), urls, self.plan.pipeline.clone());
        let mut inbox = VecDeque::from([Msg::Start]);

        loop {
            while let Some(msg) = inbox.pop_front() {
                let (next, effects) = update(state, msg);
                state = next;
                for effect in effects {
                    if let Some(outcome) = self.execute(effect, &mut inbox).await {
                        return self.finish(outcome, url_count);
                    }
                }
            }

            match events.recv().await {
                Ok(event) => inbox.push_back(Msg::Render(event)),
                Err(RecvError::Lagged(skipped)) => {
                    engine_warn!("Render event bus lagged, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => return Err(TaskError::EngineStopped),
            }
        }
    }

    async fn execute(&self, effect: Effect, inbox: &mut VecDeque<Msg>) -> Option<Outcome> {
        match effect {
            Effect::Render { job_id, url } => {
                engine_info!("Snapshotting {}", url);
                self.engine.render(RenderRequest {
                    run_id: self.run_id.clone(),
                    job_id,
                    url,
                    options: self.plan.render.clone(),
                });
            }
            Effect::WriteSnapshot {
                job_id,
                file,
                content,
            } => inbox.push_back(self.write_snapshot(job_id, file, content).await),
            Effect::Halt => self.engine.halt(),
            Effect::Console { job_id, line } => engine_info!("[job {}] {}", job_id, line),
            Effect::Finish(outcome) => return Some(outcome),
        }
        None
    }

    /// Persist on the blocking pool and report the result as a pipeline message.
    async fn write_snapshot(&self, job_id: JobId, file: String, content: String) -> Msg {
        let writer = self.writer.clone();
        let target = file.clone();
        let written =
            tokio::task::spawn_blocking(move || writer.write(&target, &content)).await;
        let message = match written {
            Ok(Ok(_)) => {
                engine_info!("{} written", file);
                return Msg::SnapshotWritten { job_id, file };
            }
            Ok(Err(err)) => err.to_string(),
            Err(err) => format!("snapshot write task failed: {err}"),
        };
        Msg::SnapshotFailed {
            job_id,
            file,
            message,
        }
    }

    fn finish(&self, outcome: Outcome, url_count: usize) -> Result<TaskReport, TaskError> {
        match outcome {
            Outcome::Success { written } => {
                engine_info!("Wrote {} snapshots", written.len());
                Ok(TaskReport {
                    run_id: self.run_id.clone(),
                    url_count,
                    written,
                })
            }
            Outcome::Aborted(reason) => {
                if let AbortReason::Render {
                    trace: Some(trace), ..
                } = &reason
                {
                    engine_error!("{}", trace);
                }
                Err(TaskError::Aborted(reason))
            }
        }
    }
}

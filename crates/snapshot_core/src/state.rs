use crate::{AbortReason, JobId, RunId, SnapshotNaming, TransformChain};

/// One render, transform and write unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotJob {
    pub job_id: JobId,
    /// Position in the run's URL list.
    pub index: usize,
    pub source_url: String,
    pub is_last: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Render requested, waiting for the engine.
    Dispatched(SnapshotJob),
    /// Markup handed off for writing, waiting for the write to be reported.
    Committing(SnapshotJob),
    Succeeded,
    Aborted(AbortReason),
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Aborted(_))
    }
}

/// Path construction and content rewriting shared by every job of a run.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub site_path: String,
    pub naming: SnapshotNaming,
    pub transform: TransformChain,
}

#[derive(Debug, Clone)]
pub struct PipelineState {
    run_id: RunId,
    settings: PipelineSettings,
    urls: Vec<String>,
    next_index: usize,
    next_job_id: JobId,
    phase: Phase,
    written: Vec<String>,
}

impl PipelineState {
    pub fn new(run_id: RunId, urls: Vec<String>, settings: PipelineSettings) -> Self {
        Self {
            run_id,
            settings,
            urls,
            next_index: 0,
            next_job_id: 1,
            phase: Phase::Idle,
            written: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Files written so far, in commit order.
    pub fn written(&self) -> &[String] {
        &self.written
    }

    /// Number of jobs dispatched so far.
    pub fn dispatched(&self) -> usize {
        self.next_index
    }

    pub(crate) fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn record_written(&mut self, file: String) {
        self.written.push(file);
    }

    /// Pop the next URL into a job. `None` once the list is exhausted.
    pub(crate) fn next_job(&mut self) -> Option<SnapshotJob> {
        let source_url = self.urls.get(self.next_index)?.clone();
        let job = SnapshotJob {
            job_id: self.next_job_id,
            index: self.next_index,
            source_url,
            is_last: self.next_index + 1 == self.urls.len(),
        };
        self.next_index += 1;
        self.next_job_id += 1;
        Some(job)
    }
}

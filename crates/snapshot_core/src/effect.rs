use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a render request for `url`, tagged with the run id and `job_id`.
    Render { job_id: crate::JobId, url: String },
    /// Persist transformed markup to `file`, overwriting any previous snapshot.
    WriteSnapshot {
        job_id: crate::JobId,
        file: String,
        content: String,
    },
    /// Release the rendering engine's current job.
    Halt,
    /// Forward a page console line to the log.
    Console { job_id: crate::JobId, line: String },
    /// The run reached a terminal state.
    Finish(Outcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { written: Vec<String> },
    Aborted(AbortReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    Render {
        url: String,
        message: String,
        trace: Option<String>,
    },
    Persist { file: String, message: String },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Render { url, message, .. } => {
                write!(f, "error rendering {url}: {message}")
            }
            AbortReason::Persist { file, message } => {
                write!(f, "error writing {file}: {message}")
            }
        }
    }
}

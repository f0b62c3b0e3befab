use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use engine_logging::{engine_debug, engine_error, engine_trace};
use futures_util::FutureExt;
use snapshot_core::{RenderEvent, RenderEventKind};
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::render::{RenderFailure, RenderRequest, Renderer};

const EVENT_BUS_CAPACITY: usize = 64;

enum EngineCommand {
    Render(RenderRequest),
    Halt,
}

/// Handle to the single shared rendering engine.
///
/// Requests are answered on a broadcast bus that any number of runs may
/// subscribe to; each event carries the run and job id of its request.
/// Only one render holds the engine slot at a time. The slot is released by
/// [`RenderEngine::halt`], which also cancels a render still in progress.
/// Requests sent while the slot is held wait in order.
#[derive(Clone)]
pub struct RenderEngine {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    bus: broadcast::Sender<RenderEvent>,
    slot: Arc<Semaphore>,
}

impl RenderEngine {
    /// Start the engine worker on the current tokio runtime.
    pub fn spawn(renderer: Arc<dyn Renderer>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (bus, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        let slot = Arc::new(Semaphore::new(1));

        let worker = Worker {
            renderer,
            bus: bus.clone(),
            slot: slot.clone(),
            queue: VecDeque::new(),
            held: None,
        };
        tokio::spawn(worker.run(cmd_rx));

        Self { cmd_tx, bus, slot }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RenderEvent> {
        self.bus.subscribe()
    }

    pub fn render(&self, request: RenderRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Render(request));
    }

    /// Release the current job so the next request can be rendered.
    pub fn halt(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Halt);
    }

    /// True while a render holds the engine slot.
    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }
}

struct HeldSlot {
    _permit: OwnedSemaphorePermit,
    task: JoinHandle<()>,
}

struct Worker {
    renderer: Arc<dyn Renderer>,
    bus: broadcast::Sender<RenderEvent>,
    slot: Arc<Semaphore>,
    queue: VecDeque<RenderRequest>,
    held: Option<HeldSlot>,
}

impl Worker {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<EngineCommand>) {
        while let Some(command) = cmd_rx.recv().await {
            match command {
                EngineCommand::Render(request) => {
                    engine_trace!("Render queued run={} job={}", request.run_id, request.job_id);
                    self.queue.push_back(request);
                }
                EngineCommand::Halt => {
                    if let Some(held) = self.held.take() {
                        held.task.abort();
                    }
                }
            }
            self.start_next();
        }
    }

    fn start_next(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        let Ok(permit) = self.slot.clone().try_acquire_owned() else {
            return;
        };
        let Some(request) = self.queue.pop_front() else {
            return;
        };
        engine_debug!("Rendering {} (run={} job={})", request.url, request.run_id, request.job_id);
        let task = tokio::spawn(render_and_emit(
            self.renderer.clone(),
            self.bus.clone(),
            request,
        ));
        self.held = Some(HeldSlot {
            _permit: permit,
            task,
        });
    }
}

async fn render_and_emit(
    renderer: Arc<dyn Renderer>,
    bus: broadcast::Sender<RenderEvent>,
    request: RenderRequest,
) {
    let emit = |kind: RenderEventKind| {
        let _ = bus.send(RenderEvent {
            run_id: request.run_id.clone(),
            job_id: request.job_id,
            kind,
        });
    };

    // Every request ends in exactly one PageReady or Error, panics included.
    let outcome = AssertUnwindSafe(renderer.render(&request))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            let message = format!("renderer panicked: {}", panic_message(&*payload));
            engine_error!("{} (run={} job={})", message, request.run_id, request.job_id);
            Err(RenderFailure::new(message))
        });

    match outcome {
        Ok(page) => {
            for line in page.console {
                emit(RenderEventKind::Console(line));
            }
            emit(RenderEventKind::PageReady {
                html: page.html,
                url: page.url,
            });
        }
        Err(failure) => emit(RenderEventKind::Error {
            message: failure.message,
            trace: failure.trace,
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text
    } else {
        "unknown panic"
    }
}

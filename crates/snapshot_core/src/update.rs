use crate::{
    relative_path, AbortReason, Effect, Msg, Outcome, Phase, PipelineState, RenderEvent,
    RenderEventKind,
};

/// Pure update function: applies a message to the pipeline and returns the effects to run.
///
/// At most one job is in flight. The next render is only requested after the
/// previous job's snapshot has been reported written.
pub fn update(mut state: PipelineState, msg: Msg) -> (PipelineState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start => {
            if state.phase() == &Phase::Idle && state.dispatched() == 0 {
                dispatch_next(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::Render(event) => {
            if &event.run_id != state.run_id() {
                return (state, Vec::new());
            }
            on_render_event(&mut state, event)
        }
        Msg::SnapshotWritten { job_id, file } => match state.phase().clone() {
            Phase::Committing(job) if job.job_id == job_id => {
                state.record_written(file);
                if job.is_last {
                    state.set_phase(Phase::Succeeded);
                    vec![Effect::Finish(Outcome::Success {
                        written: state.written().to_vec(),
                    })]
                } else {
                    state.set_phase(Phase::Idle);
                    dispatch_next(&mut state)
                }
            }
            _ => Vec::new(),
        },
        Msg::SnapshotFailed {
            job_id,
            file,
            message,
        } => {
            let committing =
                matches!(state.phase(), Phase::Committing(job) if job.job_id == job_id);
            if committing {
                let reason = AbortReason::Persist { file, message };
                state.set_phase(Phase::Aborted(reason.clone()));
                vec![Effect::Finish(Outcome::Aborted(reason))]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

fn dispatch_next(state: &mut PipelineState) -> Vec<Effect> {
    match state.next_job() {
        Some(job) => {
            let url = format!("{}{}", state.settings().site_path, job.source_url);
            let job_id = job.job_id;
            state.set_phase(Phase::Dispatched(job));
            vec![Effect::Render { job_id, url }]
        }
        None => {
            // Only reachable for an empty URL list; otherwise the last job finishes the run.
            state.set_phase(Phase::Succeeded);
            vec![Effect::Finish(Outcome::Success {
                written: state.written().to_vec(),
            })]
        }
    }
}

fn on_render_event(state: &mut PipelineState, event: RenderEvent) -> Vec<Effect> {
    let job = match state.phase() {
        Phase::Dispatched(job) if job.job_id == event.job_id => job.clone(),
        _ => return Vec::new(),
    };

    match event.kind {
        RenderEventKind::Console(line) => vec![Effect::Console {
            job_id: job.job_id,
            line,
        }],
        RenderEventKind::Error { message, trace } => {
            let reason = AbortReason::Render {
                url: job.source_url,
                message,
                trace,
            };
            state.set_phase(Phase::Aborted(reason.clone()));
            vec![Effect::Halt, Effect::Finish(Outcome::Aborted(reason))]
        }
        RenderEventKind::PageReady { html, url } => {
            let settings = state.settings();
            let relative = relative_path(&settings.site_path, &url);
            let file = settings.naming.file_name(relative);
            let content = settings.transform.apply(&html);
            let job_id = job.job_id;
            state.set_phase(Phase::Committing(job));
            vec![
                Effect::WriteSnapshot {
                    job_id,
                    file,
                    content,
                },
                Effect::Halt,
            ]
        }
    }
}

use pretty_assertions::assert_eq;
use snapshot_core::{
    update, AbortReason, Effect, Msg, Outcome, Phase, PipelineSettings, PipelineState,
    RenderEvent, RenderEventKind, ReplaceRule, RunId, SnapshotNaming, TransformChain,
};

fn run_id() -> RunId {
    RunId::new("1700000000000")
}

fn state_for(urls: &[&str]) -> PipelineState {
    let settings = PipelineSettings {
        site_path: "http://localhost:8080".to_string(),
        naming: SnapshotNaming::default(),
        transform: TransformChain::new(),
    };
    PipelineState::new(
        run_id(),
        urls.iter().map(|s| s.to_string()).collect(),
        settings,
    )
}

fn page_ready(job_id: u64, html: &str, url: &str) -> Msg {
    Msg::Render(RenderEvent {
        run_id: run_id(),
        job_id,
        kind: RenderEventKind::PageReady {
            html: html.to_string(),
            url: url.to_string(),
        },
    })
}

fn render_error(job_id: u64, message: &str) -> Msg {
    Msg::Render(RenderEvent {
        run_id: run_id(),
        job_id,
        kind: RenderEventKind::Error {
            message: message.to_string(),
            trace: None,
        },
    })
}

#[test]
fn two_urls_are_written_in_order_and_finish_after_last() {
    engine_logging::initialize_for_tests();
    let state = state_for(&["/a", "/b"]);

    let (state, effects) = update(state, Msg::Start);
    assert_eq!(
        effects,
        vec![Effect::Render {
            job_id: 1,
            url: "http://localhost:8080/a".to_string()
        }]
    );

    let (state, effects) = update(state, page_ready(1, "<p>a</p>", "http://localhost:8080/a"));
    assert_eq!(
        effects,
        vec![
            Effect::WriteSnapshot {
                job_id: 1,
                file: "snapshot__a.html".to_string(),
                content: "<p>a</p>".to_string(),
            },
            Effect::Halt,
        ]
    );
    // No dispatch until the write is reported.
    assert_eq!(state.dispatched(), 1);

    let (state, effects) = update(
        state,
        Msg::SnapshotWritten {
            job_id: 1,
            file: "snapshot__a.html".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::Render {
            job_id: 2,
            url: "http://localhost:8080/b".to_string()
        }]
    );

    let (state, effects) = update(state, page_ready(2, "<p>b</p>", "http://localhost:8080/b"));
    assert!(matches!(
        effects.first(),
        Some(Effect::WriteSnapshot { file, .. }) if file == "snapshot__b.html"
    ));
    assert!(!state.phase().is_terminal());

    let (state, effects) = update(
        state,
        Msg::SnapshotWritten {
            job_id: 2,
            file: "snapshot__b.html".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::Finish(Outcome::Success {
            written: vec!["snapshot__a.html".to_string(), "snapshot__b.html".to_string()],
        })]
    );
    assert_eq!(state.phase(), &Phase::Succeeded);
}

#[test]
fn never_more_than_one_render_outstanding() {
    let urls: Vec<String> = (0..6).map(|i| format!("/p{i}")).collect();
    let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    let mut state = state_for(&refs);
    let mut outstanding = 0usize;
    let mut dispatched = Vec::new();

    let (next, effects) = update(state, Msg::Start);
    state = next;
    let mut queue = effects;
    while let Some(effect) = queue.pop() {
        match effect {
            Effect::Render { job_id, url } => {
                outstanding += 1;
                assert_eq!(outstanding, 1, "second render dispatched before first finished");
                dispatched.push(url.clone());
                let (next, effects) = update(state, page_ready(job_id, "x", &url));
                state = next;
                queue.extend(effects.into_iter().rev());
            }
            Effect::WriteSnapshot { job_id, file, .. } => {
                outstanding -= 1;
                let (next, effects) = update(state, Msg::SnapshotWritten { job_id, file });
                state = next;
                queue.extend(effects.into_iter().rev());
            }
            Effect::Halt | Effect::Console { .. } => {}
            Effect::Finish(outcome) => {
                assert!(matches!(outcome, Outcome::Success { ref written } if written.len() == 6));
            }
        }
    }
    assert_eq!(dispatched.len(), 6);
    assert_eq!(state.phase(), &Phase::Succeeded);
}

#[test]
fn render_error_aborts_and_stops_dispatching() {
    let state = state_for(&["/a", "/b", "/c"]);
    let (state, _) = update(state, Msg::Start);

    let (state, effects) = update(state, render_error(1, "ReferenceError: x is not defined"));
    assert_eq!(
        effects,
        vec![
            Effect::Halt,
            Effect::Finish(Outcome::Aborted(AbortReason::Render {
                url: "/a".to_string(),
                message: "ReferenceError: x is not defined".to_string(),
                trace: None,
            })),
        ]
    );
    assert!(state.phase().is_terminal());

    // Terminal: late events do nothing.
    let (state, effects) = update(state, page_ready(1, "late", "http://localhost:8080/a"));
    assert!(effects.is_empty());
    let (state, effects) = update(state, Msg::Start);
    assert!(effects.is_empty());
    assert_eq!(state.dispatched(), 1);
}

#[test]
fn events_from_other_runs_or_stale_jobs_are_ignored() {
    let state = state_for(&["/a"]);
    let (state, _) = update(state, Msg::Start);

    let foreign = Msg::Render(RenderEvent {
        run_id: RunId::new("someone-else"),
        job_id: 1,
        kind: RenderEventKind::Error {
            message: "boom".to_string(),
            trace: None,
        },
    });
    let (state, effects) = update(state, foreign);
    assert!(effects.is_empty());

    let (state, effects) = update(state, page_ready(99, "x", "http://localhost:8080/a"));
    assert!(effects.is_empty());
    assert!(matches!(state.phase(), Phase::Dispatched(job) if job.job_id == 1));
}

#[test]
fn last_job_is_detected_by_position_not_value() {
    // Both entries reduce to the same relative path.
    let state = state_for(&["/dup", "/dup"]);
    let (state, _) = update(state, Msg::Start);
    let (state, _) = update(state, page_ready(1, "one", "http://localhost:8080/dup"));
    let (state, effects) = update(
        state,
        Msg::SnapshotWritten {
            job_id: 1,
            file: "snapshot__dup.html".to_string(),
        },
    );
    assert!(matches!(effects.as_slice(), [Effect::Render { job_id: 2, .. }]));
    assert!(!state.phase().is_terminal());
}

#[test]
fn empty_url_list_succeeds_immediately() {
    let (state, effects) = update(state_for(&[]), Msg::Start);
    assert_eq!(
        effects,
        vec![Effect::Finish(Outcome::Success {
            written: Vec::new()
        })]
    );
    assert_eq!(state.phase(), &Phase::Succeeded);
}

#[test]
fn write_failure_aborts_run() {
    let state = state_for(&["/a", "/b"]);
    let (state, _) = update(state, Msg::Start);
    let (state, _) = update(state, page_ready(1, "x", "http://localhost:8080/a"));
    let (state, effects) = update(
        state,
        Msg::SnapshotFailed {
            job_id: 1,
            file: "snapshot__a.html".to_string(),
            message: "permission denied".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::Finish(Outcome::Aborted(AbortReason::Persist {
            file: "snapshot__a.html".to_string(),
            message: "permission denied".to_string(),
        }))]
    );
    assert!(state.phase().is_terminal());
}

#[test]
fn console_lines_for_current_job_are_forwarded() {
    let state = state_for(&["/a"]);
    let (state, _) = update(state, Msg::Start);
    let console = Msg::Render(RenderEvent {
        run_id: run_id(),
        job_id: 1,
        kind: RenderEventKind::Console("hello from page".to_string()),
    });
    let (_state, effects) = update(state, console);
    assert_eq!(
        effects,
        vec![Effect::Console {
            job_id: 1,
            line: "hello from page".to_string()
        }]
    );
}

#[test]
fn page_markup_goes_through_transform_chain() {
    let settings = PipelineSettings {
        site_path: String::new(),
        naming: SnapshotNaming::new("out/", "page_"),
        transform: TransformChain::new()
            .remove_scripts(true)
            .replace(ReplaceRule::new("foo", "bar").unwrap()),
    };
    let state = PipelineState::new(run_id(), vec!["/#!/home".to_string()], settings);
    let (state, _) = update(state, Msg::Start);
    let (_state, effects) = update(
        state,
        page_ready(1, "<script>x()</script>foo foo", "/#!/home"),
    );
    assert_eq!(
        effects[0],
        Effect::WriteSnapshot {
            job_id: 1,
            file: "out/page_____home.html".to_string(),
            content: "bar bar".to_string(),
        }
    );
}

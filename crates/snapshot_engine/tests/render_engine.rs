use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use snapshot_core::{RenderEvent, RenderEventKind, RunId};
use snapshot_engine::{
    Cookie, HttpRenderService, RenderEngine, RenderFailure, RenderOptions, RenderRequest,
    RenderedPage, Renderer,
};
use tokio::sync::broadcast;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders after a short delay and tracks how many renders overlap.
#[derive(Default)]
struct SlowRenderer {
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[async_trait::async_trait]
impl Renderer for SlowRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, RenderFailure> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        if request.url.contains("fail") {
            return Err(RenderFailure {
                message: "TypeError: undefined".to_string(),
                trace: Some("at app.js:1".to_string()),
            });
        }
        Ok(RenderedPage {
            html: format!("<html>{}</html>", request.url),
            url: request.url.clone(),
            console: vec!["booted".to_string()],
        })
    }
}

struct PanickingRenderer;

#[async_trait::async_trait]
impl Renderer for PanickingRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, RenderFailure> {
        panic!("renderer crashed on {}", request.url);
    }
}

fn request(run: &str, job_id: u64, url: &str) -> RenderRequest {
    RenderRequest {
        run_id: RunId::new(run),
        job_id,
        url: url.to_string(),
        options: RenderOptions::default(),
    }
}

async fn next_event(events: &mut broadcast::Receiver<RenderEvent>) -> RenderEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event before timeout")
        .expect("bus open")
}

#[tokio::test]
async fn events_are_tagged_with_run_and_job() {
    let engine = RenderEngine::spawn(Arc::new(SlowRenderer::default()));
    let mut events = engine.subscribe();

    engine.render(request("run-1", 7, "http://site/a"));
    let console = next_event(&mut events).await;
    assert_eq!(console.kind, RenderEventKind::Console("booted".to_string()));
    let ready = next_event(&mut events).await;
    assert_eq!(ready.run_id, RunId::new("run-1"));
    assert_eq!(ready.job_id, 7);
    assert_eq!(
        ready.kind,
        RenderEventKind::PageReady {
            html: "<html>http://site/a</html>".to_string(),
            url: "http://site/a".to_string(),
        }
    );
}

#[tokio::test]
async fn failures_become_error_events() {
    let engine = RenderEngine::spawn(Arc::new(SlowRenderer::default()));
    let mut events = engine.subscribe();

    engine.render(request("run-1", 1, "http://site/fail"));
    let event = next_event(&mut events).await;
    assert_eq!(
        event.kind,
        RenderEventKind::Error {
            message: "TypeError: undefined".to_string(),
            trace: Some("at app.js:1".to_string()),
        }
    );
}

#[tokio::test]
async fn renderer_panic_becomes_error_event() {
    let engine = RenderEngine::spawn(Arc::new(PanickingRenderer));
    let mut events = engine.subscribe();

    engine.render(request("run-1", 3, "http://site/a"));
    let event = next_event(&mut events).await;
    assert_eq!(event.run_id, RunId::new("run-1"));
    assert_eq!(event.job_id, 3);
    assert_eq!(
        event.kind,
        RenderEventKind::Error {
            message: "renderer panicked: renderer crashed on http://site/a".to_string(),
            trace: None,
        }
    );

    // The engine keeps serving after the slot is released.
    engine.halt();
    engine.render(request("run-1", 4, "http://site/b"));
    assert_eq!(next_event(&mut events).await.job_id, 4);
}

#[tokio::test]
async fn second_request_waits_for_halt() {
    let renderer = Arc::new(SlowRenderer::default());
    let engine = RenderEngine::spawn(renderer.clone());
    let mut events = engine.subscribe();

    engine.render(request("run-1", 1, "http://site/a"));
    engine.render(request("run-1", 2, "http://site/b"));

    let mut ready = Vec::new();
    while ready.is_empty() {
        let event = next_event(&mut events).await;
        if let RenderEventKind::PageReady { .. } = event.kind {
            ready.push(event.job_id);
        }
    }
    assert_eq!(ready, vec![1]);
    assert!(engine.is_busy());

    // Without a halt the second job never starts.
    let idle = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
    assert!(idle.is_err());

    engine.halt();
    loop {
        let event = next_event(&mut events).await;
        if let RenderEventKind::PageReady { .. } = event.kind {
            assert_eq!(event.job_id, 2);
            break;
        }
    }
    assert_eq!(renderer.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn http_render_service_posts_request_and_reads_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .and(body_json(serde_json::json!({
            "url": "http://site/a",
            "waitMs": 500,
            "bodyAttr": "data-snapshot",
            "cookies": [{"name": "session", "value": "abc"}],
            "runId": "run-9",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "html": "<html><body data-snapshot>hi</body></html>",
            "url": "http://site/a",
        })))
        .mount(&server)
        .await;

    let service =
        HttpRenderService::new(format!("{}/render", server.uri()), Duration::from_secs(5))
            .unwrap();
    let mut req = request("run-9", 1, "http://site/a");
    req.options.body_attr = Some("data-snapshot".to_string());
    req.options.cookies = vec![Cookie {
        name: "session".to_string(),
        value: "abc".to_string(),
        domain: None,
        path: None,
    }];

    let page = service.render(&req).await.unwrap();
    assert_eq!(page.html, "<html><body data-snapshot>hi</body></html>");
    assert!(page.console.is_empty());
}

#[tokio::test]
async fn http_render_service_reports_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(502).set_body_json(serde_json::json!({
            "message": "page crashed",
            "trace": "at main.js:10",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let service =
        HttpRenderService::new(format!("{}/render", server.uri()), Duration::from_secs(5))
            .unwrap();
    let failure = service.render(&request("r", 1, "http://site/a")).await.unwrap_err();
    assert_eq!(failure.message, "page crashed");
    assert_eq!(failure.trace.as_deref(), Some("at main.js:10"));

    let plain =
        HttpRenderService::new(format!("{}/plain", server.uri()), Duration::from_secs(5))
            .unwrap();
    let failure = plain.render(&request("r", 1, "http://site/a")).await.unwrap_err();
    assert!(failure.message.contains("500"));
}

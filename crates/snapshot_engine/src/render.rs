use std::time::Duration;

use serde::{Deserialize, Serialize};
use snapshot_core::{JobId, RunId};

/// Cookie handed to the rendering engine before the page loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Options passed through to the rendering engine on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// How long the page is given to settle after load.
    pub wait_for_page: Duration,
    /// Attribute stamped on the rendered `<body>`.
    pub body_attr: Option<String>,
    pub cookies: Vec<Cookie>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            wait_for_page: Duration::from_millis(500),
            body_attr: None,
            cookies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub run_id: RunId,
    pub job_id: JobId,
    pub url: String,
    pub options: RenderOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenderedPage {
    pub html: String,
    /// URL the engine ended up on, after any client-side redirects.
    pub url: String,
    /// Console output captured while the page rendered.
    #[serde(default)]
    pub console: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RenderFailure {
    pub message: String,
    #[serde(default)]
    pub trace: Option<String>,
}

impl RenderFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: None,
        }
    }
}

/// External browser-rendering collaborator: loads a URL, runs its scripts, returns the markup.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, RenderFailure>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceRequest<'a> {
    url: &'a str,
    wait_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    body_attr: Option<&'a str>,
    cookies: &'a [Cookie],
    run_id: &'a str,
}

/// Renderer backed by an HTTP rendering service.
///
/// Each request is a JSON `POST` to `endpoint`. A success reply carries
/// `{"html", "url", "console"}`; any other status carries `{"message", "trace"}`.
#[derive(Debug, Clone)]
pub struct HttpRenderService {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRenderService {
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self, RenderFailure> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| RenderFailure::new(err.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl Renderer for HttpRenderService {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, RenderFailure> {
        let body = ServiceRequest {
            url: &request.url,
            wait_ms: request.options.wait_for_page.as_millis() as u64,
            body_attr: request.options.body_attr.as_deref(),
            cookies: &request.options.cookies,
            run_id: request.run_id.as_str(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| RenderFailure::new(format!("render service unreachable: {err}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| RenderFailure::new(err.to_string()))?;

        if !status.is_success() {
            return Err(serde_json::from_str::<RenderFailure>(&text)
                .unwrap_or_else(|_| RenderFailure::new(format!("render service returned {status}"))));
        }

        serde_json::from_str(&text)
            .map_err(|err| RenderFailure::new(format!("invalid render service reply: {err}")))
    }
}

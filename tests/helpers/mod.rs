//! Test helpers: a scripted stub transport and shared fixtures.

// Not every test binary exercises every helper.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use portrait_pipeline::config::PipelineConfig;
use portrait_pipeline::models::photo::Photo;
use portrait_pipeline::models::template::Template;
use portrait_pipeline::services::transport::{
    ApiRequest, ApiResponse, HttpMethod, HttpTransport, TransportError,
};

/// One scripted outcome for a matched request.
#[derive(Debug, Clone)]
pub enum StubOutcome {
    Respond(ApiResponse),
    /// Surface a transport-level failure.
    Fail(String),
}

struct Route {
    method: HttpMethod,
    url_fragment: String,
    /// Optional additional match on the rendered request body, used to tell
    /// per-template generation submissions apart.
    body_fragment: Option<String>,
    responses: VecDeque<StubOutcome>,
}

/// Scripted in-memory transport.
///
/// Requests are matched against registered routes by method, URL fragment
/// and (optionally) a body fragment; each match pops the next scripted
/// outcome. The last outcome on a route is sticky and keeps answering, so a
/// "never reaches a terminal state" polling fixture is a single entry.
/// Unmatched requests panic: the script is the test's contract.
pub struct StubTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<(HttpMethod, String)>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn on(&self, method: HttpMethod, url_fragment: &str, responses: Vec<StubOutcome>) {
        self.routes.lock().unwrap().push(Route {
            method,
            url_fragment: url_fragment.to_string(),
            body_fragment: None,
            responses: responses.into(),
        });
    }

    pub fn on_body(
        &self,
        method: HttpMethod,
        url_fragment: &str,
        body_fragment: &str,
        responses: Vec<StubOutcome>,
    ) {
        self.routes.lock().unwrap().push(Route {
            method,
            url_fragment: url_fragment.to_string(),
            body_fragment: Some(body_fragment.to_string()),
            responses: responses.into(),
        });
    }

    /// Total number of requests executed, across all routes.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of requests whose URL contains `url_fragment`.
    pub fn calls_to(&self, url_fragment: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, url)| url.contains(url_fragment))
            .count()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.method, request.url.clone()));

        let body = request.body_text();
        let mut routes = self.routes.lock().unwrap();
        let route = routes.iter_mut().find(|route| {
            route.method == request.method
                && request.url.contains(&route.url_fragment)
                && route
                    .body_fragment
                    .as_ref()
                    .map_or(true, |fragment| body.contains(fragment.as_str()))
        });

        let outcome = match route {
            Some(route) if route.responses.len() > 1 => {
                route.responses.pop_front().expect("non-empty queue")
            }
            Some(route) => route
                .responses
                .front()
                .cloned()
                .unwrap_or_else(|| panic!("route {} has no scripted responses", route.url_fragment)),
            None => panic!(
                "unexpected request: {:?} {} (body: {})",
                request.method, request.url, body
            ),
        };

        match outcome {
            StubOutcome::Respond(response) => Ok(response),
            StubOutcome::Fail(message) => Err(TransportError::Connection(message)),
        }
    }
}

// ── Response fixtures ────────────────────────────────────────────────

pub fn ok_json(value: serde_json::Value) -> StubOutcome {
    status_json(200, value)
}

pub fn status_json(status: u16, value: serde_json::Value) -> StubOutcome {
    StubOutcome::Respond(ApiResponse::new(
        status,
        serde_json::to_vec(&value).expect("serializable fixture"),
    ))
}

pub fn upload_ok(file_id: &str) -> StubOutcome {
    ok_json(json!({"data": {"uploaded_files": [{"file_id": file_id}]}}))
}

pub fn fine_tune_created(job_id: &str) -> StubOutcome {
    ok_json(json!({"output": {"job_id": job_id}}))
}

pub fn job_running() -> StubOutcome {
    ok_json(json!({"output": {"status": "RUNNING"}}))
}

pub fn job_succeeded(resource_id: &str) -> StubOutcome {
    ok_json(json!({"output": {"status": "SUCCEEDED", "finetuned_output": resource_id}}))
}

pub fn task_running() -> StubOutcome {
    ok_json(json!({"output": {"task_status": "RUNNING"}}))
}

pub fn task_succeeded(urls: &[&str]) -> StubOutcome {
    let results: Vec<_> = urls.iter().map(|url| json!({"url": url})).collect();
    ok_json(json!({"output": {"status": "SUCCEEDED", "results": results}}))
}

pub fn generation_sync(urls: &[&str]) -> StubOutcome {
    let results: Vec<_> = urls.iter().map(|url| json!({"url": url})).collect();
    ok_json(json!({"output": {"results": results}}))
}

pub fn generation_queued(task_id: &str) -> StubOutcome {
    ok_json(json!({"output": {"task_id": task_id}}))
}

pub fn generation_failed(message: &str) -> StubOutcome {
    ok_json(json!({"output": {"status": "FAILED", "error_msg": message}}))
}

/// Script the full happy-path provisioning exchange on `stub`.
pub fn script_provisioning(stub: &StubTransport, resource_id: &str) {
    stub.on(HttpMethod::Post, "/files", vec![upload_ok("file-1")]);
    stub.on(HttpMethod::Post, "/fine-tunes", vec![fine_tune_created("ft-job-1")]);
    stub.on(
        HttpMethod::Get,
        "/fine-tunes/ft-job-1",
        vec![job_running(), job_succeeded(resource_id)],
    );
}

// ── Input fixtures ───────────────────────────────────────────────────

pub fn test_config() -> PipelineConfig {
    PipelineConfig::with_api_key("sk-test")
}

pub fn sample_photos() -> Vec<Photo> {
    vec![Photo::new("p1", b"jpeg bytes".to_vec())]
}

pub fn template(id: &str, style_code: &str) -> Template {
    Template::new(id, format!("Template {id}"), style_code)
}

/// Initialize test logging once; respects `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .try_init();
}

//! Shared fixtures: an in-memory transport and a wired application state
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_models::models::User;
use async_trait::async_trait;
use cicd_console::app::options::AppOptions;
use cicd_console::app::state::AppState;
use cicd_console::errors::ConsoleError;
use cicd_console::http::client::{ApiRequest, HttpClient, RawResponse, Transport};
use cicd_console::storage::layout::StorageLayout;
use cicd_console::storage::session::{save_session, PersistedSession};
use http::{Method, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const TOKEN: &str = "token-abc";

#[derive(Debug, Clone)]
struct Reply {
    status: u16,
    body: String,
    delay: Duration,
}

/// A request as the transport saw it
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

type Route = (Method, String);

/// Transport answering from canned replies and recording every call
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<Route, Reply>>,
    queued: Mutex<HashMap<Route, VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    /// Answer every request to `path` with this reply
    pub fn reply(&self, method: Method, path: &str, status: u16, body: Value) {
        self.routes.lock().unwrap().insert(
            (method, path.to_string()),
            Reply {
                status,
                body: body.to_string(),
                delay: Duration::ZERO,
            },
        );
    }

    /// Answer every request to `path` with a raw body
    pub fn reply_raw(&self, method: Method, path: &str, status: u16, body: &str) {
        self.routes.lock().unwrap().insert(
            (method, path.to_string()),
            Reply {
                status,
                body: body.to_string(),
                delay: Duration::ZERO,
            },
        );
    }

    /// Answer the next request to `path` with this reply after `delay`; takes
    /// precedence over [`FakeTransport::reply`]
    pub fn reply_once(&self, method: Method, path: &str, status: u16, body: Value, delay: Duration) {
        self.queued
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(Reply {
                status,
                body: body.to_string(),
                delay,
            });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method && call.path == path)
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<RawResponse, ConsoleError> {
        self.calls.lock().unwrap().push(Call {
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            bearer: bearer.map(str::to_string),
            body: request.body.clone(),
        });

        let route = (request.method.clone(), request.path.clone());
        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&route)
            .and_then(VecDeque::pop_front);
        let reply = queued
            .or_else(|| self.routes.lock().unwrap().get(&route).cloned())
            .unwrap_or(Reply {
                status: 404,
                body: json!({ "error": "Not found" }).to_string(),
                delay: Duration::ZERO,
            });

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        Ok(RawResponse {
            status: StatusCode::from_u16(reply.status).unwrap(),
            body: reply.body,
        })
    }
}

/// Application state over a [`FakeTransport`] with storage in a temp dir
pub struct Harness {
    pub transport: Arc<FakeTransport>,
    pub state: AppState,
    pub dir: TempDir,
}

impl Harness {
    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(self.dir.path())
    }

    pub fn session_file_exists(&self) -> bool {
        self.layout().session_file().path().exists()
    }
}

pub fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(FakeTransport::default());
    let state = state_over(&dir, transport.clone());

    Harness {
        transport,
        state,
        dir,
    }
}

fn state_over(dir: &TempDir, transport: Arc<dyn Transport>) -> AppState {
    let options = AppOptions {
        layout: StorageLayout::new(dir.path()),
        ..Default::default()
    };
    AppState::with_transport(options, transport)
}

async fn restore_saved_session(dir: &TempDir, state: &AppState) {
    save_session(
        &StorageLayout::new(dir.path()).session_file(),
        &PersistedSession {
            token: TOKEN.to_string(),
            user: user("alice"),
        },
    )
    .await
    .unwrap();
    state.session.restore().await;
}

/// Harness whose session was persisted by an earlier run and restored
pub async fn logged_in() -> Harness {
    let harness = harness();
    restore_saved_session(&harness.dir, &harness.state).await;
    harness
}

/// Logged-in application state talking to a real backend at `base_url`
pub async fn logged_in_over_http(base_url: &str) -> (AppState, TempDir) {
    let dir = TempDir::new().unwrap();
    let client = HttpClient::new(base_url).unwrap();
    let state = state_over(&dir, Arc::new(client));
    restore_saved_session(&dir, &state).await;
    (state, dir)
}

/// Serve one canned raw HTTP response per accepted connection, in order;
/// returns the base url of the listener
pub async fn serve_raw(responses: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for response in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{}/api/v1", addr)
}

pub fn user(username: &str) -> User {
    User {
        id: 1,
        username: username.to_string(),
        email: format!("{}@example.com", username),
        role: "developer".to_string(),
        ..Default::default()
    }
}

pub fn build_json(id: u64, status: &str, branch: &str, tag: &str, pipeline: &str) -> Value {
    json!({
        "id": id,
        "pipeline_id": 1,
        "commit_hash": "0123456789abcdef",
        "branch": branch,
        "tag": tag,
        "status": status,
        "image_name": "registry.local/app",
        "image_tag": format!("b{}", id),
        "created_at": "2024-05-01T12:00:00Z",
        "updated_at": "2024-05-01T12:00:00Z",
        "pipeline": { "id": 1, "name": pipeline, "project_id": 1 }
    })
}

pub fn deployment_json(id: u64, status: &str, environment: &str, service: &str) -> Value {
    json!({
        "id": id,
        "build_id": 1,
        "environment": environment,
        "status": status,
        "replicas": 2,
        "namespace": "apps",
        "service_name": service,
        "ingress_host": "",
        "created_at": "2024-05-01T12:00:00Z",
        "updated_at": "2024-05-01T12:00:00Z"
    })
}

pub fn builds_body(builds: Vec<Value>) -> Value {
    json!({ "message": "ok", "builds": builds })
}

pub fn deployments_body(deployments: Vec<Value>) -> Value {
    json!({ "message": "ok", "deployments": deployments })
}

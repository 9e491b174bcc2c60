//! Local HTTP stand-ins for the token, media-list and CDN endpoints.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use parking_lot::Mutex;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct StubResponse {
    status: u16,
    content_type: String,
    body: Vec<u8>,
}

impl StubResponse {
    pub fn json(value: serde_json::Value) -> Self {
        Self::json_status(200, value)
    }

    pub fn json_status(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: value.to_string().into_bytes(),
        }
    }

    pub fn bytes(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            body,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

struct StubState {
    routes: HashMap<String, StubResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct StubServer {
    base: Url,
    state: Arc<StubState>,
}

impl StubServer {
    pub fn base_url(&self) -> String {
        self.base.as_str().trim_end_matches('/').to_string()
    }

    pub fn url(&self, path: &str) -> Url {
        self.base.join(path).expect("stub path joins onto base url")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

async fn handle(State(state): State<Arc<StubState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    let headers = parts
        .headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
        .collect();
    state.requests.lock().push(RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    match state.routes.get(parts.uri.path()) {
        Some(stub) => Response::builder()
            .status(stub.status)
            .header(header::CONTENT_TYPE, stub.content_type.as_str())
            .body(Body::from(stub.body.clone()))
            .expect("stub response builds"),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start a server on an ephemeral loopback port answering `routes` by path.
/// Unknown paths get 404.
pub async fn serve(routes: Vec<(&str, StubResponse)>) -> StubServer {
    let state = Arc::new(StubState {
        routes: routes
            .into_iter()
            .map(|(path, response)| (path.to_string(), response))
            .collect(),
        requests: Mutex::new(Vec::new()),
    });
    let app = Router::new().fallback(handle).with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    StubServer {
        base: Url::parse(&format!("http://{addr}/")).expect("loopback url"),
        state,
    }
}

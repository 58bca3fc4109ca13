use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::json;
use shared::protocol::DomainEvent;
use tokio::{net::TcpListener, sync::mpsc};

use crate::config::BridgeSettings;

pub(crate) const TEST_USER: &str = "urn:li:fsd_profile:ACoAAme";
pub(crate) const TEST_COOKIES: &str = "li_at=session-token; JSESSIONID=\"ajax:csrf123\"";

pub(crate) const MESSAGING_PAGE: &str = r#"<html><head>
<meta name="serviceVersion" content="1.13.12345">
<meta name="clientPageInstanceId" content="f00d">
<meta name="i18nLocale" content="en_US">
</head><body><code>{"entityUrn":"urn:li:fsd_profile:ACoAAme-sub0"}</code></body></html>"#;

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or_default()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is json")
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MockResponse {
    pub status: StatusCode,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn status(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("valid status"),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::status(200).with_body(value.to_string())
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync>;

#[derive(Clone)]
struct MockState {
    requests: Arc<StdMutex<Vec<RecordedRequest>>>,
    responder: Responder,
}

/// Catch-all Voyager stand-in that records every request.
pub(crate) struct MockServer {
    pub url: String,
    requests: Arc<StdMutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: body.to_vec(),
    };
    state
        .requests
        .lock()
        .expect("requests lock")
        .push(request.clone());
    let planned = (state.responder)(&request);
    let mut response = (planned.status, planned.body).into_response();
    for (name, value) in planned.headers {
        response
            .headers_mut()
            .append(name, value.parse().expect("header value"));
    }
    response
}

pub(crate) async fn spawn_mock<F>(responder: F) -> MockServer
where
    F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
{
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("mock server addr");
    let requests = Arc::new(StdMutex::new(Vec::new()));
    let state = MockState {
        requests: Arc::clone(&requests),
        responder: Arc::new(responder),
    };
    let app = Router::new().fallback(handle).with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    MockServer {
        url: format!("http://{addr}"),
        requests,
    }
}

/// Answers the page load and profile calls every session starts with.
pub(crate) fn session_response(request: &RecordedRequest) -> Option<MockResponse> {
    match request.path.as_str() {
        "/messaging" => Some(MockResponse::status(200).with_body(MESSAGING_PAGE)),
        "/voyager/api/me" => Some(MockResponse::json(json!({
            "plainId": 7,
            "miniProfile": {"firstName": "Ada", "lastName": "Lovelace"}
        }))),
        _ => None,
    }
}

/// Settings pointed at `base_url` with millisecond retries and a reconnect
/// backoff long enough that no reconnect happens during a test.
pub(crate) fn test_settings(base_url: &str) -> BridgeSettings {
    BridgeSettings {
        base_url: base_url.to_string(),
        request_timeout_secs: 5,
        retry_backoff_millis: 1,
        reconnect_backoff_millis: 60_000,
        ..BridgeSettings::default()
    }
}

/// Receives events until `done` holds for everything received so far.
pub(crate) async fn collect_until(
    events: &mut mpsc::UnboundedReceiver<DomainEvent>,
    done: impl Fn(&[DomainEvent]) -> bool,
) -> Vec<DomainEvent> {
    let mut received = Vec::new();
    while !done(&received) {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for events, got {received:?}"))
            .expect("event channel open");
        received.push(event);
    }
    received
}

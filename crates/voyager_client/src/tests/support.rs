use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;

use crate::{ClientOptions, CookieJar, PageMetadata, VoyagerClient};

pub(crate) const TEST_USER: &str = "urn:li:fsd_profile:ACoAAme";
pub(crate) const TEST_COOKIES: &str = "li_at=session-token; JSESSIONID=\"ajax:csrf123\"";

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

type Responder = Arc<dyn Fn(&RecordedRequest, usize) -> MockResponse + Send + Sync>;

#[derive(Clone)]
struct MockState {
    requests: Arc<StdMutex<Vec<RecordedRequest>>>,
    responder: Responder,
}

/// Catch-all HTTP server that records every request and answers through
/// `responder(request, zero_based_index)`.
pub(crate) struct MockServer {
    pub url: String,
    requests: Arc<StdMutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
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
    let index = {
        let mut requests = state.requests.lock().expect("requests lock");
        requests.push(request.clone());
        requests.len() - 1
    };
    let planned = (state.responder)(&request, index);
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
    F: Fn(&RecordedRequest, usize) -> MockResponse + Send + Sync + 'static,
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

pub(crate) fn test_page_metadata() -> PageMetadata {
    PageMetadata {
        current_user_id: TEST_USER.to_string(),
        service_version: "1.13.9999".to_string(),
        page_instance: "urn:li:page:messaging_index;abc".to_string(),
        locale: "en_US".to_string(),
        device_track_header: r#"{"clientVersion":"1.13.9999"}"#.to_string(),
    }
}

/// Client pointed at `base_url` with a logged-in session and millisecond
/// retry backoff.
pub(crate) fn test_client(base_url: &str) -> Arc<VoyagerClient> {
    let client = VoyagerClient::new(
        CookieJar::from_cookie_string(TEST_COOKIES),
        ClientOptions {
            base_url: base_url.to_string(),
            proxy: None,
            request_timeout: Duration::from_secs(5),
            retry_backoff_unit: Duration::from_millis(1),
        },
    )
    .expect("build client");
    client.set_page_metadata(test_page_metadata());
    client
}

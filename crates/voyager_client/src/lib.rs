use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use reqwest::{redirect, Client, Proxy};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub mod cookies;
pub mod error;
pub mod event;
pub mod headers;
mod media;
mod messaging;
pub mod page_loader;
mod realtime;
pub mod routing;
pub mod transport;
pub mod types;

pub use cookies::CookieJar;
pub use error::VoyagerError;
pub use event::{ClientEvent, ConnectionClosedReason, StreamExit};
pub use media::MAX_UPLOAD_BYTES;
pub use messaging::THREADS_PAGE_SIZE;
pub use page_loader::PageMetadata;
pub use realtime::StreamCompletion;

use realtime::RealtimeState;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub proxy: Option<String>,
    pub request_timeout: Duration,
    pub retry_backoff_unit: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: types::BASE_URL.to_string(),
            proxy: None,
            request_timeout: Duration::from_secs(60),
            retry_backoff_unit: Duration::from_secs(3),
        }
    }
}

pub struct VoyagerClient {
    http: Client,
    stream_http: Client,
    base_url: String,
    retry_backoff_unit: Duration,
    cookies: CookieJar,
    page: RwLock<Option<PageMetadata>>,
    realtime: Mutex<RealtimeState>,
    events: broadcast::Sender<ClientEvent>,
    shutdown: CancellationToken,
}

impl VoyagerClient {
    pub fn new(cookies: CookieJar, options: ClientOptions) -> Result<Arc<Self>, VoyagerError> {
        let proxy = match &options.proxy {
            Some(proxy_url) => {
                debug!(proxy = %proxy_url, "client: using proxy");
                Some(Proxy::all(proxy_url.as_str()).map_err(VoyagerError::ClientBuild)?)
            }
            None => None,
        };

        let mut http = Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(options.request_timeout);
        // The stream stays open indefinitely, so it gets no total timeout.
        let mut stream_http = Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT);
        if let Some(proxy) = proxy {
            http = http.proxy(proxy.clone());
            stream_http = stream_http.proxy(proxy);
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Arc::new(Self {
            http: http.build().map_err(VoyagerError::ClientBuild)?,
            stream_http: stream_http.build().map_err(VoyagerError::ClientBuild)?,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            retry_backoff_unit: options.retry_backoff_unit,
            cookies,
            page: RwLock::new(None),
            realtime: Mutex::new(RealtimeState::new()),
            events,
            shutdown: CancellationToken::new(),
        }))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn cookie_string(&self) -> String {
        self.cookies.serialize()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn page_metadata(&self) -> Option<PageMetadata> {
        self.page
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_page_metadata(&self, metadata: PageMetadata) {
        *self
            .page
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(metadata);
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.page_metadata()
            .map(|page| page.current_user_id)
            .filter(|id| !id.is_empty())
    }

    pub(crate) fn require_user_id(&self) -> Result<String, VoyagerError> {
        self.current_user_id()
            .ok_or(VoyagerError::CurrentUserIdNotFound)
    }

    /// Aborts retry backoffs and the realtime read loop for good.
    pub fn shutdown(&self) {
        info!("client: shutting down");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }
}

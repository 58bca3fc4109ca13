use std::time::Instant;

use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, LOCATION},
    Method, StatusCode,
};
use tracing::{debug, error, warn};

use crate::{error::VoyagerError, VoyagerClient};

pub const MAX_HTTP_RETRIES: u32 = 5;

#[derive(Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

pub fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), VoyagerError> {
    if status.is_redirection() {
        let location = headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        return Err(VoyagerError::RedirectAttempted { location });
    }
    match status {
        StatusCode::UNAUTHORIZED => return Err(VoyagerError::TokenInvalidated),
        StatusCode::FORBIDDEN => {
            let text = String::from_utf8_lossy(body).to_ascii_lowercase();
            if text.contains("challenge") {
                return Err(VoyagerError::ChallengeRequired);
            }
            if text.contains("consent") {
                return Err(VoyagerError::ConsentRequired);
            }
            if text.contains("suspended") || text.contains("restricted") {
                return Err(VoyagerError::AccountSuspended);
            }
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            return Err(VoyagerError::TransientStatus {
                status: status.as_u16(),
            })
        }
        _ => {}
    }
    if status.is_server_error() {
        return Err(VoyagerError::TransientStatus {
            status: status.as_u16(),
        });
    }
    Ok(())
}

impl VoyagerClient {
    /// Sends a request, retrying transient failures with a linear backoff of
    /// `attempt * retry_backoff_unit`. Redirects and permanent failures are
    /// returned on the attempt that produced them.
    pub(crate) async fn send_with_retry(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<Vec<u8>>,
        content_type: Option<&str>,
    ) -> Result<HttpResponse, VoyagerError> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let started = Instant::now();
            let result = self
                .send_once(
                    method.clone(),
                    url,
                    headers.clone(),
                    body.clone(),
                    content_type,
                )
                .await;
            let duration = started.elapsed();

            let err = match result {
                Ok(response) => {
                    debug!(%url, %method, attempt = attempts, ?duration, status = response.status.as_u16(), "http: request successful");
                    return Ok(response);
                }
                Err(err) => err,
            };

            if let VoyagerError::RedirectAttempted { location } = &err {
                warn!(%url, %method, ?location, ?duration, "http: redirect attempted");
                return Err(err);
            }
            if err.is_permanent() {
                error!(%url, %method, ?duration, error = %err, "http: request failed, cannot be retried");
                return Err(err);
            }
            if attempts > MAX_HTTP_RETRIES {
                error!(%url, %method, attempts, ?duration, error = %err, "http: request failed, giving up");
                return Err(VoyagerError::MaxRetriesReached {
                    attempts,
                    source: Box::new(err),
                });
            }

            let delay = self.retry_backoff_unit * attempts;
            warn!(%url, %method, attempt = attempts, ?duration, ?delay, error = %err, "http: request failed, retrying");
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!(%url, "http: retry backoff cancelled");
                    return Err(VoyagerError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        mut headers: HeaderMap,
        body: Option<Vec<u8>>,
        content_type: Option<&str>,
    ) -> Result<HttpResponse, VoyagerError> {
        if let Some(content_type) = content_type {
            let value = HeaderValue::from_str(content_type).map_err(|_| {
                VoyagerError::InvalidHeader {
                    name: CONTENT_TYPE.to_string(),
                }
            })?;
            headers.insert(CONTENT_TYPE, value);
        }

        let mut request = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(VoyagerError::RequestFailed)?;
        self.cookies.update_from_response_headers(response.headers());

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(VoyagerError::ResponseReadFailed)?
            .to_vec();

        classify_status(status, &headers, &body)?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;

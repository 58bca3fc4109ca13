use reqwest::Method;
use tracing::{debug, info};

use crate::{
    error::VoyagerError,
    headers::{HeaderContext, HeaderOpts},
    routing::{
        encode_json,
        payload::{MediaUploadType, UploadMediaMetadataPayload},
        query::Action,
        response::MediaMetadata,
        Endpoint, RouteRequest, UPLOAD_HEADERS,
    },
    VoyagerClient,
};

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const DOWNLOAD_HEADERS: HeaderOpts = HeaderOpts {
    with_csrf_token: false,
    ..UPLOAD_HEADERS
};

impl VoyagerClient {
    pub async fn upload_media(
        &self,
        upload_type: MediaUploadType,
        file_name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<MediaMetadata, VoyagerError> {
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(VoyagerError::MediaTooLarge {
                size: data.len(),
                limit: MAX_UPLOAD_BYTES,
            });
        }

        let payload = UploadMediaMetadataPayload {
            media_upload_type: upload_type,
            file_size: data.len(),
            filename: file_name,
        };
        let response = self
            .request_endpoint(
                Endpoint::MediaUploadMetadata,
                RouteRequest {
                    query: Some(Action::Upload.encode()),
                    body: Some(encode_json(&payload, "upload metadata payload")?),
                    ..RouteRequest::default()
                },
            )
            .await?;
        response.ensure_action_ok("request upload metadata")?;
        let metadata = response.decoded.into_upload_metadata()?.data.value;
        debug!(
            asset_urn = %metadata.urn,
            size = data.len(),
            "media: received upload slot"
        );

        let headers = self.session_headers(&UPLOAD_HEADERS)?;
        let upload = self
            .send_with_retry(
                Method::PUT,
                &metadata.single_upload_url,
                headers,
                Some(data),
                Some(content_type),
            )
            .await?;
        if upload.status.as_u16() > 204 {
            return Err(VoyagerError::ActionFailed {
                action: "upload media",
                status: upload.status.as_u16(),
                body: String::from_utf8_lossy(&upload.body).into_owned(),
            });
        }
        info!(asset_urn = %metadata.urn, %file_name, "media: uploaded");
        Ok(metadata)
    }

    pub async fn download_media(&self, url: &str) -> Result<Vec<u8>, VoyagerError> {
        let headers = self.session_headers(&DOWNLOAD_HEADERS)?;
        let response = self
            .send_with_retry(Method::GET, url, headers, None, None)
            .await?;
        if !response.status.is_success() {
            return Err(VoyagerError::ActionFailed {
                action: "download media",
                status: response.status.as_u16(),
                body: String::new(),
            });
        }
        debug!(%url, size = response.body.len(), "media: downloaded");
        Ok(response.body)
    }

    fn session_headers(&self, opts: &HeaderOpts) -> Result<reqwest::header::HeaderMap, VoyagerError> {
        let page = self.page_metadata();
        HeaderContext {
            base_url: &self.base_url,
            cookies: &self.cookies,
            page: page.as_ref(),
        }
        .build(opts, &[])
    }
}

#[cfg(test)]
#[path = "tests/media_tests.rs"]
mod tests;

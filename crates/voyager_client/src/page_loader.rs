use regex::Regex;
use tracing::{debug, info};

use crate::{
    error::VoyagerError,
    routing::{Endpoint, RouteRequest},
    types::DeviceTrack,
    VoyagerClient,
};

const PAGE_INSTANCE_PREFIX: &str = "urn:li:page:messaging_index;";
const PROFILE_URN_PATTERN: &str = r"(urn:li:fsd_profile:[A-Za-z0-9]+)-sub0";

#[derive(Debug, Clone, PartialEq)]
pub struct PageMetadata {
    pub current_user_id: String,
    pub service_version: String,
    pub page_instance: String,
    pub locale: String,
    pub device_track_header: String,
}

impl PageMetadata {
    pub fn from_html(html: &str) -> Result<Self, VoyagerError> {
        let current_user_id = parse_profile_urn(html).ok_or(VoyagerError::CurrentUserIdNotFound)?;
        let service_version = parse_meta_tag(html, "serviceVersion").unwrap_or_default();
        let page_instance = format!(
            "{PAGE_INSTANCE_PREFIX}{}",
            parse_meta_tag(html, "clientPageInstanceId").unwrap_or_default()
        );
        let locale = parse_meta_tag(html, "i18nLocale").unwrap_or_default();
        let device_track_header =
            serde_json::to_string(&DeviceTrack::for_service_version(&service_version)).map_err(
                |source| VoyagerError::Encode {
                    what: "device track",
                    source,
                },
            )?;

        Ok(Self {
            current_user_id,
            service_version,
            page_instance,
            locale,
            device_track_header,
        })
    }
}

impl VoyagerClient {
    pub async fn load_messages_page(&self) -> Result<(), VoyagerError> {
        let response = self
            .request_endpoint(Endpoint::MessagingPage, RouteRequest::default())
            .await?;
        let html = String::from_utf8_lossy(&response.body);
        let metadata = PageMetadata::from_html(&html)?;
        info!(
            user_id = %metadata.current_user_id,
            service_version = %metadata.service_version,
            "page: loaded messaging page"
        );
        debug!(page_instance = %metadata.page_instance, locale = %metadata.locale, "page: metadata");
        self.set_page_metadata(metadata);
        Ok(())
    }
}

pub fn parse_meta_tag(html: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r#"<meta\s+name="{}"\s+content="([^"]+)"\s*?>"#,
        regex::escape(name)
    );
    let captures = Regex::new(&pattern).ok()?.captures(html)?;
    Some(captures[1].to_string())
}

/// First `urn:li:fsd_profile:<id>-sub0` marker in the page, without the suffix.
pub fn parse_profile_urn(html: &str) -> Option<String> {
    let captures = Regex::new(PROFILE_URN_PATTERN).ok()?.captures(html)?;
    Some(captures[1].to_string())
}

#[cfg(test)]
#[path = "tests/page_loader_tests.rs"]
mod tests;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::{cookies::CookieJar, error::VoyagerError, page_loader::PageMetadata, types};

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36";
pub const SEC_CH_UA: &str =
    r#""Chromium";v="118", "Google Chrome";v="118", "Not-A.Brand";v="99""#;
pub const SEC_CH_UA_FULL_VERSION_LIST: &str = r#""Chromium";v="118.0.5993.89", "Google Chrome";v="118.0.5993.89", "Not-A.Brand";v="99.0.0.0""#;
pub const SEC_CH_UA_PLATFORM: &str = r#""Linux""#;
pub const SEC_CH_UA_MOBILE: &str = "?0";
pub const SEC_CH_PREFERS_COLOR_SCHEME: &str = "light";

const BASELINE: [(&str, &str); 8] = [
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("user-agent", USER_AGENT),
    ("sec-ch-ua", SEC_CH_UA),
    ("sec-ch-ua-platform", SEC_CH_UA_PLATFORM),
    ("sec-ch-prefers-color-scheme", SEC_CH_PREFERS_COLOR_SCHEME),
    ("sec-ch-ua-full-version-list", SEC_CH_UA_FULL_VERSION_LIST),
    ("sec-ch-ua-mobile", SEC_CH_UA_MOBILE),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderOpts {
    pub with_cookies: bool,
    pub with_csrf_token: bool,
    pub with_device_track: bool,
    pub with_page_instance: bool,
    pub with_protocol_version: bool,
    pub with_lang: bool,
    pub referer: Option<&'static str>,
    pub with_origin: bool,
    pub extra: &'static [(&'static str, &'static str)],
}

pub struct HeaderContext<'a> {
    pub base_url: &'a str,
    pub cookies: &'a CookieJar,
    pub page: Option<&'a PageMetadata>,
}

impl HeaderContext<'_> {
    /// Baseline, then the flagged headers, then `opts.extra`, then `extra`.
    /// Later layers overwrite earlier ones.
    pub fn build(
        &self,
        opts: &HeaderOpts,
        extra: &[(&str, String)],
    ) -> Result<HeaderMap, VoyagerError> {
        let mut headers = HeaderMap::new();
        for (name, value) in BASELINE {
            insert(&mut headers, name, value)?;
        }

        if opts.with_cookies {
            insert(&mut headers, "cookie", &self.cookies.serialize())?;
        }
        if opts.with_csrf_token {
            let csrf = self
                .cookies
                .get(crate::cookies::JSESSIONID)
                .unwrap_or_default();
            insert(&mut headers, "csrf-token", &csrf)?;
        }
        if opts.with_origin {
            insert(&mut headers, "origin", self.base_url)?;
        }
        if let Some(page) = self.page {
            if opts.with_page_instance {
                insert(&mut headers, "x-li-page-instance", &page.page_instance)?;
            }
            if opts.with_lang {
                insert(&mut headers, "x-li-lang", &page.locale)?;
            }
            if opts.with_device_track {
                insert(&mut headers, "x-li-track", &page.device_track_header)?;
            }
        }
        if opts.with_protocol_version {
            insert(
                &mut headers,
                "x-restli-protocol-version",
                types::PROTOCOL_VERSION,
            )?;
        }
        if let Some(path) = opts.referer {
            insert(&mut headers, "referer", &format!("{}{path}", self.base_url))?;
        }

        for (name, value) in opts.extra {
            insert(&mut headers, name, value)?;
        }
        for (name, value) in extra {
            insert(&mut headers, name, value)?;
        }
        Ok(headers)
    }
}

fn insert(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), VoyagerError> {
    let invalid = || VoyagerError::InvalidHeader {
        name: name.to_string(),
    };
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    headers.insert(header_name, header_value);
    Ok(())
}

#[cfg(test)]
#[path = "tests/headers_tests.rs"]
mod tests;

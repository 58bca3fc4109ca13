pub mod payload;
pub mod query;
pub mod response;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::{
    error::VoyagerError,
    headers::{HeaderContext, HeaderOpts},
    types::{
        UserLoginProfile, CONTENT_TYPE_GRAPHQL, CONTENT_TYPE_JSON, CONTENT_TYPE_JSON_UTF8,
        CONTENT_TYPE_NORMALIZED_JSON, CONTENT_TYPE_PLAINTEXT_UTF8,
    },
    VoyagerClient,
};

use self::response::{
    GraphQlResponse, MarkThreadReadResponse, MessageSentResponse, UploadMediaMetadataResponse,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    MessagingPage,
    MessagingGraphQl,
    Messages,
    MessageEdit,
    Conversations,
    ConversationsPatch,
    ConversationDelete,
    MediaUploadMetadata,
    Me,
    Logout,
    RealtimeConnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    None,
    GraphQl,
    MessageSent,
    UploadMetadata,
    Profile,
    MarkRead,
}

#[derive(Debug, Clone)]
pub struct EndpointInfo {
    pub path: &'static str,
    pub method: Method,
    pub headers: HeaderOpts,
    pub content_type: Option<&'static str>,
    pub response: ResponseKind,
}

const MESSAGES_PATH: &str = "/voyager/api/voyagerMessagingDashMessengerMessages";
const CONVERSATIONS_PATH: &str = "/voyager/api/voyagerMessagingDashMessengerConversations";

const NAVIGATION_HEADERS: HeaderOpts = HeaderOpts {
    with_cookies: true,
    with_csrf_token: false,
    with_device_track: false,
    with_page_instance: false,
    with_protocol_version: false,
    with_lang: false,
    referer: None,
    with_origin: false,
    extra: &[
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("sec-fetch-user", "?1"),
        ("upgrade-insecure-requests", "1"),
    ],
};

const GRAPHQL_HEADERS: HeaderOpts = HeaderOpts {
    with_cookies: true,
    with_csrf_token: true,
    with_device_track: true,
    with_page_instance: true,
    with_protocol_version: true,
    with_lang: false,
    referer: Some("/messaging/"),
    with_origin: false,
    extra: &[("accept", CONTENT_TYPE_GRAPHQL)],
};

const ACTION_HEADERS: HeaderOpts = HeaderOpts {
    with_cookies: true,
    with_csrf_token: true,
    with_device_track: true,
    with_page_instance: true,
    with_protocol_version: true,
    with_lang: true,
    referer: None,
    with_origin: true,
    extra: &[("accept", CONTENT_TYPE_JSON)],
};

const SESSION_HEADERS: HeaderOpts = HeaderOpts {
    with_cookies: true,
    with_csrf_token: true,
    with_device_track: true,
    with_page_instance: true,
    with_protocol_version: true,
    with_lang: true,
    referer: None,
    with_origin: false,
    extra: &[],
};

const COOKIE_HEADERS: HeaderOpts = HeaderOpts {
    with_cookies: true,
    with_csrf_token: false,
    with_device_track: false,
    with_page_instance: false,
    with_protocol_version: false,
    with_lang: false,
    referer: None,
    with_origin: false,
    extra: &[],
};

pub(crate) const UPLOAD_HEADERS: HeaderOpts = HeaderOpts {
    with_csrf_token: true,
    ..COOKIE_HEADERS
};

impl Endpoint {
    pub fn info(self) -> EndpointInfo {
        match self {
            Endpoint::MessagingPage => EndpointInfo {
                path: "/messaging",
                method: Method::GET,
                headers: NAVIGATION_HEADERS,
                content_type: None,
                response: ResponseKind::None,
            },
            Endpoint::MessagingGraphQl => EndpointInfo {
                path: "/voyager/api/voyagerMessagingGraphQL/graphql",
                method: Method::GET,
                headers: GRAPHQL_HEADERS,
                content_type: None,
                response: ResponseKind::GraphQl,
            },
            Endpoint::Messages => EndpointInfo {
                path: MESSAGES_PATH,
                method: Method::POST,
                headers: ACTION_HEADERS,
                content_type: Some(CONTENT_TYPE_PLAINTEXT_UTF8),
                response: ResponseKind::MessageSent,
            },
            Endpoint::MessageEdit => EndpointInfo {
                path: MESSAGES_PATH,
                method: Method::POST,
                headers: ACTION_HEADERS,
                content_type: Some(CONTENT_TYPE_PLAINTEXT_UTF8),
                response: ResponseKind::None,
            },
            Endpoint::Conversations => EndpointInfo {
                path: CONVERSATIONS_PATH,
                method: Method::POST,
                headers: ACTION_HEADERS,
                content_type: Some(CONTENT_TYPE_PLAINTEXT_UTF8),
                response: ResponseKind::None,
            },
            Endpoint::ConversationsPatch => EndpointInfo {
                path: CONVERSATIONS_PATH,
                method: Method::POST,
                headers: ACTION_HEADERS,
                content_type: Some(CONTENT_TYPE_PLAINTEXT_UTF8),
                response: ResponseKind::MarkRead,
            },
            Endpoint::ConversationDelete => EndpointInfo {
                path: CONVERSATIONS_PATH,
                method: Method::DELETE,
                headers: HeaderOpts {
                    extra: &[("accept", CONTENT_TYPE_GRAPHQL)],
                    ..ACTION_HEADERS
                },
                content_type: None,
                response: ResponseKind::None,
            },
            Endpoint::MediaUploadMetadata => EndpointInfo {
                path: "/voyager/api/voyagerVideoDashMediaUploadMetadata",
                method: Method::POST,
                headers: HeaderOpts {
                    extra: &[("accept", CONTENT_TYPE_NORMALIZED_JSON)],
                    ..SESSION_HEADERS
                },
                content_type: Some(CONTENT_TYPE_JSON_UTF8),
                response: ResponseKind::UploadMetadata,
            },
            Endpoint::Me => EndpointInfo {
                path: "/voyager/api/me",
                method: Method::GET,
                headers: SESSION_HEADERS,
                content_type: Some(CONTENT_TYPE_NORMALIZED_JSON),
                response: ResponseKind::Profile,
            },
            Endpoint::Logout => EndpointInfo {
                path: "/uas/logout",
                method: Method::GET,
                headers: COOKIE_HEADERS,
                content_type: None,
                response: ResponseKind::None,
            },
            Endpoint::RealtimeConnect => EndpointInfo {
                path: "/realtime/connect",
                method: Method::GET,
                headers: HeaderOpts {
                    with_lang: false,
                    with_origin: false,
                    referer: Some("/messaging/"),
                    extra: &[],
                    ..ACTION_HEADERS
                },
                content_type: None,
                response: ResponseKind::None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedResponse {
    None,
    GraphQl(Box<GraphQlResponse>),
    MessageSent(MessageSentResponse),
    UploadMetadata(UploadMediaMetadataResponse),
    Profile(UserLoginProfile),
    MarkRead(MarkThreadReadResponse),
}

impl DecodedResponse {
    fn decode(kind: ResponseKind, body: &[u8]) -> Result<Self, VoyagerError> {
        Ok(match kind {
            ResponseKind::None => DecodedResponse::None,
            ResponseKind::GraphQl => {
                DecodedResponse::GraphQl(Box::new(decode_json(body, "graphql response")?))
            }
            ResponseKind::MessageSent => {
                DecodedResponse::MessageSent(decode_json(body, "message sent response")?)
            }
            ResponseKind::UploadMetadata => {
                DecodedResponse::UploadMetadata(decode_json(body, "upload metadata response")?)
            }
            ResponseKind::Profile => DecodedResponse::Profile(decode_json(body, "user profile")?),
            ResponseKind::MarkRead => {
                DecodedResponse::MarkRead(decode_json(body, "mark read response")?)
            }
        })
    }

    pub fn into_graphql(self) -> Result<GraphQlResponse, VoyagerError> {
        match self {
            DecodedResponse::GraphQl(response) => Ok(*response),
            _ => Err(VoyagerError::ResponseTypeAssertionFailed {
                expected: "GraphQlResponse",
            }),
        }
    }

    pub fn into_message_sent(self) -> Result<MessageSentResponse, VoyagerError> {
        match self {
            DecodedResponse::MessageSent(response) => Ok(response),
            _ => Err(VoyagerError::ResponseTypeAssertionFailed {
                expected: "MessageSentResponse",
            }),
        }
    }

    pub fn into_upload_metadata(self) -> Result<UploadMediaMetadataResponse, VoyagerError> {
        match self {
            DecodedResponse::UploadMetadata(response) => Ok(response),
            _ => Err(VoyagerError::ResponseTypeAssertionFailed {
                expected: "UploadMediaMetadataResponse",
            }),
        }
    }

    pub fn into_profile(self) -> Result<UserLoginProfile, VoyagerError> {
        match self {
            DecodedResponse::Profile(profile) => Ok(profile),
            _ => Err(VoyagerError::ResponseTypeAssertionFailed {
                expected: "UserLoginProfile",
            }),
        }
    }

    pub fn into_mark_read(self) -> Result<MarkThreadReadResponse, VoyagerError> {
        match self {
            DecodedResponse::MarkRead(response) => Ok(response),
            _ => Err(VoyagerError::ResponseTypeAssertionFailed {
                expected: "MarkThreadReadResponse",
            }),
        }
    }
}

fn decode_json<T: DeserializeOwned>(body: &[u8], what: &'static str) -> Result<T, VoyagerError> {
    serde_json::from_slice(body).map_err(|source| VoyagerError::Decode { what, source })
}

pub(crate) fn encode_json<T: serde::Serialize>(
    value: &T,
    what: &'static str,
) -> Result<Vec<u8>, VoyagerError> {
    serde_json::to_vec(value).map_err(|source| VoyagerError::Encode { what, source })
}

#[derive(Debug, Default)]
pub(crate) struct RouteRequest<'a> {
    pub suffix: Option<&'a str>,
    pub query: Option<String>,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug)]
pub(crate) struct RoutedResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub decoded: DecodedResponse,
}

impl RoutedResponse {
    /// Action endpoints answer 200-204 on success.
    pub fn ensure_action_ok(&self, action: &'static str) -> Result<(), VoyagerError> {
        if self.status.as_u16() > 204 {
            return Err(VoyagerError::ActionFailed {
                action,
                status: self.status.as_u16(),
                body: String::from_utf8_lossy(&self.body).into_owned(),
            });
        }
        Ok(())
    }
}

impl VoyagerClient {
    pub(crate) fn endpoint_url(&self, endpoint: Endpoint, request: &RouteRequest<'_>) -> String {
        let mut url = format!("{}{}", self.base_url, endpoint.info().path);
        if let Some(suffix) = request.suffix {
            url.push('/');
            url.push_str(suffix);
        }
        if let Some(query) = &request.query {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    pub(crate) async fn request_endpoint(
        &self,
        endpoint: Endpoint,
        request: RouteRequest<'_>,
    ) -> Result<RoutedResponse, VoyagerError> {
        let info = endpoint.info();
        let url = self.endpoint_url(endpoint, &request);
        let page = self.page_metadata();
        let headers = HeaderContext {
            base_url: &self.base_url,
            cookies: &self.cookies,
            page: page.as_ref(),
        }
        .build(&info.headers, &[])?;

        let response = self
            .send_with_retry(info.method, &url, headers, request.body, info.content_type)
            .await?;

        let decoded = if response.status.is_success() && !response.body.is_empty() {
            DecodedResponse::decode(info.response, &response.body)?
        } else {
            DecodedResponse::None
        };
        trace!(?endpoint, status = response.status.as_u16(), "routing: response decoded");

        Ok(RoutedResponse {
            status: response.status,
            body: response.body,
            decoded,
        })
    }
}

#[cfg(test)]
#[path = "../tests/routing_tests.rs"]
mod tests;

use super::*;

use serde_json::json;

use crate::test_support::{spawn_mock, test_client, MockResponse};

#[test]
fn graphql_entry_is_a_get_with_graphql_accept() {
    let info = Endpoint::MessagingGraphQl.info();

    assert_eq!(info.method, Method::GET);
    assert_eq!(info.response, ResponseKind::GraphQl);
    assert!(info.headers.with_csrf_token);
    assert_eq!(info.headers.referer, Some("/messaging/"));
    assert_eq!(info.headers.extra, &[("accept", CONTENT_TYPE_GRAPHQL)]);
}

#[test]
fn action_entries_post_plaintext_with_origin() {
    for endpoint in [
        Endpoint::Messages,
        Endpoint::MessageEdit,
        Endpoint::Conversations,
        Endpoint::ConversationsPatch,
    ] {
        let info = endpoint.info();
        assert_eq!(info.method, Method::POST, "{endpoint:?}");
        assert_eq!(info.content_type, Some(CONTENT_TYPE_PLAINTEXT_UTF8));
        assert!(info.headers.with_origin && info.headers.with_lang);
    }
    assert_eq!(Endpoint::ConversationDelete.info().method, Method::DELETE);
}

#[test]
fn decoding_follows_the_registry_entry() {
    let body = json!({"value": {"entityUrn": "urn:li:msg_message:1", "deliveredAt": 5}}).to_string();

    let decoded = DecodedResponse::decode(ResponseKind::MessageSent, body.as_bytes())
        .expect("decode");
    let sent = decoded.clone().into_message_sent().expect("message sent");
    assert_eq!(sent.data.entity_urn, "urn:li:msg_message:1");
    assert_eq!(sent.data.delivered_at, 5);

    let err = decoded.into_graphql().expect_err("wrong shape");
    assert!(matches!(
        err,
        VoyagerError::ResponseTypeAssertionFailed { expected: "GraphQlResponse" }
    ));
}

#[test]
fn malformed_body_is_a_decode_error() {
    let err = DecodedResponse::decode(ResponseKind::Profile, b"<html>").expect_err("not json");
    assert!(matches!(err, VoyagerError::Decode { what: "user profile", .. }));
}

#[test]
fn action_status_above_204_fails() {
    let response = RoutedResponse {
        status: StatusCode::BAD_REQUEST,
        body: b"nope".to_vec(),
        decoded: DecodedResponse::None,
    };
    let err = response.ensure_action_ok("send message").expect_err("400");
    assert!(matches!(
        err,
        VoyagerError::ActionFailed { action: "send message", status: 400, ref body } if body == "nope"
    ));

    let ok = RoutedResponse {
        status: StatusCode::NO_CONTENT,
        body: Vec::new(),
        decoded: DecodedResponse::None,
    };
    assert!(ok.ensure_action_ok("typing").is_ok());
}

#[tokio::test]
async fn request_endpoint_builds_url_and_decodes_profile() {
    let server = spawn_mock(|_, _| {
        MockResponse::json(json!({
            "plainId": 42,
            "miniProfile": {"firstName": "Ada", "lastName": "Lovelace"}
        }))
    })
    .await;
    let client = test_client(&server.url);

    let response = client
        .request_endpoint(
            Endpoint::Me,
            RouteRequest {
                query: Some("a=b".to_string()),
                ..RouteRequest::default()
            },
        )
        .await
        .expect("request");

    let profile = response.decoded.into_profile().expect("profile");
    assert_eq!(profile.plain_id, 42);
    assert_eq!(profile.mini_profile.first_name, "Ada");

    let requests = server.requests();
    assert_eq!(requests[0].path, "/voyager/api/me");
    assert_eq!(requests[0].query.as_deref(), Some("a=b"));
    assert_eq!(requests[0].header("csrf-token"), Some("ajax:csrf123"));
    assert_eq!(
        requests[0].header("content-type"),
        Some(CONTENT_TYPE_NORMALIZED_JSON)
    );
}

#[tokio::test]
async fn non_success_bodies_are_not_decoded() {
    let server = spawn_mock(|_, _| MockResponse::status(400).with_body("{\"oops\":true}")).await;
    let client = test_client(&server.url);

    let response = client
        .request_endpoint(Endpoint::Messages, RouteRequest::default())
        .await
        .expect("request");

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.decoded, DecodedResponse::None);
}

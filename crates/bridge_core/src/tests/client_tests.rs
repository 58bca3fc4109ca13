use super::*;

use std::time::Duration;

use serde_json::{json, Value};
use shared::{
    domain::MessagePart,
    protocol::{CloseReason, DomainEvent, OutgoingKind, OutgoingMedia},
};
use voyager_client::types::{
    CONTENT_TYPE_EVENT_STREAM, EVENT_CLIENT_CONNECTION, EVENT_DECORATED,
    GRAPHQL_MESSAGES_BY_ANCHOR_TIMESTAMP, GRAPHQL_MESSAGES_BY_CONVERSATION,
    GRAPHQL_REACTIONS_FOR_EMOJI,
};

use crate::{
    sink::{ChannelSink, DiscardSink},
    test_support::{
        collect_until, session_response, spawn_mock, test_settings, MockResponse, RecordedRequest,
        TEST_COOKIES, TEST_USER,
    },
};

const ALICE: &str = "urn:li:fsd_profile:ACoAAalice";
const MESSAGES_PATH: &str = "/voyager/api/voyagerMessagingDashMessengerMessages";

fn thread_urn() -> String {
    format!("urn:li:msg_conversation:({TEST_USER},2-abc)")
}

fn message_json(urn: &str, delivered_at: i64, text: &str) -> Value {
    json!({
        "entityUrn": urn,
        "body": {"text": text},
        "deliveredAt": delivered_at,
        "sender": {"hostIdentityUrn": ALICE},
        "conversation": {"entityUrn": thread_urn()},
    })
}

fn realtime_body() -> String {
    let ready = json!({ EVENT_CLIENT_CONNECTION: {} });
    let message = json!({
        EVENT_DECORATED: {
            "topic": "urn:li-realtime:messagesTopic:urn:li-realtime:myself",
            "id": "event-1",
            "payload": {"data": {
                "doDecorateMessageMessengerRealtimeDecoration": {
                    "result": message_json("urn:li:msg_message:live", 3000, "live")
                }
            }}
        }
    });
    format!("data: {ready}\n\ndata: {message}\n\n")
}

fn has_message(events: &[DomainEvent], id: &str) -> bool {
    events
        .iter()
        .any(|event| matches!(event, DomainEvent::Message(remote) if remote.id.as_str() == id))
}

#[test]
fn backfill_cursor_encoding() {
    let server = BackfillCursor::Server("abc".into());
    assert_eq!(server.encode(), "c:abc");
    assert_eq!(BackfillCursor::parse("c:abc"), Some(server));
    assert_eq!(
        BackfillCursor::parse("t:1700000000000"),
        Some(BackfillCursor::Anchor(1_700_000_000_000))
    );
    assert_eq!(BackfillCursor::parse("c:"), None);
    assert_eq!(BackfillCursor::parse("t:soon"), None);
    assert_eq!(BackfillCursor::parse("bogus"), None);
}

#[tokio::test]
async fn login_requires_a_session_cookie() {
    let server = spawn_mock(|_| MockResponse::status(200)).await;

    let err = BridgeClient::login(
        test_settings(&server.url),
        "li_at=session-token",
        Arc::new(DiscardSink),
    )
    .await
    .err()
    .expect("missing session cookie");

    assert_eq!(err.code, ErrorCode::BadCredentials);
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn login_loads_the_page_and_profile() {
    let server = spawn_mock(|request| {
        session_response(request).unwrap_or_else(|| MockResponse::status(404))
    })
    .await;

    let (client, outcome) =
        BridgeClient::login(test_settings(&server.url), TEST_COOKIES, Arc::new(DiscardSink))
            .await
            .expect("login");

    assert_eq!(outcome.user_id.as_str(), TEST_USER);
    assert_eq!(outcome.remote_name, "Ada Lovelace");
    assert!(outcome.metadata.cookies.contains("JSESSIONID"));
    assert!(client.is_logged_in());
    assert_eq!(client.current_user_id(), Some(UserId::new(TEST_USER)));

    let paths: Vec<String> = server
        .requests()
        .into_iter()
        .map(|request| request.path)
        .collect();
    assert_eq!(paths, ["/messaging", "/voyager/api/me"]);
}

#[tokio::test]
async fn connect_streams_events_syncs_threads_and_disconnects() {
    let body = realtime_body();
    let server = spawn_mock(move |request| {
        if let Some(response) = session_response(request) {
            return response;
        }
        match request.path.as_str() {
            "/realtime/connect" => MockResponse::status(200)
                .with_header("content-type", CONTENT_TYPE_EVENT_STREAM)
                .with_body(body.clone()),
            "/voyager/api/voyagerMessagingGraphQL/graphql" => MockResponse::json(json!({
                "data": {"messengerConversationsBySyncToken": {
                    "metadata": {"newSyncToken": "sync-1"},
                    "elements": [{
                        "entityUrn": thread_urn(),
                        "groupChat": false,
                        "lastActivityAt": 1000,
                        "conversationParticipants": [{"hostIdentityUrn": ALICE}],
                        "messages": {"elements": [
                            message_json("urn:li:msg_message:old", 1000, "synced")
                        ]}
                    }]
                }}
            })),
            _ => MockResponse::status(404),
        }
    })
    .await;
    let (sink, mut events) = ChannelSink::new();
    let client = BridgeClient::new(
        test_settings(&server.url),
        &UserLoginMetadata {
            cookies: TEST_COOKIES.into(),
        },
        Arc::new(sink),
    )
    .expect("client");

    client.connect().await.expect("connect");
    let again = client.connect().await.expect_err("second connect");
    assert_eq!(again.code, ErrorCode::Internal);

    let received = collect_until(&mut events, |events| {
        has_message(events, "urn:li:msg_message:live")
            && has_message(events, "urn:li:msg_message:old")
            && events.iter().any(|event| {
                matches!(
                    event,
                    DomainEvent::ConnectionClosed {
                        reason: CloseReason::ConnectionDropped(_)
                    }
                )
            })
    })
    .await;

    assert!(received.contains(&DomainEvent::ConnectionReady));
    let resync_index = received
        .iter()
        .position(|event| matches!(event, DomainEvent::ThreadResync { .. }))
        .expect("thread resync");
    let synced_index = received
        .iter()
        .position(|event| {
            matches!(event, DomainEvent::Message(remote) if remote.id.as_str() == "urn:li:msg_message:old")
        })
        .expect("synced message");
    assert!(resync_index < synced_index);

    let DomainEvent::ThreadResync { portal, info } = &received[resync_index] else {
        unreachable!();
    };
    assert_eq!(portal.receiver, Some(UserId::new(TEST_USER)));
    assert_eq!(info.members.len(), 1);

    client.disconnect().await.expect("disconnect");
    let closed = collect_until(&mut events, |events| !events.is_empty()).await;
    assert_eq!(
        closed,
        vec![DomainEvent::ConnectionClosed {
            reason: CloseReason::SelfDisconnect
        }]
    );

    let err = client.disconnect().await.expect_err("already disconnected");
    assert_eq!(err.code, ErrorCode::NotConnected);
    assert_eq!(server.requests_to("/realtime/connect").len(), 1);
}

fn realtime_server(
    body: String,
) -> impl Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static {
    move |request: &RecordedRequest| {
        if let Some(response) = session_response(request) {
            return response;
        }
        match request.path.as_str() {
            "/realtime/connect" => MockResponse::status(200)
                .with_header("content-type", CONTENT_TYPE_EVENT_STREAM)
                .with_body(body.clone()),
            _ => MockResponse::status(404),
        }
    }
}

fn dropped_count(events: &[DomainEvent]) -> usize {
    events
        .iter()
        .filter(|event| {
            matches!(
                event,
                DomainEvent::ConnectionClosed {
                    reason: CloseReason::ConnectionDropped(_)
                }
            )
        })
        .count()
}

#[tokio::test]
async fn unconfirmed_streams_stop_reconnecting_after_the_attempt_cap() {
    let server = spawn_mock(realtime_server(String::new())).await;
    let settings = BridgeSettings {
        reconnect_backoff_millis: 10,
        max_reconnect_attempts: 3,
        ..test_settings(&server.url)
    };
    let (sink, mut events) = ChannelSink::new();
    let client = BridgeClient::new(
        settings,
        &UserLoginMetadata {
            cookies: TEST_COOKIES.into(),
        },
        Arc::new(sink),
    )
    .expect("client");

    client.connect().await.expect("connect");
    collect_until(&mut events, |events| dropped_count(events) == 4).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(server.requests_to("/realtime/connect").len(), 4);
    client.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn disconnect_stops_an_active_reconnect_loop() {
    let ready = format!("data: {}\n\n", json!({ EVENT_CLIENT_CONNECTION: {} }));
    let server = spawn_mock(realtime_server(ready)).await;
    let settings = BridgeSettings {
        reconnect_backoff_millis: 1,
        max_reconnect_attempts: 1,
        ..test_settings(&server.url)
    };
    let client = BridgeClient::new(
        settings,
        &UserLoginMetadata {
            cookies: TEST_COOKIES.into(),
        },
        Arc::new(DiscardSink),
    )
    .expect("client");

    client.connect().await.expect("connect");
    // Confirmed streams reset the failure count, so a one-attempt cap
    // still allows reconnecting after every drop.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while server.requests_to("/realtime/connect").len() < 5 {
        assert!(tokio::time::Instant::now() < deadline, "stream was not reopened");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    client.disconnect().await.expect("disconnect");
    let after_disconnect = server.requests_to("/realtime/connect").len();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(server.requests_to("/realtime/connect").len(), after_disconnect);
    assert!(!client.voyager().is_connected().await);
    client.connect().await.expect("connect again");
    client.disconnect().await.expect("disconnect again");
}

#[tokio::test]
async fn fetch_messages_expands_reactions_and_pages_by_cursor() {
    let server = spawn_mock(|request| {
        if let Some(response) = session_response(request) {
            return response;
        }
        let query = request.query();
        if query.contains(GRAPHQL_REACTIONS_FOR_EMOJI) {
            MockResponse::json(json!({
                "data": {"messengerMessagingParticipantsByMessageAndEmoji": {
                    "elements": [{"hostIdentityUrn": ALICE}]
                }}
            }))
        } else if query.contains(GRAPHQL_MESSAGES_BY_ANCHOR_TIMESTAMP) {
            let mut reacted = message_json("urn:li:msg_message:2", 2000, "second");
            reacted["reactionSummaries"] =
                json!([{"emoji": "👍", "count": 1, "firstReactedAt": 2500}]);
            MockResponse::json(json!({
                "data": {"messengerMessagesByAnchorTimestamp": {
                    "metadata": {"prevCursor": "prev-1"},
                    "elements": [reacted, message_json("urn:li:msg_message:1", 1000, "first")]
                }}
            }))
        } else if query.contains(GRAPHQL_MESSAGES_BY_CONVERSATION) {
            MockResponse::json(json!({
                "data": {"messengerMessagesByConversation": {
                    "metadata": {"prevCursor": ""},
                    "elements": []
                }}
            }))
        } else {
            MockResponse::status(404)
        }
    })
    .await;
    let (client, _) =
        BridgeClient::login(test_settings(&server.url), TEST_COOKIES, Arc::new(DiscardSink))
            .await
            .expect("login");
    let anchor = timestamp(1_700_000_000_000);

    let first = client
        .fetch_messages(FetchMessagesParams {
            thread_id: ThreadId::new(thread_urn()),
            cursor: None,
            anchor_timestamp: Some(anchor),
            count: 2,
            forward: false,
        })
        .await
        .expect("first page");

    let ids: Vec<&str> = first.messages.iter().map(|message| message.id.as_str()).collect();
    assert_eq!(ids, ["urn:li:msg_message:1", "urn:li:msg_message:2"]);
    assert!(first.messages[0].reactions.is_empty());
    let reaction = &first.messages[1].reactions[0];
    assert_eq!(reaction.emoji, "👍");
    assert_eq!(reaction.sender.sender.as_str(), ALICE);
    assert_eq!(first.messages[1].content.parts, vec![MessagePart::Text {
        body: "second".into()
    }]);
    assert_eq!(first.cursor.as_deref(), Some("c:prev-1"));
    assert!(first.has_more);

    let second = client
        .fetch_messages(FetchMessagesParams {
            thread_id: ThreadId::new(thread_urn()),
            cursor: first.cursor.clone(),
            anchor_timestamp: None,
            count: 2,
            forward: false,
        })
        .await
        .expect("second page");
    assert!(second.messages.is_empty());
    assert_eq!(second.cursor, None);
    assert!(!second.has_more);

    let graphql: Vec<String> = server
        .requests_to("/voyager/api/voyagerMessagingGraphQL/graphql")
        .into_iter()
        .map(|request| request.query().to_string())
        .collect();
    assert_eq!(graphql.len(), 3);
    assert!(graphql[0].contains("deliveredAt:1700000000000"));
    assert!(graphql[0].contains("countBefore:2"));
    assert!(graphql[2].contains("prevCursor:prev-1"));

    let err = client
        .fetch_messages(FetchMessagesParams {
            thread_id: ThreadId::new(thread_urn()),
            cursor: Some("bogus".into()),
            anchor_timestamp: None,
            count: 2,
            forward: false,
        })
        .await
        .expect_err("invalid cursor");
    assert_eq!(err.code, ErrorCode::Protocol);
}

#[tokio::test]
async fn send_message_uploads_media_before_sending() {
    let server = spawn_mock(|request| {
        if let Some(response) = session_response(request) {
            return response;
        }
        match request.path.as_str() {
            "/voyager/api/voyagerVideoDashMediaUploadMetadata" => {
                let host = request.header("host").unwrap_or_default();
                MockResponse::json(json!({
                    "data": {"value": {
                        "urn": "urn:li:digitalmediaAsset:cat",
                        "singleUploadUrl": format!("http://{host}/dms-uploads/cat"),
                    }}
                }))
            }
            "/dms-uploads/cat" => MockResponse::status(201),
            MESSAGES_PATH => MockResponse::json(json!({
                "value": {"entityUrn": "urn:li:msg_message:new", "deliveredAt": 1_700_000_000_123_i64}
            })),
            _ => MockResponse::status(404),
        }
    })
    .await;
    let (client, _) =
        BridgeClient::login(test_settings(&server.url), TEST_COOKIES, Arc::new(DiscardSink))
            .await
            .expect("login");

    let sent = client
        .send_message(OutgoingMessage {
            thread_id: ThreadId::new(thread_urn()),
            kind: OutgoingKind::Image,
            body: "cat.png".into(),
            media: Some(OutgoingMedia {
                file_name: "cat.png".into(),
                mime_type: "image/png".into(),
                data: b"png-bytes".to_vec(),
            }),
            reply_to: None,
        })
        .await
        .expect("send");

    assert_eq!(sent.id.as_str(), "urn:li:msg_message:new");
    assert_eq!(sent.timestamp.timestamp_millis(), 1_700_000_000_123);

    let requests = server.requests();
    let paths: Vec<&str> = requests.iter().map(|request| request.path.as_str()).collect();
    assert_eq!(
        paths[2..],
        [
            "/voyager/api/voyagerVideoDashMediaUploadMetadata",
            "/dms-uploads/cat",
            MESSAGES_PATH
        ]
    );
    assert_eq!(requests[3].header("content-type"), Some("image/png"));
    assert_eq!(requests[3].body, b"png-bytes");
    let payload = requests[4].json();
    assert_eq!(payload["message"]["body"]["text"], "");
    assert_eq!(
        payload["message"]["renderContentUnions"][0]["file"]["assetUrn"],
        "urn:li:digitalmediaAsset:cat"
    );
    assert_eq!(payload["message"]["conversationUrn"], thread_urn());
}

#[tokio::test]
async fn action_failures_keep_their_status() {
    let server = spawn_mock(|request| {
        session_response(request).unwrap_or_else(|| MockResponse::status(500).with_body("nope"))
    })
    .await;
    let (client, _) =
        BridgeClient::login(test_settings(&server.url), TEST_COOKIES, Arc::new(DiscardSink))
            .await
            .expect("login");

    let err = client
        .send_reaction(&MessageId::new("urn:li:msg_message:1"), "👍", true)
        .await
        .expect_err("server error");

    assert_eq!(err.code, ErrorCode::Network);
    assert!(client.mark_read(&[], true).await.is_ok());
}

#[tokio::test]
async fn logout_forgets_the_session() {
    let server = spawn_mock(|request| {
        session_response(request).unwrap_or_else(|| {
            MockResponse::status(303).with_header("location", "https://www.linkedin.com/login")
        })
    })
    .await;
    let (client, _) =
        BridgeClient::login(test_settings(&server.url), TEST_COOKIES, Arc::new(DiscardSink))
            .await
            .expect("login");
    assert!(client.is_logged_in());

    client.logout().await.expect("logout");

    assert!(!client.is_logged_in());
    assert_eq!(client.login_metadata().cookies, "");
    let logout = server.requests_to("/uas/logout");
    assert_eq!(logout.len(), 1);
    assert!(logout[0].query().contains("csrfToken="));
}

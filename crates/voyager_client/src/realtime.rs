use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::{sync::oneshot, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::{
    error::VoyagerError,
    event::{ClientEvent, ConnectionClosedReason, StreamExit},
    headers::HeaderContext,
    routing::{
        response::{
            ConversationRef, MessageElement, MessageReaction, MessageSeenReceipt, RenderFormat,
            ThreadElement, TypingIndicator,
        },
        Endpoint,
    },
    types::{
        null_as_default, PresenceAvailability, Topic, CONTENT_TYPE_EVENT_STREAM,
        CONTENT_TYPE_GRAPHQL, CONTENT_TYPE_NORMALIZED_JSON, EVENT_CLIENT_CONNECTION,
        EVENT_DECORATED, EVENT_HEARTBEAT,
    },
    VoyagerClient,
};

const DATA_PREFIX: &str = "data: ";
const PROFILE_URN_PREFIX: &str = "urn:li:fsd_profile:";

const RECIPE_MAP: &str = r#"{"inAppAlertsTopic":"com.linkedin.voyager.dash.deco.identity.notifications.InAppAlert-51","professionalEventsTopic":"com.linkedin.voyager.dash.deco.events.ProfessionalEventDetailPage-57","topCardLiveVideoTopic":"com.linkedin.voyager.dash.deco.video.TopCardLiveVideo-9","tabBadgeUpdateTopic":"com.linkedin.voyager.dash.deco.notifications.RealtimeBadgingItemCountsEvent-1"}"#;

const QUERY_MAP: &str = r#"{"topicToGraphQLQueryParams":{"conversationsBroadcastTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.dc0088938e4fd0220c7694cdc1e7e2f6","variables":{},"extensions":{}},"conversationsTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.dc0088938e4fd0220c7694cdc1e7e2f6","variables":{},"extensions":{}},"conversationDeletesBroadcastTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.282abe5fa1a242cb76825c32dbbfaede","variables":{},"extensions":{}},"conversationDeletesTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.282abe5fa1a242cb76825c32dbbfaede","variables":{},"extensions":{}},"messageReactionSummariesBroadcastTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.3173250b03ea4f9f9e138a145cf3d9b4","variables":{},"extensions":{}},"messageReactionSummariesTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.3173250b03ea4f9f9e138a145cf3d9b4","variables":{},"extensions":{}},"messageSeenReceiptsBroadcastTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.56fd79ca10248ead05369fa7ab1868dc","variables":{},"extensions":{}},"messageSeenReceiptsTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.56fd79ca10248ead05369fa7ab1868dc","variables":{},"extensions":{}},"messagesBroadcastTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.9a690a85b608d1212fdaed40be3a1465","variables":{},"extensions":{}},"messagesTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.9a690a85b608d1212fdaed40be3a1465","variables":{},"extensions":{}},"replySuggestionBroadcastTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.412964c3f7f5a67fb0e56b6bb3a00028","variables":{},"extensions":{}},"replySuggestionTopicV2":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.412964c3f7f5a67fb0e56b6bb3a00028","variables":{},"extensions":{}},"typingIndicatorsBroadcastTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.ad2174343a09cd7ef53b2e6f633695fe","variables":{},"extensions":{}},"typingIndicatorsTopic":{"queryId":"voyagerMessagingDashMessengerRealtimeDecoration.ad2174343a09cd7ef53b2e6f633695fe","variables":{},"extensions":{}},"messagingSecondaryPreviewBannerTopic":{"queryId":"voyagerMessagingDashRealtimeDecoration.60068248c1f5c683ad2557f7ccfdf188","variables":{},"extensions":{}},"reactionsTopic":{"queryId":"liveVideoVoyagerSocialDashRealtimeDecoration.b8b33dedca7efbe34f1d7e84c3b3aa81","variables":{},"extensions":{}},"commentsTopic":{"queryId":"liveVideoVoyagerSocialDashRealtimeDecoration.c582028e0b04485c17e4324d3f463e11","variables":{},"extensions":{}},"reactionsOnCommentsTopic":{"queryId":"liveVideoVoyagerSocialDashRealtimeDecoration.0a181b05b3751f72ae3eb489b77e3245","variables":{},"extensions":{}},"socialPermissionsPersonalTopic":{"queryId":"liveVideoVoyagerSocialDashRealtimeDecoration.170bf3bfbcca1da322e34f34f37fb954","variables":{},"extensions":{}},"liveVideoPostTopic":{"queryId":"liveVideoVoyagerFeedDashLiveUpdatesRealtimeDecoration.ccc245beb0ba0d99bd1df96a1fc53abc","variables":{},"extensions":{}},"generatedJobDescriptionsTopic":{"queryId":"voyagerHiringDashRealtimeDecoration.58501bc70ea8ce6b858527fb1be95007","variables":{},"extensions":{}},"eventToastsTopic":{"queryId":"voyagerEventsDashProfessionalEventsRealtimeResource.6b42abd3511e267e84a6765257deea50","variables":{},"extensions":{}},"coachStreamingResponsesTopic":{"queryId":"voyagerCoachDashGaiRealtimeDecoration.c5707587cf5d95191185235cf15d5129","variables":{},"extensions":{}},"realtimeSearchResultClustersTopic":{"queryId":"voyagerSearchDashRealtimeDecoration.545edd9da8c728b0854505ab6df11870","variables":{},"extensions":{}}}}"#;

pub(crate) struct RealtimeState {
    session_id: String,
    connection: Option<RealtimeConnection>,
}

struct RealtimeConnection {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RealtimeState {
    pub(crate) fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            connection: None,
        }
    }
}

#[derive(Debug)]
pub struct StreamCompletion(oneshot::Receiver<StreamExit>);

impl StreamCompletion {
    pub async fn wait(self) -> StreamExit {
        self.0.await.unwrap_or(StreamExit::Cancelled)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DecoratedEvent {
    #[serde(deserialize_with = "null_as_default")]
    topic: String,
    #[serde(deserialize_with = "null_as_default")]
    id: String,
    #[serde(deserialize_with = "null_as_default")]
    payload: DecoratedPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DecoratedPayload {
    #[serde(deserialize_with = "null_as_default")]
    data: DecoratedData,
    last_active_at: i64,
    availability: Option<PresenceAvailability>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Decorated<T> {
    result: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DecoratedData {
    #[serde(rename = "doDecorateMessageMessengerRealtimeDecoration")]
    message: Option<Decorated<MessageElement>>,
    #[serde(rename = "doDecorateSeenReceiptMessengerRealtimeDecoration")]
    seen_receipt: Option<Decorated<MessageSeenReceipt>>,
    #[serde(rename = "doDecorateTypingIndicatorMessengerRealtimeDecoration")]
    typing_indicator: Option<Decorated<TypingIndicator>>,
    #[serde(rename = "doDecorateRealtimeReactionSummaryMessengerRealtimeDecoration")]
    reaction: Option<Decorated<MessageReaction>>,
    #[serde(rename = "doDecorateConversationDeleteMessengerRealtimeDecoration")]
    deleted_conversation: Option<Decorated<ConversationRef>>,
    #[serde(rename = "doDecorateConversationMessengerRealtimeDecoration")]
    updated_conversation: Option<Decorated<ThreadElement>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParsedTopic<'a> {
    Known(Topic),
    Unknown(&'a str),
}

/// Finds the topic segment of `urn:li-realtime:<topic>:...` style strings.
/// The first segment after the scheme that names a known topic wins.
pub(crate) fn parse_topic(topic: &str) -> ParsedTopic<'_> {
    let segments: Vec<&str> = topic.split(':').collect();
    segments
        .iter()
        .skip(2)
        .find_map(|segment| Topic::from_name(segment))
        .map(ParsedTopic::Known)
        .unwrap_or_else(|| ParsedTopic::Unknown(segments.get(2).copied().unwrap_or(topic)))
}

fn presence_user_id(topic: &str) -> String {
    let id = topic.rsplit(':').next().unwrap_or_default();
    format!("{PROFILE_URN_PREFIX}{id}")
}

fn route_message(message: MessageElement) -> Option<ClientEvent> {
    let message = Box::new(message);
    match message.message_body_render_format {
        RenderFormat::Default => Some(ClientEvent::Message(message)),
        RenderFormat::Edited => Some(ClientEvent::MessageEdited(message)),
        RenderFormat::Recalled => Some(ClientEvent::MessageDeleted(message)),
        RenderFormat::System => Some(ClientEvent::SystemMessage(message)),
        RenderFormat::Unknown => {
            warn!(message_urn = %message.entity_urn, "realtime: unknown message body render format");
            None
        }
    }
}

fn route_decorated_event(event: DecoratedEvent) -> Option<ClientEvent> {
    let DecoratedEvent { topic, id, payload } = event;
    let data = payload.data;
    let topic_kind = match parse_topic(&topic) {
        ParsedTopic::Known(topic_kind) => topic_kind,
        ParsedTopic::Unknown(name) => {
            warn!(%topic, topic_name = name, event_id = %id, "realtime: unknown event topic");
            return None;
        }
    };
    if topic_kind.is_ignored() {
        debug!(%topic, "realtime: ignoring topic");
        return None;
    }

    let missing = |what: &str| {
        warn!(%topic, event_id = %id, "realtime: envelope without {what} payload");
        None
    };
    match topic_kind {
        Topic::Messages => match data.message {
            Some(decorated) => route_message(decorated.result),
            None => missing("message"),
        },
        Topic::MessageReactionSummaries => match data.reaction {
            Some(decorated) => Some(ClientEvent::Reaction(decorated.result)),
            None => missing("reaction"),
        },
        Topic::TypingIndicators => match data.typing_indicator {
            Some(decorated) => Some(ClientEvent::Typing(decorated.result)),
            None => missing("typing indicator"),
        },
        Topic::PresenceStatus => Some(ClientEvent::Presence {
            user_id: presence_user_id(&topic),
            availability: payload
                .availability
                .unwrap_or(PresenceAvailability::Offline),
            last_active_at: DateTime::<Utc>::from_timestamp_millis(payload.last_active_at)
                .unwrap_or_default(),
        }),
        Topic::MessageSeenReceipts => match data.seen_receipt {
            Some(decorated) => Some(ClientEvent::SeenReceipt(decorated.result)),
            None => missing("seen receipt"),
        },
        Topic::Conversations => match data.updated_conversation {
            Some(decorated) => Some(ClientEvent::ThreadUpdated(Box::new(decorated.result))),
            None => missing("conversation"),
        },
        Topic::ConversationDeletes => match data.deleted_conversation {
            Some(decorated) => Some(ClientEvent::ThreadDeleted(decorated.result)),
            None => missing("conversation delete"),
        },
        _ => None,
    }
}

fn parse_data_line(line: &str) -> Vec<ClientEvent> {
    let line = line.trim();
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return Vec::new();
    };
    let envelope: Map<String, Value> = match serde_json::from_str(data) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, "realtime: failed to decode event data");
            return Vec::new();
        }
    };

    let mut events = Vec::new();
    for (event_type, body) in envelope {
        match event_type.as_str() {
            EVENT_CLIENT_CONNECTION => events.push(ClientEvent::Ready),
            EVENT_HEARTBEAT => trace!("realtime: heartbeat"),
            EVENT_DECORATED => match serde_json::from_value::<DecoratedEvent>(body) {
                Ok(decorated) => events.extend(route_decorated_event(decorated)),
                Err(err) => warn!(error = %err, "realtime: failed to decode decorated event"),
            },
            other => warn!(event_type = other, json_data = %body, "realtime: unknown event type"),
        }
    }
    events
}

impl VoyagerClient {
    pub async fn connect(self: &Arc<Self>) -> Result<StreamCompletion, VoyagerError> {
        let mut state = self.realtime.lock().await;
        if state
            .connection
            .as_ref()
            .is_some_and(|connection| !connection.task.is_finished())
        {
            return Err(VoyagerError::AlreadyConnected);
        }

        let info = Endpoint::RealtimeConnect.info();
        let url = format!("{}{}?rc=1", self.base_url, info.path);
        let extra = [
            ("accept", CONTENT_TYPE_EVENT_STREAM.to_string()),
            ("x-li-realtime-session", state.session_id.clone()),
            ("x-li-recipe-accept", CONTENT_TYPE_NORMALIZED_JSON.to_string()),
            ("x-li-query-accept", CONTENT_TYPE_GRAPHQL.to_string()),
            ("x-li-accept", CONTENT_TYPE_NORMALIZED_JSON.to_string()),
            ("x-li-recipe-map", RECIPE_MAP.to_string()),
            ("x-li-query-map", QUERY_MAP.to_string()),
        ];
        let page = self.page_metadata();
        let headers = HeaderContext {
            base_url: &self.base_url,
            cookies: &self.cookies,
            page: page.as_ref(),
        }
        .build(&info.headers, &extra)?;

        let response = self
            .stream_http
            .request(info.method, &url)
            .headers(headers)
            .send()
            .await
            .map_err(VoyagerError::RequestFailed)?;
        self.cookies.update_from_response_headers(response.headers());
        if response.status() != StatusCode::OK {
            warn!(status = response.status().as_u16(), "realtime: connect rejected");
            return Err(VoyagerError::RealtimeConnect {
                status: response.status().as_u16(),
            });
        }

        let cancel = self.shutdown.child_token();
        let (done_tx, done_rx) = oneshot::channel();
        let client = Arc::clone(self);
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let exit = client.read_stream(response, loop_cancel).await;
            debug!(?exit, "realtime: read loop finished");
            let _ = done_tx.send(exit);
        });
        state.connection = Some(RealtimeConnection { cancel, task });
        info!(session_id = %state.session_id, "realtime: connected");
        Ok(StreamCompletion(done_rx))
    }

    /// Stops the read loop and emits `Closed(SelfDisconnect)`. Fails when no
    /// stream was opened since the last disconnect.
    pub async fn disconnect(&self) -> Result<(), VoyagerError> {
        let mut state = self.realtime.lock().await;
        let Some(connection) = state.connection.take() else {
            return Err(VoyagerError::NotConnected);
        };
        connection.cancel.cancel();
        state.session_id = Uuid::new_v4().to_string();
        drop(state);

        info!("realtime: disconnected");
        self.emit(ClientEvent::Closed(ConnectionClosedReason::SelfDisconnect));
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.realtime
            .lock()
            .await
            .connection
            .as_ref()
            .is_some_and(|connection| !connection.task.is_finished())
    }

    async fn read_stream(&self, response: reqwest::Response, cancel: CancellationToken) -> StreamExit {
        let mut stream = Box::pin(response.bytes_stream());
        let mut buffer: Vec<u8> = Vec::new();
        let mut was_ready = false;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return StreamExit::Cancelled,
                chunk = stream.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => {
                    buffer.extend_from_slice(&bytes);
                    while let Some(newline) = buffer.iter().position(|byte| *byte == b'\n') {
                        let line: Vec<u8> = buffer.drain(..=newline).collect();
                        if cancel.is_cancelled() {
                            return StreamExit::Cancelled;
                        }
                        for event in parse_data_line(&String::from_utf8_lossy(&line)) {
                            was_ready |= event == ClientEvent::Ready;
                            self.emit(event);
                        }
                    }
                }
                Some(Err(err)) => {
                    let reason = err.to_string();
                    warn!(error = %reason, "realtime: error reading from event stream");
                    self.emit(ClientEvent::Closed(ConnectionClosedReason::ConnectionDropped(
                        reason.clone(),
                    )));
                    return StreamExit::Failed { reason, was_ready };
                }
                None => {
                    warn!("realtime: event stream ended");
                    self.emit(ClientEvent::Closed(ConnectionClosedReason::ConnectionDropped(
                        "stream ended".to_string(),
                    )));
                    return StreamExit::Ended { was_ready };
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/realtime_tests.rs"]
mod tests;

use std::collections::BTreeMap;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    cookies::JSESSIONID,
    error::VoyagerError,
    routing::{
        encode_json,
        payload::{
            ConversationPayload, EditBody, MessageBody, MessageUrnPayload, PatchBody,
            PatchEntitiesPayload, ReactionPayload, ReadFlag, SendMessagePayload,
        },
        query::{
            self, encode_id_list, encode_logout, Action, FetchMessagesVariables,
            GetThreadsVariables, MessagesVariant, ReactionsForEmojiVariables, ThreadsVariant,
        },
        response::{
            GraphQlData, MarkThreadReadResponse, MessageSentResponse, MessengerConversationsResponse,
            MessengerMessagesResponse, ThreadElement,
        },
        DecodedResponse, Endpoint, RouteRequest, RoutedResponse,
    },
    types::{ConversationParticipant, UserLoginProfile},
    VoyagerClient,
};

pub const THREADS_PAGE_SIZE: i64 = 20;

/// 16 random bytes, each widened to the char of the same code point.
pub(crate) fn generate_tracking_id() -> String {
    rand::random::<[u8; 16]>()
        .into_iter()
        .map(char::from)
        .collect()
}

fn ensure_success(response: &RoutedResponse, action: &'static str) -> Result<(), VoyagerError> {
    if !response.status.is_success() {
        return Err(VoyagerError::ActionFailed {
            action,
            status: response.status.as_u16(),
            body: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }
    Ok(())
}

impl VoyagerClient {
    async fn graphql(
        &self,
        query: query::GraphQlQuery,
        action: &'static str,
    ) -> Result<GraphQlData, VoyagerError> {
        let response = self
            .request_endpoint(
                Endpoint::MessagingGraphQl,
                RouteRequest {
                    query: Some(query.encode()),
                    ..RouteRequest::default()
                },
            )
            .await?;
        ensure_success(&response, action)?;
        Ok(response.decoded.into_graphql()?.data)
    }

    pub async fn get_threads(
        &self,
        mut variables: GetThreadsVariables,
    ) -> Result<MessengerConversationsResponse, VoyagerError> {
        if variables.mailbox_urn.is_empty() {
            variables.mailbox_urn = self.require_user_id()?;
        }
        let variant = variables.variant();
        debug!(?variant, count = variables.count, "messaging: fetching threads");

        let data = self.graphql(variables.to_query(), "fetch threads").await?;
        let page = match variant {
            ThreadsVariant::WithCursor => data
                .messenger_conversations_by_category
                .or(data.messenger_conversations_by_sync_token),
            ThreadsVariant::WithSyncToken | ThreadsVariant::Plain => data
                .messenger_conversations_by_sync_token
                .or(data.messenger_conversations_by_category),
        };
        page.ok_or(VoyagerError::ResponseTypeAssertionFailed {
            expected: "MessengerConversationsResponse",
        })
    }

    pub async fn list_all_threads(&self) -> Result<Vec<ThreadElement>, VoyagerError> {
        let mut variables = GetThreadsVariables {
            count: THREADS_PAGE_SIZE,
            ..GetThreadsVariables::default()
        };
        let mut threads = Vec::new();
        loop {
            let page = self.get_threads(variables.clone()).await?;
            let page_len = page.threads.len();
            if page_len == 0 {
                break;
            }

            let oldest = page
                .threads
                .iter()
                .map(|thread| thread.last_activity_at)
                .min()
                .unwrap_or_default();
            let next = GetThreadsVariables {
                last_updated_before: oldest,
                next_cursor: page.metadata.next_cursor.clone(),
                sync_token: page.metadata.new_sync_token.clone(),
                ..variables.clone()
            };
            threads.extend(page.threads);

            if (page_len as i64) < THREADS_PAGE_SIZE {
                break;
            }
            if next == variables {
                warn!(oldest, "messaging: thread cursor did not advance, stopping");
                break;
            }
            variables = next;
        }
        info!(count = threads.len(), "messaging: listed threads");
        Ok(threads)
    }

    pub async fn fetch_messages(
        &self,
        variables: FetchMessagesVariables,
    ) -> Result<MessengerMessagesResponse, VoyagerError> {
        let variant = variables.variant();
        debug!(?variant, conversation = %variables.conversation_urn, "messaging: fetching messages");

        let data = self.graphql(variables.to_query(), "fetch messages").await?;
        let page = match variant {
            MessagesVariant::ByConversation => data.messenger_messages_by_conversation,
            MessagesVariant::ByAnchorTimestamp => data.messenger_messages_by_anchor_timestamp,
            MessagesVariant::BySyncToken => data.messenger_messages_by_sync_token,
        };
        let mut page = page.ok_or(VoyagerError::ResponseTypeAssertionFailed {
            expected: "MessengerMessagesResponse",
        })?;
        page.messages.sort_by_key(|message| message.delivered_at);
        Ok(page)
    }

    pub async fn reactions_for_emoji(
        &self,
        message_urn: &str,
        emoji: &str,
    ) -> Result<Vec<ConversationParticipant>, VoyagerError> {
        let variables = ReactionsForEmojiVariables {
            emoji: emoji.to_string(),
            message_urn: message_urn.to_string(),
        };
        let data = self
            .graphql(variables.to_query(), "fetch reactions")
            .await?;
        data.messenger_messaging_participants_by_message_and_emoji
            .map(|response| response.participants)
            .ok_or(VoyagerError::ResponseTypeAssertionFailed {
                expected: "MessagingParticipantsResponse",
            })
    }

    pub async fn send_message(
        &self,
        mut payload: SendMessagePayload,
    ) -> Result<MessageSentResponse, VoyagerError> {
        if payload.mailbox_urn.is_empty() {
            payload.mailbox_urn = self.require_user_id()?;
        }
        if payload.tracking_id.is_empty() {
            payload.tracking_id = generate_tracking_id();
        }
        if payload.message.origin_token.is_empty() {
            payload.message.origin_token = Uuid::new_v4().to_string();
        }

        let response = self
            .request_endpoint(
                Endpoint::Messages,
                RouteRequest {
                    query: Some(Action::CreateMessage.encode()),
                    body: Some(encode_json(&payload, "send message payload")?),
                    ..RouteRequest::default()
                },
            )
            .await?;
        response.ensure_action_ok("send message")?;
        let sent = response.decoded.into_message_sent()?;
        debug!(
            conversation = %payload.message.conversation_urn,
            message_urn = %sent.data.entity_urn,
            "messaging: message sent"
        );
        Ok(sent)
    }

    pub async fn edit_message(
        &self,
        message_urn: &str,
        body: MessageBody,
    ) -> Result<(), VoyagerError> {
        let escaped = query::query_escape(message_urn);
        let response = self
            .request_endpoint(
                Endpoint::MessageEdit,
                RouteRequest {
                    suffix: Some(&escaped),
                    body: Some(encode_json(
                        &PatchBody::set(EditBody { body }),
                        "edit message payload",
                    )?),
                    ..RouteRequest::default()
                },
            )
            .await?;
        response.ensure_action_ok("edit message")
    }

    pub async fn delete_message(&self, message_urn: &str) -> Result<(), VoyagerError> {
        let response = self
            .request_endpoint(
                Endpoint::Messages,
                RouteRequest {
                    query: Some(Action::Recall.encode()),
                    body: Some(encode_json(
                        &MessageUrnPayload { message_urn },
                        "recall payload",
                    )?),
                    ..RouteRequest::default()
                },
            )
            .await?;
        response.ensure_action_ok("delete message")
    }

    pub async fn send_reaction(
        &self,
        message_urn: &str,
        emoji: &str,
        react: bool,
    ) -> Result<(), VoyagerError> {
        let action = if react {
            Action::ReactWithEmoji
        } else {
            Action::UnreactWithEmoji
        };
        let response = self
            .request_endpoint(
                Endpoint::Messages,
                RouteRequest {
                    query: Some(action.encode()),
                    body: Some(encode_json(
                        &ReactionPayload { message_urn, emoji },
                        "reaction payload",
                    )?),
                    ..RouteRequest::default()
                },
            )
            .await?;
        response.ensure_action_ok("send reaction")
    }

    pub async fn start_typing(&self, conversation_urn: &str) -> Result<(), VoyagerError> {
        let response = self
            .request_endpoint(
                Endpoint::Conversations,
                RouteRequest {
                    query: Some(Action::Typing.encode()),
                    body: Some(encode_json(
                        &ConversationPayload { conversation_urn },
                        "typing payload",
                    )?),
                    ..RouteRequest::default()
                },
            )
            .await?;
        response.ensure_action_ok("start typing")
    }

    pub async fn mark_threads_read(
        &self,
        conversation_urns: &[String],
        read: bool,
    ) -> Result<MarkThreadReadResponse, VoyagerError> {
        let entities: BTreeMap<String, PatchBody<ReadFlag>> = conversation_urns
            .iter()
            .map(|urn| (urn.clone(), PatchBody::set(ReadFlag { read })))
            .collect();
        let response = self
            .request_endpoint(
                Endpoint::ConversationsPatch,
                RouteRequest {
                    query: Some(encode_id_list(conversation_urns)),
                    body: Some(encode_json(
                        &PatchEntitiesPayload { entities },
                        "mark read payload",
                    )?),
                    ..RouteRequest::default()
                },
            )
            .await?;
        response.ensure_action_ok("mark threads read")?;
        match response.decoded {
            DecodedResponse::None => Ok(MarkThreadReadResponse::default()),
            decoded => decoded.into_mark_read(),
        }
    }

    pub async fn delete_conversation(&self, conversation_urn: &str) -> Result<(), VoyagerError> {
        let escaped = query::query_escape(conversation_urn);
        let response = self
            .request_endpoint(
                Endpoint::ConversationDelete,
                RouteRequest {
                    suffix: Some(&escaped),
                    ..RouteRequest::default()
                },
            )
            .await?;
        response.ensure_action_ok("delete conversation")
    }

    pub async fn current_user_profile(&self) -> Result<UserLoginProfile, VoyagerError> {
        let response = self
            .request_endpoint(Endpoint::Me, RouteRequest::default())
            .await?;
        ensure_success(&response, "fetch current user profile")?;
        response.decoded.into_profile()
    }

    /// Ends the session server-side, closes the stream and forgets all
    /// cookies. The stream is closed even when the logout call fails.
    pub async fn logout(&self) -> Result<(), VoyagerError> {
        let csrf = self.cookies.get(JSESSIONID).unwrap_or_default();
        let result = self
            .request_endpoint(
                Endpoint::Logout,
                RouteRequest {
                    query: Some(encode_logout(&csrf)),
                    ..RouteRequest::default()
                },
            )
            .await;
        let _ = self.disconnect().await;
        self.cookies.clear();
        info!("messaging: logged out");
        match result {
            // The logout page answers with a redirect to the login form.
            Ok(_) | Err(VoyagerError::RedirectAttempted { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
#[path = "tests/messaging_tests.rs"]
mod tests;

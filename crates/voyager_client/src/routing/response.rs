use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    routing::payload::{MessageBody, RenderContent},
    types::{null_as_default, ConversationParticipant},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    #[serde(deserialize_with = "null_as_default")]
    pub next_cursor: String,
    #[serde(deserialize_with = "null_as_default")]
    pub prev_cursor: String,
    #[serde(deserialize_with = "null_as_default")]
    pub new_sync_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationRef {
    #[serde(deserialize_with = "null_as_default")]
    pub entity_urn: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderFormat {
    #[default]
    Default,
    Edited,
    Recalled,
    System,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReactionSummary {
    pub count: i64,
    pub first_reacted_at: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub emoji: String,
    pub viewer_reacted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageElement {
    #[serde(deserialize_with = "null_as_default")]
    pub entity_urn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub body: MessageBody,
    pub delivered_at: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub sender: ConversationParticipant,
    #[serde(deserialize_with = "null_as_default")]
    pub actor: ConversationParticipant,
    #[serde(deserialize_with = "null_as_default")]
    pub message_body_render_format: RenderFormat,
    #[serde(deserialize_with = "null_as_default")]
    pub render_content: Vec<RenderContent>,
    #[serde(deserialize_with = "null_as_default")]
    pub conversation: ConversationRef,
    #[serde(deserialize_with = "null_as_default")]
    pub reaction_summaries: Vec<ReactionSummary>,
    #[serde(deserialize_with = "null_as_default")]
    pub origin_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageElements {
    #[serde(deserialize_with = "null_as_default")]
    pub elements: Vec<MessageElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadElement {
    #[serde(deserialize_with = "null_as_default")]
    pub entity_urn: String,
    pub title: Option<String>,
    pub group_chat: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub conversation_participants: Vec<ConversationParticipant>,
    pub last_activity_at: i64,
    pub unread_count: i64,
    pub created_at: i64,
    pub last_read_at: i64,
    pub read: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub messages: MessageElements,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessengerConversationsResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: Metadata,
    #[serde(rename = "elements", deserialize_with = "null_as_default")]
    pub threads: Vec<ThreadElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessengerMessagesResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: Metadata,
    #[serde(rename = "elements", deserialize_with = "null_as_default")]
    pub messages: Vec<MessageElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessagingParticipantsResponse {
    #[serde(rename = "elements", deserialize_with = "null_as_default")]
    pub participants: Vec<ConversationParticipant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphQlData {
    pub messenger_conversations_by_sync_token: Option<MessengerConversationsResponse>,
    pub messenger_conversations_by_category: Option<MessengerConversationsResponse>,
    pub messenger_messages_by_sync_token: Option<MessengerMessagesResponse>,
    pub messenger_messages_by_anchor_timestamp: Option<MessengerMessagesResponse>,
    pub messenger_messages_by_conversation: Option<MessengerMessagesResponse>,
    pub messenger_messaging_participants_by_message_and_emoji:
        Option<MessagingParticipantsResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphQlResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub data: GraphQlData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageSentData {
    #[serde(deserialize_with = "null_as_default")]
    pub entity_urn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub conversation_urn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sender_urn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub origin_token: String,
    pub delivered_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSentResponse {
    #[serde(rename = "value", deserialize_with = "null_as_default")]
    pub data: MessageSentData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaMetadata {
    #[serde(deserialize_with = "null_as_default")]
    pub urn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub media_artifact_urn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub single_upload_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub polling_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub asset_realtime_topic: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaMetadataValue {
    #[serde(deserialize_with = "null_as_default")]
    pub value: MediaMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadMediaMetadataResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub data: MediaMetadataValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkThreadReadResult {
    pub status: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkThreadReadResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub results: HashMap<String, MarkThreadReadResult>,
    pub errors: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypingIndicator {
    #[serde(deserialize_with = "null_as_default")]
    pub typing_participant: ConversationParticipant,
    #[serde(deserialize_with = "null_as_default")]
    pub conversation: ConversationRef,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageRef {
    #[serde(deserialize_with = "null_as_default")]
    pub entity_urn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageSeenReceipt {
    pub seen_at: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub message: MessageRef,
    #[serde(deserialize_with = "null_as_default")]
    pub seen_by_participant: ConversationParticipant,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageReaction {
    pub reaction_added: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub actor: ConversationParticipant,
    #[serde(deserialize_with = "null_as_default")]
    pub message: MessageRef,
    #[serde(deserialize_with = "null_as_default")]
    pub reaction_summary: ReactionSummary,
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{null_as_default, ConversationParticipant, VectorImage};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextAttribute {
    pub start: i64,
    pub length: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_kind: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageBody {
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub attributes: Vec<TextAttribute>,
}

impl MessageBody {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Audio {
    pub url: String,
    pub duration: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalMediaInfo {
    pub url: String,
    pub original_width: u32,
    pub original_height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalMedia {
    pub media: ExternalMediaInfo,
    pub title: Option<String>,
    pub preview_media: Option<ExternalMediaInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct File {
    pub asset_urn: String,
    pub byte_size: u64,
    pub media_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingLocation {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressiveStream {
    pub streaming_locations: Vec<StreamingLocation>,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub media_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Video {
    pub progressive_streams: Vec<ProgressiveStream>,
    pub duration: i64,
}

impl Video {
    pub fn best_stream(&self) -> Option<(&ProgressiveStream, &str)> {
        self.progressive_streams
            .iter()
            .filter_map(|stream| {
                stream
                    .streaming_locations
                    .first()
                    .map(|location| (stream, location.url.as_str()))
            })
            .max_by_key(|(stream, _)| u64::from(stream.width) * u64::from(stream.height))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForwardedMessageContent {
    pub forwarded_body: MessageBody,
    pub original_send_at: i64,
    pub original_sender: Option<ConversationParticipant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepliedMessageContent {
    pub original_sender_urn: String,
    pub original_send_at: i64,
    pub original_message_urn: String,
    pub message_body: MessageBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Audio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_media: Option<ExternalMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<File>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarded_message_content: Option<ForwardedMessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replied_message_content: Option<RepliedMessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_image: Option<VectorImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageData {
    pub body: MessageBody,
    pub render_content_unions: Vec<RenderContent>,
    pub conversation_urn: String,
    pub origin_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub message: SendMessageData,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mailbox_urn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tracking_id: String,
    pub dedupe_by_client_generated_token: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub host_recipient_urns: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub conversation_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPayload<'a> {
    pub conversation_urn: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUrnPayload<'a> {
    pub message_urn: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionPayload<'a> {
    pub message_urn: &'a str,
    pub emoji: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchBody<T> {
    pub patch: PatchSet<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchSet<T> {
    #[serde(rename = "$set")]
    pub set: T,
}

impl<T> PatchBody<T> {
    pub fn set(value: T) -> Self {
        Self {
            patch: PatchSet { set: value },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditBody {
    pub body: MessageBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadFlag {
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchEntitiesPayload {
    pub entities: BTreeMap<String, PatchBody<ReadFlag>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaUploadType {
    MessagingPhotoAttachment,
    MessagingFileAttachment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMediaMetadataPayload<'a> {
    pub media_upload_type: MediaUploadType,
    pub file_size: usize,
    pub filename: &'a str,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    BackfillMessage, ChatInfo, ConvertedMessage, EventSender, MessageId, PortalKey,
    PresenceStatus, RemoteMessage, ThreadId, UserId,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "reason", rename_all = "snake_case")]
pub enum CloseReason {
    SelfDisconnect,
    ConnectionDropped(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DomainEvent {
    Message(RemoteMessage),
    Edit {
        portal: PortalKey,
        message_id: MessageId,
        sender: EventSender,
        timestamp: DateTime<Utc>,
        content: ConvertedMessage,
    },
    Delete {
        portal: PortalKey,
        message_id: MessageId,
        sender: EventSender,
        timestamp: DateTime<Utc>,
    },
    Reaction {
        /// `None` when the target message was not seen this session; the
        /// host then looks the room up by `message_id`.
        portal: Option<PortalKey>,
        message_id: MessageId,
        sender: EventSender,
        emoji: String,
        added: bool,
        timestamp: DateTime<Utc>,
    },
    Typing {
        portal: PortalKey,
        sender: EventSender,
        timeout_ms: u64,
    },
    Presence {
        user_id: UserId,
        status: PresenceStatus,
        last_active_at: Option<DateTime<Utc>>,
    },
    ReadReceipt {
        portal: Option<PortalKey>,
        message_id: MessageId,
        reader: EventSender,
        seen_at: DateTime<Utc>,
    },
    ThreadResync {
        portal: PortalKey,
        info: ChatInfo,
    },
    ThreadDelete {
        portal: PortalKey,
    },
    ConnectionReady,
    ConnectionClosed {
        reason: CloseReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutgoingKind {
    Text,
    Image,
    Video,
    Audio,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMedia {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub thread_id: ThreadId,
    pub kind: OutgoingKind,
    pub body: String,
    pub media: Option<OutgoingMedia>,
    pub reply_to: Option<ReplyTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: MessageId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchMessagesParams {
    pub thread_id: ThreadId,
    pub cursor: Option<String>,
    pub anchor_timestamp: Option<DateTime<Utc>>,
    pub count: u32,
    pub forward: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchMessagesResponse {
    pub messages: Vec<BackfillMessage>,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub forward: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserLoginMetadata {
    pub cookies: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub user_id: UserId,
    pub remote_name: String,
    pub metadata: UserLoginMetadata,
}

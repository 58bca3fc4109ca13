use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ThreadId);
id_newtype!(MessageId);

/// Identifies the room a remote event belongs to. Direct chats are scoped to
/// the logged-in user so two bridge users never share a DM room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortalKey {
    pub thread_id: ThreadId,
    pub receiver: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSender {
    pub sender: UserId,
    pub is_from_me: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Dm,
    GroupDm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub headline: Option<String>,
    pub identifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMember {
    pub user_id: UserId,
    pub is_from_me: bool,
    pub info: Option<UserInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatInfo {
    pub name: Option<String>,
    pub room_type: RoomType,
    pub members: Vec<ChatMember>,
    pub unread_count: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPart {
    pub kind: MediaKind,
    pub url: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_ms: Option<u64>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MessagePart {
    Text { body: String },
    Notice { body: String },
    Media(MediaPart),
    Unsupported { description: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConvertedMessage {
    pub parts: Vec<MessagePart>,
    pub reply_to: Option<MessageId>,
}

impl ConvertedMessage {
    pub fn merge_caption(&mut self) {
        let media_count = self
            .parts
            .iter()
            .filter(|part| matches!(part, MessagePart::Media(_)))
            .count();
        let text_count = self
            .parts
            .iter()
            .filter(|part| matches!(part, MessagePart::Text { .. }))
            .count();
        if media_count != 1 || text_count != 1 || self.parts.len() != 2 {
            return;
        }

        let mut caption = None;
        self.parts.retain(|part| match part {
            MessagePart::Text { body } => {
                caption = Some(body.clone());
                false
            }
            _ => true,
        });
        if let Some(MessagePart::Media(media)) = self.parts.first_mut() {
            media.caption = caption;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    pub portal: PortalKey,
    pub id: MessageId,
    pub sender: EventSender,
    pub timestamp: DateTime<Utc>,
    pub content: ConvertedMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackfillReaction {
    pub sender: EventSender,
    pub emoji: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackfillMessage {
    pub id: MessageId,
    pub sender: EventSender,
    pub timestamp: DateTime<Utc>,
    pub content: ConvertedMessage,
    pub reactions: Vec<BackfillReaction>,
}

use serde::{Deserialize, Deserializer, Serialize};

pub const BASE_URL: &str = "https://www.linkedin.com";

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_JSON_UTF8: &str = "application/json; charset=UTF-8";
pub const CONTENT_TYPE_NORMALIZED_JSON: &str = "application/vnd.linkedin.normalized+json+2.1";
pub const CONTENT_TYPE_GRAPHQL: &str = "application/graphql";
pub const CONTENT_TYPE_EVENT_STREAM: &str = "text/event-stream";
pub const CONTENT_TYPE_PLAINTEXT_UTF8: &str = "text/plain;charset=UTF-8";

pub const PROTOCOL_VERSION: &str = "2.0.0";

pub const GRAPHQL_CONVERSATIONS: &str = "messengerConversations.95e0a4b80fbc6bc53550e670d34d05d9";
pub const GRAPHQL_CONVERSATIONS_WITH_CURSOR: &str =
    "messengerConversations.18240d6a3ac199067a703996eeb4b163";
pub const GRAPHQL_CONVERSATIONS_WITH_SYNC_TOKEN: &str =
    "messengerConversations.be2479ed77df3dd407dd90efc8ac41de";
pub const GRAPHQL_MESSAGES_BY_SYNC_TOKEN: &str =
    "messengerMessages.d1b494ac18c24c8be71ea07b5bd1f831";
pub const GRAPHQL_MESSAGES_BY_ANCHOR_TIMESTAMP: &str =
    "messengerMessages.b52340f92136e74c2aab21dac7cf7ff2";
pub const GRAPHQL_MESSAGES_BY_CONVERSATION: &str =
    "messengerMessages.86ca573adc64110d94d8bce89c5b2f3b";
pub const GRAPHQL_REACTIONS_FOR_EMOJI: &str =
    "messengerMessagingParticipants.3d2e0e93494e9dbf4943dc19da98bdf6";

/// Treats an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub const EVENT_CLIENT_CONNECTION: &str = "com.linkedin.realtimefrontend.ClientConnection";
pub const EVENT_DECORATED: &str = "com.linkedin.realtimefrontend.DecoratedEvent";
pub const EVENT_HEARTBEAT: &str = "com.linkedin.realtimefrontend.Heartbeat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Conversations,
    ConversationDeletes,
    MessageSeenReceipts,
    Messages,
    ReplySuggestionV2,
    TabBadgeUpdate,
    TypingIndicators,
    Invitations,
    InAppAlerts,
    MessageReactionSummaries,
    SocialPermissionsPersonal,
    JobPostingPersonal,
    MessagingProgressIndicator,
    MessagingDataSync,
    PresenceStatus,
}

impl Topic {
    pub const ALL: [Topic; 15] = [
        Topic::Conversations,
        Topic::ConversationDeletes,
        Topic::MessageSeenReceipts,
        Topic::Messages,
        Topic::ReplySuggestionV2,
        Topic::TabBadgeUpdate,
        Topic::TypingIndicators,
        Topic::Invitations,
        Topic::InAppAlerts,
        Topic::MessageReactionSummaries,
        Topic::SocialPermissionsPersonal,
        Topic::JobPostingPersonal,
        Topic::MessagingProgressIndicator,
        Topic::MessagingDataSync,
        Topic::PresenceStatus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Conversations => "conversationsTopic",
            Topic::ConversationDeletes => "conversationDeletesTopic",
            Topic::MessageSeenReceipts => "messageSeenReceiptsTopic",
            Topic::Messages => "messagesTopic",
            Topic::ReplySuggestionV2 => "replySuggestionTopicV2",
            Topic::TabBadgeUpdate => "tabBadgeUpdateTopic",
            Topic::TypingIndicators => "typingIndicatorsTopic",
            Topic::Invitations => "invitationsTopic",
            Topic::InAppAlerts => "inAppAlertsTopic",
            Topic::MessageReactionSummaries => "messageReactionSummariesTopic",
            Topic::SocialPermissionsPersonal => "socialPermissionsPersonalTopic",
            Topic::JobPostingPersonal => "jobPostingPersonalTopic",
            Topic::MessagingProgressIndicator => "messagingProgressIndicatorTopic",
            Topic::MessagingDataSync => "messagingDataSyncTopic",
            Topic::PresenceStatus => "presenceStatusTopic",
        }
    }

    pub fn from_name(name: &str) -> Option<Topic> {
        Topic::ALL.into_iter().find(|topic| topic.as_str() == name)
    }

    pub fn is_ignored(self) -> bool {
        matches!(
            self,
            Topic::JobPostingPersonal
                | Topic::SocialPermissionsPersonal
                | Topic::MessagingProgressIndicator
                | Topic::MessagingDataSync
                | Topic::Invitations
                | Topic::InAppAlerts
                | Topic::ReplySuggestionV2
                | Topic::TabBadgeUpdate
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InboxCategory {
    Other,
    Archive,
    Inbox,
    #[default]
    PrimaryInbox,
    SecondaryInbox,
}

impl InboxCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            InboxCategory::Other => "OTHER",
            InboxCategory::Archive => "ARCHIVE",
            InboxCategory::Inbox => "INBOX",
            InboxCategory::PrimaryInbox => "PRIMARY_INBOX",
            InboxCategory::SecondaryInbox => "SECONDARY_INBOX",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceAvailability {
    Online,
    Offline,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTrack {
    pub client_version: String,
    pub mp_version: String,
    pub os_name: &'static str,
    pub timezone_offset: i32,
    pub timezone: &'static str,
    pub device_form_factor: &'static str,
    pub mp_name: &'static str,
    pub display_density: f64,
    pub display_width: f64,
    pub display_height: u32,
}

impl DeviceTrack {
    pub fn for_service_version(service_version: &str) -> Self {
        Self {
            client_version: service_version.to_string(),
            mp_version: service_version.to_string(),
            os_name: "web",
            timezone_offset: 2,
            timezone: "Europe/Stockholm",
            device_form_factor: "DESKTOP",
            mp_name: "voyager-web",
            display_density: 1.125,
            display_width: 2560.5,
            display_height: 1440,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributedText {
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageArtifact {
    pub width: u32,
    pub height: u32,
    pub file_identifying_url_path_segment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VectorImage {
    pub root_url: String,
    #[serde(rename = "digitalmediaAsset", skip_serializing_if = "Option::is_none")]
    pub digitalmedia_asset: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ImageArtifact>,
}

impl VectorImage {
    pub fn best_url(&self) -> String {
        match self.artifacts.iter().max_by_key(|artifact| artifact.width) {
            Some(artifact) => format!(
                "{}{}",
                self.root_url, artifact.file_identifying_url_path_segment
            ),
            None => self.root_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberParticipant {
    #[serde(deserialize_with = "null_as_default")]
    pub profile_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub first_name: AttributedText,
    #[serde(deserialize_with = "null_as_default")]
    pub last_name: AttributedText,
    pub profile_picture: Option<VectorImage>,
    pub headline: Option<AttributedText>,
    pub distance: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantType {
    pub member: Option<MemberParticipant>,
    pub custom: Option<serde_json::Value>,
    pub organization: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationParticipant {
    #[serde(deserialize_with = "null_as_default")]
    pub host_identity_urn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub entity_urn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub participant_type: ParticipantType,
}

impl ConversationParticipant {
    pub fn member(&self) -> Option<&MemberParticipant> {
        self.participant_type.member.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub occupation: String,
    pub public_identifier: String,
    pub picture: Option<serde_json::Value>,
    pub memorialized: bool,
    pub entity_urn: String,
    pub object_urn: String,
    pub dash_entity_urn: String,
    pub tracking_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserLoginProfile {
    pub plain_id: i64,
    pub mini_profile: UserProfile,
}

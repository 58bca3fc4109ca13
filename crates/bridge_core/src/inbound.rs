use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use shared::{
    domain::{
        BackfillMessage, BackfillReaction, ChatInfo, ChatMember, ConvertedMessage, EventSender,
        MediaKind, MediaPart, MessageId, MessagePart, PortalKey, PresenceStatus, RemoteMessage,
        RoomType, ThreadId, UserId, UserInfo,
    },
    protocol::{CloseReason, DomainEvent},
};
use tracing::{debug, warn};
use voyager_client::{
    routing::{
        payload::RenderContent,
        response::{MessageElement, ReactionSummary, ThreadElement},
    },
    types::{ConversationParticipant, MemberParticipant, PresenceAvailability},
    ClientEvent, ConnectionClosedReason,
};

use crate::config::format_displayname;

pub const TYPING_TIMEOUT_MS: u64 = 15_000;

const REMEMBERED_MESSAGES: usize = 10_000;

pub(crate) fn timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
}

fn optional_timestamp(millis: i64) -> Option<DateTime<Utc>> {
    (millis > 0).then(|| timestamp(millis))
}

pub struct InboundTranslator {
    own_user: Option<UserId>,
    displayname_template: String,
    group_threads: HashMap<String, bool>,
    users: HashMap<UserId, UserInfo>,
    message_threads: HashMap<String, String>,
    message_order: VecDeque<String>,
}

impl InboundTranslator {
    pub fn new(displayname_template: impl Into<String>) -> Self {
        Self {
            own_user: None,
            displayname_template: displayname_template.into(),
            group_threads: HashMap::new(),
            users: HashMap::new(),
            message_threads: HashMap::new(),
            message_order: VecDeque::new(),
        }
    }

    pub fn set_own_user(&mut self, user_id: UserId) {
        self.own_user = Some(user_id);
    }

    pub fn own_user(&self) -> Option<&UserId> {
        self.own_user.as_ref()
    }

    pub fn user_info(&self, user_id: &UserId) -> Option<&UserInfo> {
        self.users.get(user_id)
    }

    fn is_own(&self, urn: &str) -> bool {
        self.own_user
            .as_ref()
            .is_some_and(|own| own.as_str() == urn)
    }

    /// Direct chats are keyed per login so the receiver is set; group chats
    /// are shared.
    pub fn portal_key(&self, thread_urn: &str, group_chat: bool) -> PortalKey {
        PortalKey {
            thread_id: ThreadId::new(thread_urn),
            receiver: if group_chat {
                None
            } else {
                self.own_user.clone()
            },
        }
    }

    pub fn portal_for(&self, thread_urn: &str) -> PortalKey {
        let group_chat = self
            .group_threads
            .get(thread_urn)
            .copied()
            .unwrap_or(false);
        self.portal_key(thread_urn, group_chat)
    }

    /// Portal of a message seen in this session. Only the most recent
    /// messages are kept.
    pub fn portal_for_message(&self, message_urn: &str) -> Option<PortalKey> {
        self.message_threads
            .get(message_urn)
            .map(|thread_urn| self.portal_for(thread_urn))
    }

    fn remember_message(&mut self, message: &MessageElement) {
        let thread_urn = &message.conversation.entity_urn;
        if message.entity_urn.is_empty() || thread_urn.is_empty() {
            return;
        }
        let previous = self
            .message_threads
            .insert(message.entity_urn.clone(), thread_urn.clone());
        if previous.is_some() {
            return;
        }
        self.message_order.push_back(message.entity_urn.clone());
        if self.message_order.len() > REMEMBERED_MESSAGES {
            if let Some(oldest) = self.message_order.pop_front() {
                self.message_threads.remove(&oldest);
            }
        }
    }

    pub fn event_sender(&self, participant: &ConversationParticipant) -> EventSender {
        EventSender {
            sender: UserId::new(participant.host_identity_urn.as_str()),
            is_from_me: self.is_own(&participant.host_identity_urn),
        }
    }

    pub fn remember_thread(&mut self, thread: &ThreadElement) {
        self.group_threads
            .insert(thread.entity_urn.clone(), thread.group_chat);
        for participant in &thread.conversation_participants {
            if let Some(info) = self.member_info(participant) {
                self.users
                    .insert(UserId::new(participant.host_identity_urn.as_str()), info);
            }
        }
    }

    fn member_info(&self, participant: &ConversationParticipant) -> Option<UserInfo> {
        let participant_type = &participant.participant_type;
        if participant_type.organization.is_some() || participant_type.custom.is_some() {
            return None;
        }
        participant_type
            .member
            .as_ref()
            .map(|member| self.user_info_for(member))
    }

    fn user_info_for(&self, member: &MemberParticipant) -> UserInfo {
        UserInfo {
            name: Some(format_displayname(
                &self.displayname_template,
                &member.first_name.text,
                &member.last_name.text,
            )),
            avatar_url: member
                .profile_picture
                .as_ref()
                .map(|picture| picture.best_url())
                .filter(|url| !url.is_empty()),
            headline: member
                .headline
                .as_ref()
                .map(|headline| headline.text.clone())
                .filter(|text| !text.is_empty()),
            identifiers: if member.profile_url.is_empty() {
                Vec::new()
            } else {
                vec![format!("linkedin:{}", member.profile_url)]
            },
        }
    }

    pub fn chat_member(&self, participant: &ConversationParticipant) -> ChatMember {
        let sender = self.event_sender(participant);
        ChatMember {
            user_id: sender.sender,
            is_from_me: sender.is_from_me,
            info: self.member_info(participant),
        }
    }

    pub fn chat_info(&self, thread: &ThreadElement) -> ChatInfo {
        ChatInfo {
            name: thread.title.clone().filter(|title| !title.is_empty()),
            room_type: if thread.group_chat {
                RoomType::GroupDm
            } else {
                RoomType::Dm
            },
            members: thread
                .conversation_participants
                .iter()
                .map(|participant| self.chat_member(participant))
                .collect(),
            unread_count: u32::try_from(thread.unread_count).unwrap_or_default(),
            created_at: optional_timestamp(thread.created_at),
            last_activity_at: optional_timestamp(thread.last_activity_at),
        }
    }

    pub fn convert_message(&self, message: &MessageElement) -> ConvertedMessage {
        let mut converted = ConvertedMessage::default();
        for content in &message.render_content {
            if let Some(reply) = content
                .replied_message_content
                .as_ref()
                .filter(|reply| !reply.original_message_urn.is_empty())
            {
                converted.reply_to = Some(MessageId::new(reply.original_message_urn.as_str()));
                continue;
            }
            match convert_render_content(content) {
                Some(part) => converted.parts.push(part),
                None => debug!(
                    message_urn = %message.entity_urn,
                    "inbound: skipping empty render content"
                ),
            }
        }
        if !message.body.text.is_empty() {
            converted.parts.push(MessagePart::Text {
                body: message.body.text.clone(),
            });
        }
        converted.merge_caption();
        converted
    }

    pub fn remote_message(&self, message: &MessageElement) -> RemoteMessage {
        RemoteMessage {
            portal: self.portal_for(&message.conversation.entity_urn),
            id: MessageId::new(message.entity_urn.as_str()),
            sender: self.event_sender(&message.sender),
            timestamp: timestamp(message.delivered_at),
            content: self.convert_message(message),
        }
    }

    fn system_message(&self, message: &MessageElement) -> RemoteMessage {
        let mut remote = self.remote_message(message);
        remote.content.parts = remote
            .content
            .parts
            .into_iter()
            .map(|part| match part {
                MessagePart::Text { body } => MessagePart::Notice { body },
                other => other,
            })
            .collect();
        remote
    }

    pub fn backfill_message(
        &mut self,
        message: &MessageElement,
        reactions: Vec<BackfillReaction>,
    ) -> BackfillMessage {
        self.remember_message(message);
        BackfillMessage {
            id: MessageId::new(message.entity_urn.as_str()),
            sender: self.event_sender(&message.sender),
            timestamp: timestamp(message.delivered_at),
            content: self.convert_message(message),
            reactions,
        }
    }

    pub fn backfill_reactions(
        &self,
        summary: &ReactionSummary,
        participants: &[ConversationParticipant],
    ) -> Vec<BackfillReaction> {
        participants
            .iter()
            .map(|participant| BackfillReaction {
                sender: self.event_sender(participant),
                emoji: summary.emoji.clone(),
                timestamp: timestamp(summary.first_reacted_at),
            })
            .collect()
    }

    pub fn thread_sync(&mut self, thread: &ThreadElement, with_messages: bool) -> Vec<DomainEvent> {
        self.remember_thread(thread);
        for message in &thread.messages.elements {
            self.remember_message(message);
        }
        let portal = self.portal_key(&thread.entity_urn, thread.group_chat);
        let mut events = vec![DomainEvent::ThreadResync {
            portal,
            info: self.chat_info(thread),
        }];
        if with_messages {
            let mut messages: Vec<&MessageElement> = thread.messages.elements.iter().collect();
            messages.sort_by_key(|message| message.delivered_at);
            events.extend(
                messages
                    .into_iter()
                    .map(|message| DomainEvent::Message(self.remote_message(message))),
            );
        }
        events
    }

    pub fn translate(&mut self, event: ClientEvent) -> Option<DomainEvent> {
        match event {
            ClientEvent::Ready => Some(DomainEvent::ConnectionReady),
            ClientEvent::Closed(reason) => Some(DomainEvent::ConnectionClosed {
                reason: match reason {
                    ConnectionClosedReason::SelfDisconnect => CloseReason::SelfDisconnect,
                    ConnectionClosedReason::ConnectionDropped(cause) => {
                        CloseReason::ConnectionDropped(cause)
                    }
                },
            }),
            ClientEvent::Message(message) => {
                self.remember_message(&message);
                Some(DomainEvent::Message(self.remote_message(&message)))
            }
            ClientEvent::SystemMessage(message) => {
                self.remember_message(&message);
                Some(DomainEvent::Message(self.system_message(&message)))
            }
            ClientEvent::MessageEdited(message) => Some(DomainEvent::Edit {
                portal: self.portal_for(&message.conversation.entity_urn),
                message_id: MessageId::new(message.entity_urn.as_str()),
                sender: self.event_sender(&message.sender),
                timestamp: timestamp(message.delivered_at),
                content: self.convert_message(&message),
            }),
            ClientEvent::MessageDeleted(message) => Some(DomainEvent::Delete {
                portal: self.portal_for(&message.conversation.entity_urn),
                message_id: MessageId::new(message.entity_urn.as_str()),
                sender: self.event_sender(&message.sender),
                timestamp: timestamp(message.delivered_at),
            }),
            ClientEvent::Reaction(reaction) => {
                if reaction.reaction_summary.emoji.is_empty() {
                    warn!(message_urn = %reaction.message.entity_urn, "inbound: reaction without emoji");
                    return None;
                }
                Some(DomainEvent::Reaction {
                    portal: self.portal_for_message(&reaction.message.entity_urn),
                    message_id: MessageId::new(reaction.message.entity_urn.as_str()),
                    sender: self.event_sender(&reaction.actor),
                    emoji: reaction.reaction_summary.emoji,
                    added: reaction.reaction_added,
                    timestamp: Utc::now(),
                })
            }
            ClientEvent::Typing(indicator) => Some(DomainEvent::Typing {
                portal: self.portal_for(&indicator.conversation.entity_urn),
                sender: self.event_sender(&indicator.typing_participant),
                timeout_ms: TYPING_TIMEOUT_MS,
            }),
            ClientEvent::Presence {
                user_id,
                availability,
                last_active_at,
            } => Some(DomainEvent::Presence {
                user_id: UserId::new(user_id),
                status: match availability {
                    PresenceAvailability::Online => PresenceStatus::Online,
                    PresenceAvailability::Offline => PresenceStatus::Offline,
                },
                last_active_at: (last_active_at.timestamp_millis() > 0).then_some(last_active_at),
            }),
            ClientEvent::SeenReceipt(receipt) => Some(DomainEvent::ReadReceipt {
                portal: self.portal_for_message(&receipt.message.entity_urn),
                message_id: MessageId::new(receipt.message.entity_urn.as_str()),
                reader: self.event_sender(&receipt.seen_by_participant),
                seen_at: timestamp(receipt.seen_at),
            }),
            ClientEvent::ThreadUpdated(thread) => {
                self.remember_thread(&thread);
                Some(DomainEvent::ThreadResync {
                    portal: self.portal_key(&thread.entity_urn, thread.group_chat),
                    info: self.chat_info(&thread),
                })
            }
            ClientEvent::ThreadDeleted(conversation) => {
                let portal = self.portal_for(&conversation.entity_urn);
                self.group_threads.remove(&conversation.entity_urn);
                Some(DomainEvent::ThreadDelete { portal })
            }
        }
    }
}

fn convert_render_content(content: &RenderContent) -> Option<MessagePart> {
    if let Some(image) = &content.vector_image {
        let largest = image.artifacts.iter().max_by_key(|artifact| artifact.width);
        return Some(MessagePart::Media(MediaPart {
            kind: MediaKind::Image,
            url: image.best_url(),
            file_name: None,
            mime_type: None,
            size: None,
            width: largest.map(|artifact| artifact.width),
            height: largest.map(|artifact| artifact.height),
            duration_ms: None,
            caption: None,
        }));
    }
    if let Some(video) = &content.video {
        let Some((stream, url)) = video.best_stream() else {
            return Some(MessagePart::Unsupported {
                description: "video without a playable stream".into(),
            });
        };
        return Some(MessagePart::Media(MediaPart {
            kind: MediaKind::Video,
            url: url.to_string(),
            file_name: None,
            mime_type: Some(stream.media_type.clone()).filter(|mime| !mime.is_empty()),
            size: Some(stream.size).filter(|size| *size > 0),
            width: Some(stream.width),
            height: Some(stream.height),
            duration_ms: u64::try_from(video.duration).ok(),
            caption: None,
        }));
    }
    if let Some(audio) = &content.audio {
        return Some(MessagePart::Media(MediaPart {
            kind: MediaKind::Audio,
            url: audio.url.clone(),
            file_name: None,
            mime_type: None,
            size: None,
            width: None,
            height: None,
            duration_ms: u64::try_from(audio.duration).ok(),
            caption: None,
        }));
    }
    if let Some(file) = &content.file {
        return Some(MessagePart::Media(MediaPart {
            kind: MediaKind::File,
            url: file.url.clone(),
            file_name: Some(file.name.clone()).filter(|name| !name.is_empty()),
            mime_type: Some(file.media_type.clone()).filter(|mime| !mime.is_empty()),
            size: Some(file.byte_size).filter(|size| *size > 0),
            width: None,
            height: None,
            duration_ms: None,
            caption: None,
        }));
    }
    if let Some(external) = &content.external_media {
        return Some(MessagePart::Media(MediaPart {
            kind: MediaKind::Image,
            url: external.media.url.clone(),
            file_name: external.title.clone(),
            mime_type: None,
            size: None,
            width: Some(external.media.original_width),
            height: Some(external.media.original_height),
            duration_ms: None,
            caption: None,
        }));
    }
    if let Some(forwarded) = &content.forwarded_message_content {
        return Some(MessagePart::Notice {
            body: forwarded.forwarded_body.text.clone(),
        });
    }
    None
}

#[cfg(test)]
#[path = "tests/inbound_tests.rs"]
mod tests;

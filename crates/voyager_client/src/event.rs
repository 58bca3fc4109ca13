use chrono::{DateTime, Utc};

use crate::{
    routing::response::{
        ConversationRef, MessageElement, MessageReaction, MessageSeenReceipt, ThreadElement,
        TypingIndicator,
    },
    types::PresenceAvailability,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionClosedReason {
    SelfDisconnect,
    ConnectionDropped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Ready,
    Closed(ConnectionClosedReason),
    Message(Box<MessageElement>),
    SystemMessage(Box<MessageElement>),
    MessageEdited(Box<MessageElement>),
    MessageDeleted(Box<MessageElement>),
    Reaction(MessageReaction),
    Typing(TypingIndicator),
    Presence {
        user_id: String,
        availability: PresenceAvailability,
        last_active_at: DateTime<Utc>,
    },
    SeenReceipt(MessageSeenReceipt),
    ThreadUpdated(Box<ThreadElement>),
    ThreadDeleted(ConversationRef),
}

/// How a realtime read loop finished. `was_ready` is set when the server
/// confirmed the connection before the stream went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamExit {
    Cancelled,
    Ended { was_ready: bool },
    Failed { reason: String, was_ready: bool },
}

impl StreamExit {
    pub fn was_ready(&self) -> bool {
        match self {
            Self::Cancelled => false,
            Self::Ended { was_ready } | Self::Failed { was_ready, .. } => *was_ready,
        }
    }
}

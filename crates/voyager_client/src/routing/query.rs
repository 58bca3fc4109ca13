use url::form_urlencoded;

use crate::types::{self, InboxCategory};

/// Escapes a value the way the web client does: `+` for spaces, `~` kept,
/// `*` escaped. Form encoding differs from that on exactly those two bytes.
pub fn query_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for chunk in form_urlencoded::byte_serialize(value.as_bytes()) {
        if chunk == "%7E" {
            escaped.push('~');
            continue;
        }
        for ch in chunk.chars() {
            match ch {
                '*' => escaped.push_str("%2A"),
                other => escaped.push(other),
            }
        }
    }
    escaped
}

#[derive(Debug, Default)]
pub struct GraphQlVariables {
    fields: Vec<(&'static str, String)>,
}

impl GraphQlVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &'static str, value: &str) -> Self {
        if !value.is_empty() {
            self.fields.push((name, query_escape(value)));
        }
        self
    }

    pub fn number(mut self, name: &'static str, value: i64) -> Self {
        if value != 0 {
            self.fields.push((name, value.to_string()));
        }
        self
    }

    pub fn encode(&self) -> String {
        let joined = self
            .fields
            .iter()
            .map(|(name, value)| format!("{name}:{value}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("({joined})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQlQuery {
    pub query_id: &'static str,
    pub variables: String,
}

impl GraphQlQuery {
    pub fn encode(&self) -> String {
        format!("queryId={}&variables={}", self.query_id, self.variables)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateMessage,
    Typing,
    Upload,
    Recall,
    ReactWithEmoji,
    UnreactWithEmoji,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::CreateMessage => "createMessage",
            Action::Typing => "typing",
            Action::Upload => "upload",
            Action::Recall => "recall",
            Action::ReactWithEmoji => "reactWithEmoji",
            Action::UnreactWithEmoji => "unreactWithEmoji",
        }
    }

    pub fn encode(self) -> String {
        format!("action={}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadsVariant {
    WithCursor,
    WithSyncToken,
    Plain,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetThreadsVariables {
    pub category: Option<InboxCategory>,
    pub count: i64,
    pub mailbox_urn: String,
    pub last_updated_before: i64,
    pub next_cursor: String,
    pub sync_token: String,
}

impl GetThreadsVariables {
    pub fn variant(&self) -> ThreadsVariant {
        if self.last_updated_before != 0 && !self.next_cursor.is_empty() {
            ThreadsVariant::WithCursor
        } else if !self.sync_token.is_empty() {
            ThreadsVariant::WithSyncToken
        } else {
            ThreadsVariant::Plain
        }
    }

    pub fn to_query(&self) -> GraphQlQuery {
        let query_id = match self.variant() {
            ThreadsVariant::WithCursor => types::GRAPHQL_CONVERSATIONS_WITH_CURSOR,
            ThreadsVariant::WithSyncToken => types::GRAPHQL_CONVERSATIONS_WITH_SYNC_TOKEN,
            ThreadsVariant::Plain => types::GRAPHQL_CONVERSATIONS,
        };
        let variables = GraphQlVariables::new()
            .text("category", self.category.map_or("", InboxCategory::as_str))
            .number("count", self.count)
            .text("mailboxUrn", &self.mailbox_urn)
            .number("lastUpdatedBefore", self.last_updated_before)
            .text("nextCursor", &self.next_cursor)
            .text("syncToken", &self.sync_token);
        GraphQlQuery {
            query_id,
            variables: variables.encode(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagesVariant {
    ByConversation,
    ByAnchorTimestamp,
    BySyncToken,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchMessagesVariables {
    pub delivered_at: i64,
    pub conversation_urn: String,
    pub count: i64,
    pub prev_cursor: String,
    pub count_before: i64,
    pub count_after: i64,
}

impl FetchMessagesVariables {
    pub fn variant(&self) -> MessagesVariant {
        if !self.prev_cursor.is_empty() {
            MessagesVariant::ByConversation
        } else if self.delivered_at != 0 {
            MessagesVariant::ByAnchorTimestamp
        } else {
            MessagesVariant::BySyncToken
        }
    }

    pub fn to_query(&self) -> GraphQlQuery {
        let query_id = match self.variant() {
            MessagesVariant::ByConversation => types::GRAPHQL_MESSAGES_BY_CONVERSATION,
            MessagesVariant::ByAnchorTimestamp => types::GRAPHQL_MESSAGES_BY_ANCHOR_TIMESTAMP,
            MessagesVariant::BySyncToken => types::GRAPHQL_MESSAGES_BY_SYNC_TOKEN,
        };
        let variables = GraphQlVariables::new()
            .number("deliveredAt", self.delivered_at)
            .text("conversationUrn", &self.conversation_urn)
            .number("count", self.count)
            .text("prevCursor", &self.prev_cursor)
            .number("countBefore", self.count_before)
            .number("countAfter", self.count_after);
        GraphQlQuery {
            query_id,
            variables: variables.encode(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReactionsForEmojiVariables {
    pub emoji: String,
    pub message_urn: String,
}

impl ReactionsForEmojiVariables {
    pub fn to_query(&self) -> GraphQlQuery {
        let variables = GraphQlVariables::new()
            .text("emoji", &self.emoji)
            .text("messageUrn", &self.message_urn);
        GraphQlQuery {
            query_id: types::GRAPHQL_REACTIONS_FOR_EMOJI,
            variables: variables.encode(),
        }
    }
}

pub fn encode_id_list(urns: &[String]) -> String {
    let escaped = urns
        .iter()
        .map(|urn| query_escape(urn))
        .collect::<Vec<_>>()
        .join(",");
    format!("ids=List({escaped})")
}

pub fn encode_logout(csrf_token: &str) -> String {
    format!("csrfToken={}", query_escape(csrf_token))
}

#[cfg(test)]
#[path = "../tests/query_tests.rs"]
mod tests;

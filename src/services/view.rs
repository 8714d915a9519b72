use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::APP_NAME;
use crate::models::{ApiConnection, Conversation, Message, Role};

/// Reserved id of the ephemeral typing placeholder. Never stored.
pub const TYPING_MESSAGE_ID: &str = "typing";

/// Shown in place of an API key unless the user reveals it.
pub const MASKED_API_KEY: &str = "••••••••••••";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageView {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_typing: bool,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            role: message.role,
            content: message.content.clone(),
            timestamp: message.timestamp,
            is_typing: false,
        }
    }
}

impl MessageView {
    fn typing() -> Self {
        Self {
            id: TYPING_MESSAGE_ID.to_string(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            is_typing: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarEntry {
    pub id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub time_ago: String,
    pub message_count: usize,
    pub is_active: bool,
}

/// Everything the chat screen needs to render, projected from the session
/// state. Holds clones only; building a view never mutates the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatView {
    pub title: String,
    pub messages: Vec<MessageView>,
    pub sidebar: Vec<SidebarEntry>,
    pub is_generating: bool,
}

impl ChatView {
    pub fn project(
        conversations: &[Conversation],
        active_id: Option<&str>,
        is_generating: bool,
    ) -> Self {
        let now = Utc::now();
        let active = active_id.and_then(|id| conversations.iter().find(|c| c.id == id));

        let mut messages: Vec<MessageView> = active
            .map(|c| c.messages.iter().map(MessageView::from).collect())
            .unwrap_or_default();
        if is_generating && active.is_some() {
            messages.push(MessageView::typing());
        }

        let sidebar = conversations
            .iter()
            .map(|c| SidebarEntry {
                id: c.id.clone(),
                title: c.title.clone(),
                updated_at: c.updated_at,
                time_ago: format_time_ago(c.updated_at, now),
                message_count: c.message_count(),
                is_active: active_id == Some(c.id.as_str()),
            })
            .collect();

        Self {
            title: active
                .map(|c| c.title.clone())
                .unwrap_or_else(|| APP_NAME.to_string()),
            messages,
            sidebar,
            is_generating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionView {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub is_active: bool,
}

impl ConnectionView {
    pub fn new(connection: &ApiConnection, reveal_key: bool) -> Self {
        let api_key = connection.api_key.as_ref().map(|key| {
            if reveal_key {
                key.clone()
            } else {
                MASKED_API_KEY.to_string()
            }
        });
        Self {
            id: connection.id.clone(),
            name: connection.name.clone(),
            kind: connection.kind.clone(),
            endpoint: connection.endpoint.clone(),
            api_key,
            is_active: connection.is_active,
        }
    }
}

pub fn format_time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    let days = elapsed.num_days();
    let hours = elapsed.num_hours();
    if days > 0 {
        format!("{days}d ago")
    } else if hours > 0 {
        format!("{hours}h ago")
    } else {
        "Now".to_string()
    }
}

use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;

use crate::models::{Conversation, Message};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Conversation not found: {0}")]
    NotFound(String),
}

/// Owns the conversation list and the active-conversation id. Cheap to
/// clone; all clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    conversations: Vec<Conversation>,
    active_id: Option<String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh conversation at the top of the list and make it active.
    pub fn create_conversation(&self) -> Conversation {
        let conversation = Conversation::new();
        let mut inner = self.inner.lock().unwrap();
        inner.active_id = Some(conversation.id.clone());
        inner.conversations.insert(0, conversation.clone());
        tracing::debug!(conversation = %conversation.id, "created conversation");
        conversation
    }

    pub fn select_conversation(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.conversations.iter().any(|c| c.id == id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        inner.active_id = Some(id.to_string());
        Ok(())
    }

    /// Remove a conversation. If it was active, the first remaining
    /// conversation in the current ordering becomes active.
    pub fn delete_conversation(&self, id: &str) -> Result<Conversation, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let index = inner
            .conversations
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let removed = inner.conversations.remove(index);
        if inner.active_id.as_deref() == Some(id) {
            inner.active_id = inner.conversations.first().map(|c| c.id.clone());
        }
        tracing::debug!(conversation = %id, "deleted conversation");
        Ok(removed)
    }

    /// Replace the title. Empty or whitespace-only titles are ignored.
    pub fn rename_conversation(&self, id: &str, new_title: &str) -> Result<(), StoreError> {
        let title = new_title.trim();
        let mut inner = self.inner.lock().unwrap();
        let conversation = inner
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if title.is_empty() {
            return Ok(());
        }
        conversation.title = title.to_string();
        conversation.updated_at = Utc::now();
        Ok(())
    }

    /// Append a message. The first message of a still-untitled conversation
    /// also names it.
    pub fn append_message(&self, id: &str, message: Message) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let conversation = inner
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if conversation.messages.is_empty() && conversation.has_default_title() {
            conversation.title = truncate_title(&message.content);
        }
        conversation.messages.push(message);
        conversation.updated_at = Utc::now();
        Ok(())
    }

    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        let inner = self.inner.lock().unwrap();
        inner.conversations.iter().find(|c| c.id == id).cloned()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.inner.lock().unwrap().conversations.clone()
    }

    pub fn active_conversation_id(&self) -> Option<String> {
        self.inner.lock().unwrap().active_id.clone()
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        let inner = self.inner.lock().unwrap();
        let id = inner.active_id.as_deref()?;
        inner.conversations.iter().find(|c| c.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Truncate text to a short title for conversations.
pub fn truncate_title(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or(text);
    if first_line.len() > 50 {
        let boundary = first_line
            .char_indices()
            .take_while(|(i, _)| *i < 47)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(47);
        format!("{}...", &first_line[..boundary])
    } else {
        first_line.to_string()
    }
}

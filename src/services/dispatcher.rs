use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::Message;
use crate::reply::ReplyGenerator;
use crate::services::store::{SessionStore, StoreError};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Message content is empty")]
    EmptyMessage,

    #[error("A reply is already pending for conversation {0}")]
    Busy(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Accepts outgoing messages and schedules exactly one reply per accepted
/// submission. Each pending reply is a cancellable task; all data mutation
/// goes through the [`SessionStore`].
#[derive(Clone)]
pub struct MessageDispatcher {
    store: SessionStore,
    generator: Arc<dyn ReplyGenerator>,
    pending: Arc<Mutex<HashMap<String, CancellationToken>>>,
    settled: mpsc::UnboundedSender<String>,
}

impl MessageDispatcher {
    /// `settled` receives the conversation id every time a reply lands, so
    /// the owner can refresh its view of the world.
    pub fn new(
        store: SessionStore,
        generator: Arc<dyn ReplyGenerator>,
        settled: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            store,
            generator,
            pending: Arc::new(Mutex::new(HashMap::new())),
            settled,
        }
    }

    /// Submit a user message. With no target id, the active conversation is
    /// used; with no active conversation, one is created. Returns the id of
    /// the conversation the message landed in.
    pub fn submit(
        &self,
        conversation_id: Option<&str>,
        content: &str,
    ) -> Result<String, DispatchError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DispatchError::EmptyMessage);
        }

        let target = match conversation_id {
            Some(id) => self
                .store
                .conversation(id)
                .map(|c| c.id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?,
            None => match self.store.active_conversation_id() {
                Some(id) => id,
                None => self.store.create_conversation().id,
            },
        };

        let token = {
            let mut pending = self.pending.lock().unwrap();
            if pending.contains_key(&target) {
                return Err(DispatchError::Busy(target));
            }
            let token = CancellationToken::new();
            pending.insert(target.clone(), token.clone());
            token
        };

        if let Err(e) = self.store.append_message(&target, Message::user(content)) {
            self.pending.lock().unwrap().remove(&target);
            return Err(e.into());
        }

        self.spawn_resolution(target.clone(), token);
        Ok(target)
    }

    /// Stop the pending reply for a conversation, if any. A reply whose
    /// timer has already fired but has not yet landed is discarded.
    pub fn cancel(&self, conversation_id: &str) {
        let mut pending = self.pending.lock().unwrap();
        if let Some(token) = pending.remove(conversation_id) {
            token.cancel();
            tracing::debug!(conversation = %conversation_id, "cancelled pending reply");
        }
    }

    pub fn is_generating(&self, conversation_id: &str) -> bool {
        self.pending.lock().unwrap().contains_key(conversation_id)
    }

    fn spawn_resolution(&self, conversation_id: String, token: CancellationToken) {
        let store = self.store.clone();
        let generator = Arc::clone(&self.generator);
        let pending = Arc::clone(&self.pending);
        let settled = self.settled.clone();

        tokio::spawn(async move {
            let history = store
                .conversation(&conversation_id)
                .map(|c| c.messages)
                .unwrap_or_default();

            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(conversation = %conversation_id, "reply task stopped");
                }
                content = generator.generate_reply(&history) => {
                    // Settle under the pending lock: a cancellation observed
                    // before this point always wins.
                    let mut pending = pending.lock().unwrap();
                    if token.is_cancelled() || pending.remove(&conversation_id).is_none() {
                        return;
                    }
                    match store.append_message(&conversation_id, Message::assistant(content)) {
                        Ok(()) => {
                            drop(pending);
                            let _ = settled.send(conversation_id);
                        }
                        Err(StoreError::NotFound(_)) => {
                            // Conversation deleted while the reply was in
                            // flight; nowhere for it to land.
                            tracing::debug!(conversation = %conversation_id, "discarding reply for deleted conversation");
                        }
                    }
                }
            }
        });
    }
}

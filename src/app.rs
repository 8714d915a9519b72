use std::sync::{Arc, Mutex, Weak};

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::models::ApiConnection;
use crate::reply::ReplyGenerator;
use crate::services::connections::{ApiConnectionRegistry, ConnectionTester, RegistryError};
use crate::services::dispatcher::{DispatchError, MessageDispatcher};
use crate::services::store::SessionStore;
use crate::services::transcript;
use crate::services::view::ChatView;

/// Renders ephemeral toast notifications. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn toast(&self, message: &str);
}

/// OS clipboard collaborator.
pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: &str);
}

/// Notifier that writes toasts to the log instead of a screen.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn toast(&self, message: &str) {
        tracing::info!(toast = %message);
    }
}

/// In-memory clipboard for headless use.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().unwrap().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn set_text(&self, text: &str) {
        *self.contents.lock().unwrap() = Some(text.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Like,
    Dislike,
}

/// The application facade. Every inbound UI command goes through here; a
/// fresh [`ChatView`] snapshot is pushed to the returned channel after
/// every state change, including replies that land later.
pub struct ChatApp {
    store: SessionStore,
    dispatcher: Arc<MessageDispatcher>,
    connections: ApiConnectionRegistry,
    notifier: Arc<dyn Notifier>,
    clipboard: Arc<dyn Clipboard>,
    snapshots: mpsc::UnboundedSender<ChatView>,
}

impl ChatApp {
    /// Must be called from within a tokio runtime: resolved replies are
    /// forwarded to the snapshot channel by a background task.
    pub fn new(
        generator: Arc<dyn ReplyGenerator>,
        tester: Arc<dyn ConnectionTester>,
        notifier: Arc<dyn Notifier>,
        clipboard: Arc<dyn Clipboard>,
    ) -> (Self, mpsc::UnboundedReceiver<ChatView>) {
        let store = SessionStore::new();
        let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(MessageDispatcher::new(store.clone(), generator, settled_tx));

        spawn_settled_forwarder(
            settled_rx,
            store.clone(),
            Arc::downgrade(&dispatcher),
            snapshot_tx.clone(),
        );

        let app = Self {
            store,
            dispatcher,
            connections: ApiConnectionRegistry::new(tester),
            notifier,
            clipboard,
            snapshots: snapshot_tx,
        };
        (app, snapshot_rx)
    }

    pub fn view(&self) -> ChatView {
        project(&self.store, &self.dispatcher)
    }

    pub fn new_conversation(&self) -> String {
        let conversation = self.store.create_conversation();
        self.push_snapshot();
        conversation.id
    }

    pub fn select_conversation(&self, id: &str) -> Result<()> {
        self.store
            .select_conversation(id)
            .context("Failed to select conversation")?;
        self.push_snapshot();
        Ok(())
    }

    /// Delete a conversation, cancelling its pending reply if it has one.
    pub fn delete_conversation(&self, id: &str) -> Result<()> {
        self.dispatcher.cancel(id);
        self.store
            .delete_conversation(id)
            .context("Failed to delete conversation")?;
        self.notifier.toast("Conversation deleted");
        self.push_snapshot();
        Ok(())
    }

    pub fn rename_conversation(&self, id: &str, new_title: &str) -> Result<()> {
        self.store
            .rename_conversation(id, new_title)
            .context("Failed to rename conversation")?;
        self.push_snapshot();
        Ok(())
    }

    /// Submit a message to the active conversation, creating one if none
    /// exists. Empty input and a busy dispatcher are silently ignored.
    pub fn send_message(&self, content: &str) -> Result<()> {
        match self.dispatcher.submit(None, content) {
            Ok(_) => self.push_snapshot(),
            Err(DispatchError::EmptyMessage) => {
                tracing::debug!("ignoring empty message");
            }
            Err(DispatchError::Busy(id)) => {
                tracing::debug!(conversation = %id, "already generating, submit rejected");
            }
            Err(e @ DispatchError::Store(_)) => {
                return Err(e).context("Failed to submit message");
            }
        }
        Ok(())
    }

    pub fn stop_generation(&self) {
        if let Some(id) = self.store.active_conversation_id() {
            self.dispatcher.cancel(&id);
            self.push_snapshot();
        }
    }

    pub fn copy_message(&self, content: &str) {
        self.clipboard.set_text(content);
        self.notifier.toast("Copied to clipboard");
    }

    pub fn give_feedback(&self, message_id: &str, feedback: Feedback) {
        tracing::debug!(message = %message_id, ?feedback, "feedback received");
        let toast = match feedback {
            Feedback::Like => "Thanks for the feedback 👍",
            Feedback::Dislike => "Thanks for the feedback 👎",
        };
        self.notifier.toast(toast);
    }

    pub fn regenerate_message(&self, message_id: &str) {
        tracing::debug!(message = %message_id, "regenerate requested");
        self.notifier.toast("Regenerating response");
    }

    pub fn export_transcript(&self, id: &str) -> Result<String> {
        let conversation = self
            .store
            .conversation(id)
            .with_context(|| format!("Conversation not found: {id}"))?;
        Ok(transcript::to_markdown(&conversation))
    }

    // --- API connection registry ---

    pub fn add_connection(
        &self,
        name: &str,
        kind: &str,
        endpoint: &str,
        api_key: Option<&str>,
    ) -> Option<ApiConnection> {
        match self.connections.add(name, kind, endpoint, api_key) {
            Ok(connection) => {
                self.notifier
                    .toast(&format!("{} added", connection.name));
                Some(connection)
            }
            Err(RegistryError::MissingField(_)) => {
                self.notifier.toast("Name and endpoint are required");
                None
            }
            Err(e) => {
                tracing::warn!("failed to add connection: {e}");
                None
            }
        }
    }

    pub fn delete_connection(&self, id: &str) -> Result<()> {
        self.connections
            .delete(id)
            .context("Failed to delete connection")?;
        self.notifier.toast("API connection removed");
        Ok(())
    }

    pub fn toggle_connection(&self, id: &str) -> Result<bool> {
        self.connections
            .toggle_active(id)
            .context("Failed to toggle connection")
    }

    pub async fn test_connection(&self, id: &str) -> Result<()> {
        let connection = self
            .connections
            .get(id)
            .with_context(|| format!("Connection not found: {id}"))?;
        self.notifier
            .toast(&format!("Testing connection to {}", connection.name));

        let outcome = self
            .connections
            .test(id)
            .await
            .context("Failed to test connection")?;
        match outcome {
            Ok(()) => self
                .notifier
                .toast(&format!("Connection to {} succeeded", connection.name)),
            Err(e) => self
                .notifier
                .toast(&format!("Connection to {} failed: {}", connection.name, e)),
        }
        Ok(())
    }

    pub fn connections(&self) -> Vec<ApiConnection> {
        self.connections.list()
    }

    fn push_snapshot(&self) {
        let _ = self.snapshots.send(self.view());
    }
}

fn project(store: &SessionStore, dispatcher: &MessageDispatcher) -> ChatView {
    let conversations = store.conversations();
    let active_id = store.active_conversation_id();
    let is_generating = active_id
        .as_deref()
        .map(|id| dispatcher.is_generating(id))
        .unwrap_or(false);
    ChatView::project(&conversations, active_id.as_deref(), is_generating)
}

fn spawn_settled_forwarder(
    mut settled_rx: mpsc::UnboundedReceiver<String>,
    store: SessionStore,
    dispatcher: Weak<MessageDispatcher>,
    snapshots: mpsc::UnboundedSender<ChatView>,
) {
    tokio::spawn(async move {
        while let Some(_id) = settled_rx.recv().await {
            let Some(dispatcher) = dispatcher.upgrade() else {
                break;
            };
            let _ = snapshots.send(project(&store, &dispatcher));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::reply::{SimulatedReply, SIMULATED_REPLY, SIMULATED_REPLY_LATENCY};
    use crate::services::connections::SimulatedTester;

    #[derive(Default)]
    struct RecordingNotifier {
        toasts: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn toasts(&self) -> Vec<String> {
            self.toasts.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn toast(&self, message: &str) {
            self.toasts.lock().unwrap().push(message.to_string());
        }
    }

    struct Fixture {
        app: ChatApp,
        snapshots: mpsc::UnboundedReceiver<ChatView>,
        notifier: Arc<RecordingNotifier>,
        clipboard: Arc<MemoryClipboard>,
    }

    fn fixture() -> Fixture {
        init_tracing();
        let notifier = Arc::new(RecordingNotifier::default());
        let clipboard = Arc::new(MemoryClipboard::default());
        let (app, snapshots) = ChatApp::new(
            Arc::new(SimulatedReply::default()),
            Arc::new(SimulatedTester::default()),
            notifier.clone(),
            clipboard.clone(),
        );
        Fixture {
            app,
            snapshots,
            notifier,
            clipboard,
        }
    }

    fn init_tracing() {
        use tracing_subscriber::EnvFilter;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_message_end_to_end() {
        let mut f = fixture();

        f.app.send_message("Hello").unwrap();

        // First snapshot: user message landed, reply pending.
        let view = f.snapshots.recv().await.unwrap();
        assert_eq!(view.title, "Hello");
        assert!(view.is_generating);
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[0].content, "Hello");
        assert!(view.messages[1].is_typing);

        // Second snapshot: the simulated reply resolved.
        let view = f.snapshots.recv().await.unwrap();
        assert!(!view.is_generating);
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[1].role, Role::Assistant);
        assert_eq!(view.messages[1].content, SIMULATED_REPLY);
        assert!(!view.messages[1].is_typing);
        assert_eq!(view.sidebar.len(), 1);
        assert_eq!(view.sidebar[0].message_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_message_is_a_silent_noop() {
        let mut f = fixture();

        f.app.send_message("   ").unwrap();

        assert!(f.app.view().sidebar.is_empty());
        assert!(f.snapshots.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_generating_does_not_stack() {
        let f = fixture();

        f.app.send_message("first").unwrap();
        f.app.send_message("second").unwrap();

        let view = f.app.view();
        // One user message plus the typing placeholder.
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[0].content, "first");
        assert!(view.messages[1].is_typing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_generation_suppresses_reply() {
        let mut f = fixture();

        f.app.send_message("Hello").unwrap();
        f.app.stop_generation();

        tokio::time::sleep(SIMULATED_REPLY_LATENCY * 2).await;

        let view = f.app.view();
        assert!(!view.is_generating);
        assert_eq!(view.messages.len(), 1);

        // Drain the two command snapshots; no third snapshot may arrive.
        f.snapshots.recv().await.unwrap();
        f.snapshots.recv().await.unwrap();
        assert!(f.snapshots.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_active_conversation_cancels_pending_reply() {
        let f = fixture();

        f.app.send_message("Hello").unwrap();
        let id = f.app.view().sidebar[0].id.clone();
        f.app.delete_conversation(&id).unwrap();

        tokio::time::sleep(SIMULATED_REPLY_LATENCY * 2).await;

        assert!(f.app.view().sidebar.is_empty());
        assert!(f.notifier.toasts().contains(&"Conversation deleted".to_string()));
    }

    #[tokio::test]
    async fn test_rename_then_delete_active_conversation() {
        let f = fixture();

        let id = f.app.new_conversation();
        f.app.rename_conversation(&id, "My Chat").unwrap();
        f.app.delete_conversation(&id).unwrap();

        assert!(f.app.view().sidebar.is_empty());
        assert_eq!(f.app.view().title, crate::config::APP_NAME);
    }

    #[tokio::test]
    async fn test_copy_message_reaches_clipboard() {
        let f = fixture();

        f.app.copy_message("some answer");

        assert_eq!(f.clipboard.contents().as_deref(), Some("some answer"));
        assert!(f.notifier.toasts().contains(&"Copied to clipboard".to_string()));
    }

    #[tokio::test]
    async fn test_feedback_and_regenerate_only_notify() {
        let f = fixture();
        f.app.new_conversation();

        f.app.give_feedback("msg-1", Feedback::Like);
        f.app.give_feedback("msg-1", Feedback::Dislike);
        f.app.regenerate_message("msg-1");

        let toasts = f.notifier.toasts();
        assert!(toasts.iter().any(|t| t.contains("👍")));
        assert!(toasts.iter().any(|t| t.contains("👎")));
        assert!(toasts.contains(&"Regenerating response".to_string()));
        // No message was created or removed by any of the above.
        assert_eq!(f.app.view().sidebar[0].message_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_lifecycle_with_toasts() {
        let f = fixture();

        assert!(f.app.add_connection("", "AI/ML", "https://api.openai.com/v1", None).is_none());
        assert!(f
            .notifier
            .toasts()
            .contains(&"Name and endpoint are required".to_string()));

        let connection = f
            .app
            .add_connection("OpenAI GPT-4", "AI/ML", "https://api.openai.com/v1", Some("sk-1"))
            .unwrap();
        assert!(f.notifier.toasts().contains(&"OpenAI GPT-4 added".to_string()));

        assert!(f.app.toggle_connection(&connection.id).unwrap());

        f.app.test_connection(&connection.id).await.unwrap();
        let toasts = f.notifier.toasts();
        assert!(toasts.contains(&"Testing connection to OpenAI GPT-4".to_string()));
        assert!(toasts.contains(&"Connection to OpenAI GPT-4 succeeded".to_string()));

        f.app.delete_connection(&connection.id).unwrap();
        assert!(f.app.connections().is_empty());
    }

    #[tokio::test]
    async fn test_export_transcript() {
        let f = fixture();

        let id = f.app.new_conversation();
        f.app.rename_conversation(&id, "Notes").unwrap();
        let markdown = f.app.export_transcript(&id).unwrap();

        assert!(markdown.starts_with("# Notes\n"));
        assert!(f.app.export_transcript("nope").is_err());
    }
}

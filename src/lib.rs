pub mod app;
pub mod config;
pub mod models;
pub mod reply;
pub mod services;

pub use app::{ChatApp, Clipboard, Feedback, LogNotifier, MemoryClipboard, Notifier};
pub use models::{ApiConnection, Conversation, Message, Role};
pub use reply::{ReplyGenerator, SimulatedReply, SIMULATED_REPLY, SIMULATED_REPLY_LATENCY};
pub use services::connections::{
    ApiConnectionRegistry, ConnectionTester, RegistryError, SimulatedTester,
};
pub use services::dispatcher::{DispatchError, MessageDispatcher};
pub use services::store::{SessionStore, StoreError};
pub use services::view::{ChatView, ConnectionView, MessageView, SidebarEntry};

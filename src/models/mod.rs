pub mod connection;
pub mod conversation;
pub mod message;

pub use connection::ApiConnection;
pub use conversation::{Conversation, DEFAULT_TITLE};
pub use message::{Message, Role};

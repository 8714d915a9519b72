pub mod connections;
pub mod dispatcher;
pub mod store;
pub mod transcript;
pub mod view;

pub use connections::ApiConnectionRegistry;
pub use dispatcher::MessageDispatcher;
pub use store::SessionStore;
pub use view::ChatView;

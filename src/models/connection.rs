use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered external API connection, managed by the settings screen.
/// Shares no data with the conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConnection {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A conversation thread. `last_message` / `last_message_timestamp` are
/// denormalized previews of the most recent message, maintained by the
/// repository alongside every message insert.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub last_message: String,
    pub last_message_timestamp: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Chat {
    pub const DEFAULT_TITLE: &'static str = "New Chat";
}

impl Default for Chat {
    fn default() -> Self {
        let now = Utc::now().timestamp_millis();
        Chat {
            id: Uuid::new_v4().to_string(),
            title: Chat::DEFAULT_TITLE.to_string(),
            last_message: String::new(),
            last_message_timestamp: now,
            created_at: now,
            updated_at: now,
        }
    }
}

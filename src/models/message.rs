use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, Type};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "UPPERCASE")] // SQL value name
#[serde(rename_all = "UPPERCASE")] // JSON value name
pub enum MessageType {
    Text,
    File,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageSender {
    User,
    Agent,
}

/// Attachment payload, present iff the message has `MessageType::File`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub path: String,
    pub file_size: i64,
    pub thumbnail_path: Option<String>,
}

/// One unit of conversation content. Immutable once written; for file
/// messages `message` is an optional caption and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub message: String,
    pub message_type: MessageType,
    pub file: Option<FileAttachment>,
    pub sender: MessageSender,
    pub timestamp: i64,
}

impl Message {
    pub fn text(chat_id: &str, text: &str, sender: MessageSender, timestamp: i64) -> Self {
        Message {
            chat_id: chat_id.to_string(),
            message: text.to_string(),
            message_type: MessageType::Text,
            file: None,
            sender,
            timestamp,
            ..Default::default()
        }
    }

    pub fn file(
        chat_id: &str,
        file: FileAttachment,
        caption: &str,
        sender: MessageSender,
        timestamp: i64,
    ) -> Self {
        Message {
            chat_id: chat_id.to_string(),
            message: caption.to_string(),
            message_type: MessageType::File,
            file: Some(file),
            sender,
            timestamp,
            ..Default::default()
        }
    }
}

impl Default for Message {
    fn default() -> Self {
        Message {
            id: Uuid::new_v4().to_string(),
            chat_id: String::new(),
            message: String::new(),
            message_type: MessageType::Text,
            file: None,
            sender: MessageSender::User,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

// The optional attachment is embedded as three nullable columns, so the
// derive can't express it.
impl FromRow<'_, SqliteRow> for Message {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let file = match row.try_get::<Option<String>, _>("file_path")? {
            Some(path) => Some(FileAttachment {
                path,
                file_size: row.try_get::<Option<i64>, _>("file_size")?.unwrap_or(0),
                thumbnail_path: row.try_get("file_thumbnail_path")?,
            }),
            None => None,
        };

        Ok(Message {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            message: row.try_get("message")?,
            message_type: row.try_get("message_type")?,
            file,
            sender: row.try_get("sender")?,
            timestamp: row.try_get("timestamp")?,
        })
    }
}

use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{query, query_as, query_scalar, SqlitePool};
use tracing::debug;

use crate::models::{Chat, Message, MessageSender};
use crate::store::notify::{ChangeHub, StoreChange};

/// Schema statements, version 1. `rowid` doubles as the insertion-order
/// tie-breaker for both orderings, so neither table declares WITHOUT ROWID.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS chats (
        id TEXT PRIMARY KEY NOT NULL,
        title TEXT NOT NULL,
        last_message TEXT NOT NULL,
        last_message_timestamp INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY NOT NULL,
        chat_id TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
        message TEXT NOT NULL,
        message_type TEXT NOT NULL,
        file_path TEXT,
        file_size INTEGER,
        file_thumbnail_path TEXT,
        sender TEXT NOT NULL,
        timestamp INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_chat_id ON messages(chat_id)",
    "PRAGMA user_version = 1",
];

/// Durable storage for chats and messages over a single SQLite file.
/// Every write publishes a [`StoreChange`] so live queries can re-run.
#[derive(Clone)]
pub struct ChatStore {
    pool: SqlitePool,
    changes: ChangeHub,
}

impl ChatStore {
    /// Opens (creating if missing) the database at `url`, e.g.
    /// `sqlite://chats.db`, and brings the schema up.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// An in-memory store, used by tests and the demo binary. Single
    /// connection: each sqlite `:memory:` connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA {
            query(statement).execute(&pool).await?;
        }
        Ok(ChatStore {
            pool,
            changes: ChangeHub::new(),
        })
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) fn changes(&self) -> &ChangeHub {
        &self.changes
    }

    /// Upserts a single chat row, keyed by `id`.
    pub async fn upsert_chat(&self, chat: &Chat) -> Result<()> {
        self.write_chat(chat).await?;
        self.changes.publish(StoreChange::Chats);
        debug!("Chat upserted: {}", chat.id);
        Ok(())
    }

    /// Bulk upsert; one notification for the whole batch.
    pub async fn upsert_chats(&self, chats: &[Chat]) -> Result<()> {
        for chat in chats {
            self.write_chat(chat).await?;
        }
        if !chats.is_empty() {
            self.changes.publish(StoreChange::Chats);
        }
        debug!("{} chats upserted", chats.len());
        Ok(())
    }

    // Upsert in place rather than INSERT OR REPLACE: REPLACE deletes the
    // conflicting row first, and that delete would cascade into messages.
    async fn write_chat(&self, chat: &Chat) -> Result<()> {
        query(
            r#"
            INSERT INTO chats (id, title, last_message, last_message_timestamp, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                last_message = excluded.last_message,
                last_message_timestamp = excluded.last_message_timestamp,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&chat.id)
        .bind(&chat.title)
        .bind(&chat.last_message)
        .bind(chat.last_message_timestamp)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_message(&self, message: &Message) -> Result<()> {
        self.write_message(message).await?;
        self.changes.publish(StoreChange::Messages {
            chat_id: message.chat_id.clone(),
        });
        debug!("Message inserted: {} in chat {}", message.id, message.chat_id);
        Ok(())
    }

    /// Bulk upsert, preserving the given insertion order; one notification
    /// per distinct chat in the batch.
    pub async fn insert_messages(&self, messages: &[Message]) -> Result<()> {
        for message in messages {
            self.write_message(message).await?;
        }
        let mut notified: Vec<&str> = Vec::new();
        for message in messages {
            if !notified.contains(&message.chat_id.as_str()) {
                notified.push(&message.chat_id);
                self.changes.publish(StoreChange::Messages {
                    chat_id: message.chat_id.clone(),
                });
            }
        }
        debug!("{} messages inserted", messages.len());
        Ok(())
    }

    async fn write_message(&self, message: &Message) -> Result<()> {
        let (file_path, file_size, thumbnail_path) = match &message.file {
            Some(file) => (
                Some(file.path.as_str()),
                Some(file.file_size),
                file.thumbnail_path.as_deref(),
            ),
            None => (None, None, None),
        };
        query(
            r#"
            INSERT OR REPLACE INTO messages (id, chat_id, message, message_type, file_path, file_size, file_thumbnail_path, sender, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&message.id)
        .bind(&message.chat_id)
        .bind(&message.message)
        .bind(message.message_type)
        .bind(file_path)
        .bind(file_size)
        .bind(thumbnail_path)
        .bind(message.sender)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Point lookup, non-live. Used inside the repository's summary update.
    pub async fn get_chat(&self, chat_id: &str) -> Result<Option<Chat>> {
        let chat = query_as::<_, Chat>("SELECT * FROM chats WHERE id = ?1")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(chat)
    }

    /// All chats, most recent activity first.
    pub async fn list_chats(&self) -> Result<Vec<Chat>> {
        let chats = query_as::<_, Chat>(
            "SELECT * FROM chats ORDER BY last_message_timestamp DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(chats)
    }

    /// All messages of one chat, oldest first.
    pub async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let messages = query_as::<_, Message>(
            "SELECT * FROM messages WHERE chat_id = ?1 ORDER BY timestamp ASC, rowid ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    /// Deletes a chat; the foreign key cascades to its messages.
    pub async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        query("DELETE FROM chats WHERE id = ?1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        self.changes.publish(StoreChange::Chats);
        self.changes.publish(StoreChange::Messages {
            chat_id: chat_id.to_string(),
        });
        debug!("Chat deleted: {}", chat_id);
        Ok(())
    }

    pub async fn chat_count(&self) -> Result<i64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM chats")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn message_count(&self) -> Result<i64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn user_message_count(&self, chat_id: &str) -> Result<i64> {
        let count = query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE chat_id = ?1 AND sender = ?2",
        )
        .bind(chat_id)
        .bind(MessageSender::User)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

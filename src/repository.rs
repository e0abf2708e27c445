use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Result;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Chat, FileAttachment, Message, MessageSender};
use crate::store::{ChatPager, ChatStore, LiveStream, MessagePager};

/// Wall clock clamped to never go backwards within the process, so message
/// timestamps are non-decreasing in insertion order even across NTP steps.
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            last: AtomicI64::new(i64::MIN),
        }
    }

    pub fn now_millis(&self) -> i64 {
        let wall = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(observed) => prev = observed,
            }
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Character-boundary prefix. Truncation limits below are in characters,
/// not bytes.
fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The sole mutation and query gateway over the store: id generation,
/// timestamp stamping, chat-summary maintenance, paginated retrieval.
pub struct ChatRepository {
    store: ChatStore,
    clock: MonotonicClock,
}

impl ChatRepository {
    /// Max characters of message text used for an auto-set chat title.
    const TITLE_MAX_CHARS: usize = 50;
    /// Max characters of the denormalized `last_message` preview.
    const PREVIEW_MAX_CHARS: usize = 100;
    /// Preview text for an uncaptioned file message.
    const PHOTO_PREVIEW: &'static str = "Photo";

    pub fn new(store: ChatStore) -> Self {
        ChatRepository {
            store,
            clock: MonotonicClock::new(),
        }
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    /// Creates an empty chat titled "New Chat" and returns its id.
    pub async fn create_chat(&self) -> Result<String> {
        let now = self.clock.now_millis();
        let chat = Chat {
            id: Uuid::new_v4().to_string(),
            title: Chat::DEFAULT_TITLE.to_string(),
            last_message: String::new(),
            last_message_timestamp: now,
            created_at: now,
            updated_at: now,
        };
        self.store.upsert_chat(&chat).await?;
        debug!("Chat created: {}", chat.id);
        Ok(chat.id)
    }

    /// Persists a text message and refreshes the chat summary.
    pub async fn send_text_message(
        &self,
        chat_id: &str,
        text: &str,
        sender: MessageSender,
    ) -> Result<String> {
        let timestamp = self.clock.now_millis();
        let message = Message::text(chat_id, text, sender, timestamp);
        self.store.insert_message(&message).await?;
        self.update_chat_after_message(chat_id, text, timestamp, sender)
            .await?;
        Ok(message.id)
    }

    /// Persists a file message. The chat preview shows the caption when one
    /// was given, otherwise "Photo".
    pub async fn send_file_message(
        &self,
        chat_id: &str,
        file_path: &str,
        file_size: i64,
        thumbnail_path: Option<&str>,
        caption: &str,
        sender: MessageSender,
    ) -> Result<String> {
        let timestamp = self.clock.now_millis();
        let message = Message::file(
            chat_id,
            FileAttachment {
                path: file_path.to_string(),
                file_size,
                thumbnail_path: thumbnail_path.map(str::to_string),
            },
            caption,
            sender,
            timestamp,
        );
        self.store.insert_message(&message).await?;

        let preview = if caption.trim().is_empty() {
            Self::PHOTO_PREVIEW
        } else {
            caption
        };
        self.update_chat_after_message(chat_id, preview, timestamp, sender)
            .await?;
        Ok(message.id)
    }

    /// Denormalized-summary maintenance, shared by every message insert. A
    /// missing chat is a silent no-op; the message itself already persisted.
    async fn update_chat_after_message(
        &self,
        chat_id: &str,
        message_text: &str,
        timestamp: i64,
        sender: MessageSender,
    ) -> Result<()> {
        let Some(chat) = self.store.get_chat(chat_id).await? else {
            debug!("Chat {chat_id} gone before summary update, skipping");
            return Ok(());
        };

        let title = if chat.title == Chat::DEFAULT_TITLE && sender == MessageSender::User {
            let derived = take_chars(message_text, Self::TITLE_MAX_CHARS).trim();
            if derived.is_empty() {
                Chat::DEFAULT_TITLE.to_string()
            } else {
                derived.to_string()
            }
        } else {
            chat.title.clone()
        };

        let updated = Chat {
            title,
            last_message: take_chars(message_text, Self::PREVIEW_MAX_CHARS).to_string(),
            last_message_timestamp: timestamp,
            updated_at: timestamp,
            ..chat
        };
        self.store.upsert_chat(&updated).await
    }

    /// Renames a chat; no-op if the chat does not exist.
    pub async fn update_chat_title(&self, chat_id: &str, new_title: &str) -> Result<()> {
        let Some(chat) = self.store.get_chat(chat_id).await? else {
            return Ok(());
        };
        let updated = Chat {
            title: new_title.to_string(),
            updated_at: self.clock.now_millis(),
            ..chat
        };
        self.store.upsert_chat(&updated).await
    }

    pub async fn has_chats(&self) -> Result<bool> {
        Ok(self.store.chat_count().await? > 0)
    }

    pub async fn get_user_message_count(&self, chat_id: &str) -> Result<i64> {
        self.store.user_message_count(chat_id).await
    }

    /// First-launch bulk insert of canned chats and messages.
    pub async fn insert_seed_data(&self, chats: &[Chat], messages: &[Message]) -> Result<()> {
        self.store.upsert_chats(chats).await?;
        self.store.insert_messages(messages).await?;
        Ok(())
    }

    pub fn get_all_chats(&self) -> LiveStream<Vec<Chat>> {
        self.store.watch_chats()
    }

    pub fn get_messages_for_chat(&self, chat_id: &str) -> LiveStream<Vec<Message>> {
        self.store.watch_messages(chat_id)
    }

    pub fn get_chat_by_id(&self, chat_id: &str) -> LiveStream<Option<Chat>> {
        self.store.watch_chat(chat_id)
    }

    pub fn get_messages_for_chat_paged(&self, chat_id: &str) -> MessagePager {
        MessagePager::new(self.store.clone(), chat_id)
    }

    pub fn get_all_chats_paged(&self) -> ChatPager {
        ChatPager::new(self.store.clone())
    }
}

use anyhow::Result;
use sqlx::{query, FromRow, Row};

use crate::models::{Chat, Message};
use crate::store::db::ChatStore;

/// Position of a message within the `(timestamp ASC, rowid ASC)` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCursor {
    timestamp: i64,
    seq: i64,
}

/// Position of a chat within the `(last_message_timestamp DESC, rowid DESC)`
/// ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatCursor {
    last_message_timestamp: i64,
    seq: i64,
}

/// One keyset page. `next` continues in the direction the page was loaded;
/// `None` means the end was reached.
#[derive(Debug)]
pub struct KeysetPage<C, T> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

impl ChatStore {
    /// Messages of `chat_id` strictly after `cursor` in ascending order;
    /// `None` starts from the beginning of the thread.
    pub async fn page_messages_after(
        &self,
        chat_id: &str,
        cursor: Option<MessageCursor>,
        limit: usize,
    ) -> Result<KeysetPage<MessageCursor, Message>> {
        let after = cursor.unwrap_or(MessageCursor {
            timestamp: i64::MIN,
            seq: i64::MIN,
        });
        let rows = query(
            r#"
            SELECT *, rowid AS seq FROM messages
            WHERE chat_id = ?1 AND (timestamp > ?2 OR (timestamp = ?2 AND rowid > ?3))
            ORDER BY timestamp ASC, rowid ASC
            LIMIT ?4
            "#,
        )
        .bind(chat_id)
        .bind(after.timestamp)
        .bind(after.seq)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        let mut last = None;
        for row in &rows {
            last = Some(MessageCursor {
                timestamp: row.try_get("timestamp")?,
                seq: row.try_get("seq")?,
            });
            items.push(Message::from_row(row)?);
        }
        let next = if rows.len() == limit { last } else { None };
        Ok(KeysetPage { items, next })
    }

    /// Messages of `chat_id` strictly before `cursor`, returned in ascending
    /// order; `None` loads the tail of the thread. `next` points at the
    /// oldest returned message, for continuing backward.
    pub async fn page_messages_before(
        &self,
        chat_id: &str,
        cursor: Option<MessageCursor>,
        limit: usize,
    ) -> Result<KeysetPage<MessageCursor, Message>> {
        let before = cursor.unwrap_or(MessageCursor {
            timestamp: i64::MAX,
            seq: i64::MAX,
        });
        let rows = query(
            r#"
            SELECT *, rowid AS seq FROM messages
            WHERE chat_id = ?1 AND (timestamp < ?2 OR (timestamp = ?2 AND rowid < ?3))
            ORDER BY timestamp DESC, rowid DESC
            LIMIT ?4
            "#,
        )
        .bind(chat_id)
        .bind(before.timestamp)
        .bind(before.seq)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        // The scan runs newest-to-oldest; consumers want ascending order.
        let mut items = Vec::with_capacity(rows.len());
        let mut oldest = None;
        for row in rows.iter().rev() {
            items.push(Message::from_row(row)?);
        }
        if let Some(row) = rows.last() {
            oldest = Some(MessageCursor {
                timestamp: row.try_get("timestamp")?,
                seq: row.try_get("seq")?,
            });
        }
        let next = if rows.len() == limit { oldest } else { None };
        Ok(KeysetPage { items, next })
    }

    /// Chats strictly after `cursor` in the list ordering (most recent
    /// activity first); `None` starts from the top.
    pub async fn page_chats_after(
        &self,
        cursor: Option<ChatCursor>,
        limit: usize,
    ) -> Result<KeysetPage<ChatCursor, Chat>> {
        let after = cursor.unwrap_or(ChatCursor {
            last_message_timestamp: i64::MAX,
            seq: i64::MAX,
        });
        let rows = query(
            r#"
            SELECT *, rowid AS seq FROM chats
            WHERE last_message_timestamp < ?1 OR (last_message_timestamp = ?1 AND rowid < ?2)
            ORDER BY last_message_timestamp DESC, rowid DESC
            LIMIT ?3
            "#,
        )
        .bind(after.last_message_timestamp)
        .bind(after.seq)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        let mut last = None;
        for row in &rows {
            last = Some(ChatCursor {
                last_message_timestamp: row.try_get("last_message_timestamp")?,
                seq: row.try_get("seq")?,
            });
            items.push(Chat::from_row(row)?);
        }
        let next = if rows.len() == limit { last } else { None };
        Ok(KeysetPage { items, next })
    }
}

/// Incremental loader over one chat's thread. The initial window is the tail
/// (the newest messages, where the screen opens); scrolling up extends
/// backward page by page, new arrivals extend forward. Loaded pages are
/// never re-read.
pub struct MessagePager {
    store: ChatStore,
    chat_id: String,
    page_size: usize,
    prefetch_distance: usize,
    initial_load_size: usize,
    oldest: Option<MessageCursor>,
    newest: Option<MessageCursor>,
    exhausted_older: bool,
}

impl MessagePager {
    pub const PAGE_SIZE: usize = 10;
    pub const PREFETCH_DISTANCE: usize = 5;
    pub const INITIAL_LOAD_SIZE: usize = 15;

    pub fn new(store: ChatStore, chat_id: &str) -> Self {
        MessagePager {
            store,
            chat_id: chat_id.to_string(),
            page_size: Self::PAGE_SIZE,
            prefetch_distance: Self::PREFETCH_DISTANCE,
            initial_load_size: Self::INITIAL_LOAD_SIZE,
            oldest: None,
            newest: None,
            exhausted_older: false,
        }
    }

    /// Hint for the consumer: load the next older page once this few items
    /// remain above the viewport.
    pub fn should_prefetch(&self, remaining: usize) -> bool {
        remaining <= self.prefetch_distance && !self.exhausted_older
    }

    /// Loads the newest window of the thread.
    pub async fn load_initial(&mut self) -> Result<Vec<Message>> {
        let page = self
            .store
            .page_messages_before(&self.chat_id, None, self.initial_load_size)
            .await?;
        self.oldest = page.next;
        self.exhausted_older = page.next.is_none();
        self.newest = self
            .newest_cursor_of(&page.items)
            .await?
            .or(self.newest);
        Ok(page.items)
    }

    /// Next page of older messages, ascending; empty once the start of the
    /// thread has been reached.
    pub async fn load_older(&mut self) -> Result<Vec<Message>> {
        if self.exhausted_older || self.oldest.is_none() {
            return Ok(Vec::new());
        }
        let page = self
            .store
            .page_messages_before(&self.chat_id, self.oldest, self.page_size)
            .await?;
        self.oldest = page.next.or(self.oldest);
        self.exhausted_older = page.next.is_none();
        Ok(page.items)
    }

    /// Messages that arrived after the loaded window, ascending.
    pub async fn load_newer(&mut self) -> Result<Vec<Message>> {
        let page = self
            .store
            .page_messages_after(&self.chat_id, self.newest, self.page_size)
            .await?;
        if let Some(cursor) = self.newest_cursor_of(&page.items).await? {
            self.newest = Some(cursor);
        }
        Ok(page.items)
    }

    // page_messages_before hands back its backward continuation cursor, not
    // the forward one, so the newest bound is recovered from the items.
    async fn newest_cursor_of(&self, items: &[Message]) -> Result<Option<MessageCursor>> {
        let Some(last) = items.last() else {
            return Ok(None);
        };
        let seq: i64 = sqlx::query_scalar("SELECT rowid FROM messages WHERE id = ?1")
            .bind(&last.id)
            .fetch_one(self.store.pool())
            .await?;
        Ok(Some(MessageCursor {
            timestamp: last.timestamp,
            seq,
        }))
    }
}

/// Incremental loader over the chat list, top first.
pub struct ChatPager {
    store: ChatStore,
    page_size: usize,
    prefetch_distance: usize,
    cursor: Option<ChatCursor>,
    exhausted: bool,
}

impl ChatPager {
    pub const PAGE_SIZE: usize = 20;
    pub const PREFETCH_DISTANCE: usize = 5;

    pub fn new(store: ChatStore) -> Self {
        ChatPager {
            store,
            page_size: Self::PAGE_SIZE,
            prefetch_distance: Self::PREFETCH_DISTANCE,
            cursor: None,
            exhausted: false,
        }
    }

    pub fn should_prefetch(&self, remaining: usize) -> bool {
        remaining <= self.prefetch_distance && !self.exhausted
    }

    /// Next page in list order; empty once every chat has been loaded.
    pub async fn load_more(&mut self) -> Result<Vec<Chat>> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        let page = self.store.page_chats_after(self.cursor, self.page_size).await?;
        self.cursor = page.next.or(self.cursor);
        self.exhausted = page.next.is_none();
        Ok(page.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageSender;

    async fn seeded_store(message_count: usize) -> ChatStore {
        let store = ChatStore::in_memory().await.unwrap();
        let chat = Chat {
            id: "a".to_string(),
            ..Default::default()
        };
        store.upsert_chat(&chat).await.unwrap();
        for i in 0..message_count {
            let mut message =
                Message::text("a", &format!("msg {i}"), MessageSender::User, i as i64);
            message.id = format!("m{i:03}");
            store.insert_message(&message).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn after_pages_are_disjoint_and_ordered() {
        let store = seeded_store(25).await;

        let first = store.page_messages_after("a", None, 10).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].id, "m000");

        let second = store
            .page_messages_after("a", first.next, 10)
            .await
            .unwrap();
        assert_eq!(second.items[0].id, "m010");

        let third = store
            .page_messages_after("a", second.next, 10)
            .await
            .unwrap();
        assert_eq!(third.items.len(), 5);
        assert!(third.next.is_none());

        let mut all: Vec<String> = Vec::new();
        for page in [first.items, second.items, third.items] {
            all.extend(page.into_iter().map(|m| m.id));
        }
        let expected: Vec<String> = (0..25).map(|i| format!("m{i:03}")).collect();
        assert_eq!(all, expected);
    }

    #[tokio::test]
    async fn before_pages_walk_backward_from_the_tail() {
        let store = seeded_store(25).await;

        let tail = store.page_messages_before("a", None, 15).await.unwrap();
        assert_eq!(tail.items.len(), 15);
        assert_eq!(tail.items.first().unwrap().id, "m010");
        assert_eq!(tail.items.last().unwrap().id, "m024");

        let older = store
            .page_messages_before("a", tail.next, 10)
            .await
            .unwrap();
        assert_eq!(older.items.len(), 10);
        assert_eq!(older.items.first().unwrap().id, "m000");
        assert!(older.next.is_none() || older.items.len() == 10);
    }

    #[tokio::test]
    async fn keyset_pages_break_timestamp_ties_by_insertion_order() {
        let store = ChatStore::in_memory().await.unwrap();
        store
            .upsert_chat(&Chat {
                id: "a".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        for i in 0..6 {
            let mut message = Message::text("a", &format!("tied {i}"), MessageSender::User, 7);
            message.id = format!("t{i}");
            store.insert_message(&message).await.unwrap();
        }

        let first = store.page_messages_after("a", None, 4).await.unwrap();
        let second = store.page_messages_after("a", first.next, 4).await.unwrap();

        let ids: Vec<String> = first
            .items
            .into_iter()
            .chain(second.items)
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["t0", "t1", "t2", "t3", "t4", "t5"]);
    }

    #[tokio::test]
    async fn message_pager_initial_then_older_then_newer() {
        let store = seeded_store(30).await;
        let mut pager = MessagePager::new(store.clone(), "a");

        let initial = pager.load_initial().await.unwrap();
        assert_eq!(initial.len(), MessagePager::INITIAL_LOAD_SIZE);
        assert_eq!(initial.last().unwrap().id, "m029");

        let older = pager.load_older().await.unwrap();
        assert_eq!(older.len(), MessagePager::PAGE_SIZE);
        assert_eq!(older.first().unwrap().id, "m005");

        let oldest = pager.load_older().await.unwrap();
        assert_eq!(oldest.len(), 5);
        assert!(pager.load_older().await.unwrap().is_empty());

        // A new arrival shows up through the forward direction only.
        let mut fresh = Message::text("a", "fresh", MessageSender::User, 99);
        fresh.id = "m999".to_string();
        store.insert_message(&fresh).await.unwrap();

        let newer = pager.load_newer().await.unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].id, "m999");
        assert!(pager.load_newer().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn message_pager_prefetch_hint() {
        let store = seeded_store(30).await;
        let mut pager = MessagePager::new(store, "a");
        pager.load_initial().await.unwrap();

        assert!(pager.should_prefetch(MessagePager::PREFETCH_DISTANCE));
        assert!(!pager.should_prefetch(MessagePager::PREFETCH_DISTANCE + 1));
    }

    #[tokio::test]
    async fn chat_pager_pages_through_the_list() {
        let store = ChatStore::in_memory().await.unwrap();
        for i in 0..45 {
            let chat = Chat {
                id: format!("c{i:02}"),
                last_message_timestamp: i,
                ..Default::default()
            };
            store.upsert_chat(&chat).await.unwrap();
        }

        let mut pager = ChatPager::new(store);
        let first = pager.load_more().await.unwrap();
        assert_eq!(first.len(), ChatPager::PAGE_SIZE);
        assert_eq!(first[0].id, "c44");

        let second = pager.load_more().await.unwrap();
        assert_eq!(second.len(), ChatPager::PAGE_SIZE);
        let third = pager.load_more().await.unwrap();
        assert_eq!(third.len(), 5);
        assert!(pager.load_more().await.unwrap().is_empty());

        let mut all: Vec<String> = Vec::new();
        for page in [first, second, third] {
            all.extend(page.into_iter().map(|c| c.id));
        }
        let expected: Vec<String> = (0..45).rev().map(|i| format!("c{i:02}")).collect();
        assert_eq!(all, expected);
    }
}

use std::future::Future;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::models::{Chat, Message};
use crate::store::db::ChatStore;
use crate::store::notify::StoreChange;

/// A live query result stream. Emits the current result immediately, then a
/// fresh result after every relevant write. A failed re-run is delivered as
/// `Err` without ending the stream; the next successful run supersedes it.
pub type LiveStream<T> = mpsc::Receiver<Result<T>>;

/// Spawns the subscribe/re-query/publish loop behind every live query. The
/// task ends when the consumer drops its receiver.
pub(crate) fn live_query<T, P, Q, Fut>(store: &ChatStore, relevant: P, run: Q) -> LiveStream<T>
where
    T: Send + 'static,
    P: Fn(&StoreChange) -> bool + Send + 'static,
    Q: Fn(ChatStore) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send,
{
    let mut changes = store.changes().subscribe();
    let store = store.clone();
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        if tx.send(run(store.clone()).await).await.is_err() {
            return;
        }
        loop {
            match changes.recv().await {
                Ok(change) if relevant(&change) => {
                    if tx.send(run(store.clone()).await).await.is_err() {
                        return;
                    }
                }
                Ok(_) => {}
                // Missed notifications collapse into one re-run; the query
                // already sees every write that lagged past the buffer.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("live query lagged past {skipped} changes, re-running");
                    if tx.send(run(store.clone()).await).await.is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    });

    rx
}

impl ChatStore {
    /// Live chat list, ordered by most recent activity.
    pub fn watch_chats(&self) -> LiveStream<Vec<Chat>> {
        live_query(
            self,
            |change| matches!(change, StoreChange::Chats),
            |store| async move { store.list_chats().await },
        )
    }

    /// Live message list for one chat, oldest first.
    pub fn watch_messages(&self, chat_id: &str) -> LiveStream<Vec<Message>> {
        let id = chat_id.to_string();
        let query_id = id.clone();
        live_query(
            self,
            move |change| change.affects_chat_messages(&id),
            move |store| {
                let id = query_id.clone();
                async move { store.list_messages(&id).await }
            },
        )
    }

    /// Live point lookup of one chat row.
    pub fn watch_chat(&self, chat_id: &str) -> LiveStream<Option<Chat>> {
        let query_id = chat_id.to_string();
        live_query(
            self,
            |change| matches!(change, StoreChange::Chats),
            move |store| {
                let id = query_id.clone();
                async move { store.get_chat(&id).await }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageSender;

    fn chat(id: &str, ts: i64) -> Chat {
        Chat {
            id: id.to_string(),
            title: id.to_string(),
            last_message: String::new(),
            last_message_timestamp: ts,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[tokio::test]
    async fn watch_chats_emits_current_state_then_changes() {
        let store = ChatStore::in_memory().await.unwrap();
        let mut stream = store.watch_chats();

        assert!(stream.recv().await.unwrap().unwrap().is_empty());

        store.upsert_chat(&chat("a", 10)).await.unwrap();
        let chats = stream.recv().await.unwrap().unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, "a");
    }

    #[tokio::test]
    async fn watch_messages_ignores_other_chats() {
        let store = ChatStore::in_memory().await.unwrap();
        store.upsert_chat(&chat("a", 0)).await.unwrap();
        store.upsert_chat(&chat("b", 0)).await.unwrap();

        let mut stream = store.watch_messages("a");
        assert!(stream.recv().await.unwrap().unwrap().is_empty());

        store
            .insert_message(&Message::text("b", "elsewhere", MessageSender::User, 1))
            .await
            .unwrap();
        store
            .insert_message(&Message::text("a", "here", MessageSender::User, 2))
            .await
            .unwrap();

        // The next emission is for chat a's write only.
        let messages = stream.recv().await.unwrap().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "here");
    }

    #[tokio::test]
    async fn watch_chat_tracks_updates() {
        let store = ChatStore::in_memory().await.unwrap();
        let mut stream = store.watch_chat("a");

        assert!(stream.recv().await.unwrap().unwrap().is_none());

        store.upsert_chat(&chat("a", 10)).await.unwrap();
        let found = stream.recv().await.unwrap().unwrap().unwrap();
        assert_eq!(found.id, "a");

        let mut renamed = chat("a", 10);
        renamed.title = "Renamed".to_string();
        store.upsert_chat(&renamed).await.unwrap();
        let found = stream.recv().await.unwrap().unwrap().unwrap();
        assert_eq!(found.title, "Renamed");
    }

    #[tokio::test]
    async fn query_failure_is_an_item_not_the_end_of_the_stream() {
        let store = ChatStore::in_memory().await.unwrap();
        store.upsert_chat(&chat("a", 10)).await.unwrap();

        let mut stream = store.watch_chats();
        assert!(stream.recv().await.unwrap().is_ok());

        // Yank the table out from under the query.
        sqlx::query("ALTER TABLE chats RENAME TO chats_gone")
            .execute(store.pool())
            .await
            .unwrap();
        store.changes().publish(StoreChange::Chats);
        assert!(stream.recv().await.unwrap().is_err());

        // The subscription survives; the next successful run supersedes
        // the error.
        sqlx::query("ALTER TABLE chats_gone RENAME TO chats")
            .execute(store.pool())
            .await
            .unwrap();
        store.changes().publish(StoreChange::Chats);
        let chats = stream.recv().await.unwrap().unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, "a");
    }

    #[tokio::test]
    async fn dropping_the_receiver_ends_the_subscription() {
        let store = ChatStore::in_memory().await.unwrap();
        let stream = store.watch_chats();
        drop(stream);

        // Writes after the drop must not error or wedge the hub.
        store.upsert_chat(&chat("a", 10)).await.unwrap();
        store.upsert_chat(&chat("b", 20)).await.unwrap();
        assert_eq!(store.chat_count().await.unwrap(), 2);
    }
}

use std::sync::Arc;

use anyhow::Result;
use rand::{thread_rng, Rng};
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::models::MessageSender;
use crate::repository::ChatRepository;

/// Canned agent replies.
pub const TEXT_RESPONSES: [&str; 5] = [
    "I'm looking into that for you.",
    "Let me check the details.",
    "Got it! I'll help you with that.",
    "That's a great question. Here's what I found...",
    "I've processed your request.",
];

/// Canned agent image attachments.
pub const PLACEHOLDER_IMAGES: [&str; 5] = [
    "https://picsum.photos/400/300",
    "https://images.unsplash.com/photo-1436491865332-7a61a109cc05?w=400",
    "https://images.unsplash.com/photo-1436491865332-7a61a109cc05?w=100",
    "https://images.unsplash.com/photo-1464037866556-6812c9d1c72e?w=400",
    "https://images.unsplash.com/photo-1464037866556-6812c9d1c72e?w=100",
];

/// Whether the agent replies to the `user_message_count`-th user message
/// under the given threshold. The threshold is freshly drawn per send, so
/// the cadence is bursty rather than periodic.
pub fn should_reply(user_message_count: i64, threshold: i64) -> bool {
    user_message_count % threshold == 0
}

/// Simulated conversational agent: holds no state of its own, derives every
/// decision from the repository plus fresh randomness.
pub struct AgentSimulator {
    repository: Arc<ChatRepository>,
}

impl AgentSimulator {
    const THRESHOLD_RANGE: std::ops::Range<i64> = 4..8;
    const THINKING_DELAY_MS: std::ops::Range<u64> = 1000..2000;
    const FILE_SIZE_RANGE: std::ops::Range<i64> = 100_000..500_000;
    const TEXT_REPLY_PROBABILITY: f64 = 0.7;

    pub fn new(repository: Arc<ChatRepository>) -> Self {
        AgentSimulator { repository }
    }

    /// Post-send hook. Only user messages can trigger a reply; anything that
    /// goes wrong is logged and swallowed, never surfaced to the sender.
    pub async fn process_message_and_maybe_reply(&self, chat_id: &str, is_user_message: bool) {
        if !is_user_message {
            return;
        }
        let threshold = thread_rng().gen_range(Self::THRESHOLD_RANGE);
        if let Err(error) = self.maybe_reply(chat_id, threshold).await {
            warn!("Agent reply for chat {chat_id} failed: {error:#}");
        }
    }

    pub(crate) async fn maybe_reply(&self, chat_id: &str, threshold: i64) -> Result<()> {
        let count = self.repository.get_user_message_count(chat_id).await?;
        debug!("Chat {chat_id}: {count} user messages, threshold {threshold}");
        if !should_reply(count, threshold) {
            return Ok(());
        }

        let thinking_delay = thread_rng().gen_range(Self::THINKING_DELAY_MS);
        sleep(Duration::from_millis(thinking_delay)).await;

        if thread_rng().gen::<f64>() <= Self::TEXT_REPLY_PROBABILITY {
            let response = TEXT_RESPONSES[thread_rng().gen_range(0..TEXT_RESPONSES.len())];
            self.repository
                .send_text_message(chat_id, response, MessageSender::Agent)
                .await?;
        } else {
            // One draw covers both the image and its thumbnail.
            let image_url = PLACEHOLDER_IMAGES[thread_rng().gen_range(0..PLACEHOLDER_IMAGES.len())];
            let file_size = thread_rng().gen_range(Self::FILE_SIZE_RANGE);
            self.repository
                .send_file_message(
                    chat_id,
                    image_url,
                    file_size,
                    Some(image_url),
                    "",
                    MessageSender::Agent,
                )
                .await?;
        }
        debug!("Agent replied in chat {chat_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageType;
    use crate::store::ChatStore;

    async fn fixtures() -> (Arc<ChatRepository>, AgentSimulator) {
        let store = ChatStore::in_memory().await.unwrap();
        let repository = Arc::new(ChatRepository::new(store));
        let simulator = AgentSimulator::new(repository.clone());
        (repository, simulator)
    }

    #[test]
    fn fires_on_every_fifth_user_message_under_fixed_threshold() {
        for n in 1..=20 {
            assert_eq!(should_reply(n, 5), n % 5 == 0, "count {n}");
        }
        assert!(should_reply(5, 5));
        assert!(should_reply(10, 5));
        assert!(should_reply(15, 5));
        assert!(!should_reply(4, 5));
        assert!(!should_reply(6, 5));
    }

    #[tokio::test]
    async fn replies_as_agent_when_the_threshold_divides_the_count() {
        let (repository, simulator) = fixtures().await;
        let chat_id = repository.create_chat().await.unwrap();
        repository
            .send_text_message(&chat_id, "hello", MessageSender::User)
            .await
            .unwrap();

        simulator.maybe_reply(&chat_id, 1).await.unwrap();

        let messages = repository.store().list_messages(&chat_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        let reply = &messages[1];
        assert_eq!(reply.sender, MessageSender::Agent);
        match reply.message_type {
            MessageType::Text => {
                assert!(TEXT_RESPONSES.contains(&reply.message.as_str()));
            }
            MessageType::File => {
                let file = reply.file.as_ref().unwrap();
                assert!(PLACEHOLDER_IMAGES.contains(&file.path.as_str()));
                assert_eq!(file.thumbnail_path.as_deref(), Some(file.path.as_str()));
                assert!((100_000..500_000).contains(&file.file_size));
                assert_eq!(reply.message, "");
            }
        }
    }

    #[tokio::test]
    async fn stays_silent_when_the_threshold_does_not_divide_the_count() {
        let (repository, simulator) = fixtures().await;
        let chat_id = repository.create_chat().await.unwrap();
        repository
            .send_text_message(&chat_id, "hello", MessageSender::User)
            .await
            .unwrap();

        simulator.maybe_reply(&chat_id, 5).await.unwrap();

        let messages = repository.store().list_messages(&chat_id).await.unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn agent_sends_never_trigger_the_engine() {
        let (repository, simulator) = fixtures().await;
        let chat_id = repository.create_chat().await.unwrap();
        repository
            .send_text_message(&chat_id, "agent says", MessageSender::Agent)
            .await
            .unwrap();

        simulator
            .process_message_and_maybe_reply(&chat_id, false)
            .await;

        let messages = repository.store().list_messages(&chat_id).await.unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn reply_refreshes_the_chat_summary() {
        let (repository, simulator) = fixtures().await;
        let chat_id = repository.create_chat().await.unwrap();
        repository
            .send_text_message(&chat_id, "ping", MessageSender::User)
            .await
            .unwrap();

        simulator.maybe_reply(&chat_id, 1).await.unwrap();

        let chat = repository.store().get_chat(&chat_id).await.unwrap().unwrap();
        let messages = repository.store().list_messages(&chat_id).await.unwrap();
        let reply = messages.last().unwrap();
        assert_eq!(chat.last_message_timestamp, reply.timestamp);
        // The user message titled the chat; the agent reply must not.
        assert_eq!(chat.title, "ping");
    }

    #[tokio::test]
    async fn failures_are_swallowed_by_the_public_entry_point() {
        let (_repository, simulator) = fixtures().await;
        // Unknown chat: the count query returns 0, 0 % n == 0 fires, and the
        // insert fails on the foreign key. None of it escapes.
        simulator
            .process_message_and_maybe_reply("no-such-chat", true)
            .await;
    }
}

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::{Chat, Message, MessageSender};
use crate::repository::ChatRepository;
use crate::simulator::AgentSimulator;

/// Presentation-ready projection of a live query. Every new emission or
/// error replaces the current state; a later success clears a prior error.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUiState<T> {
    Loading,
    Success(T),
    Empty,
    Error(String),
}

/// Projects the live chat list into `ChatUiState` for the list screen.
/// Dropping the projector cancels its subscription.
pub struct ChatListProjector {
    state: watch::Receiver<ChatUiState<Vec<Chat>>>,
    task: JoinHandle<()>,
}

impl ChatListProjector {
    pub fn new(repository: &ChatRepository) -> Self {
        let (tx, rx) = watch::channel(ChatUiState::Loading);
        let mut stream = repository.get_all_chats();
        let task = tokio::spawn(async move {
            while let Some(result) = stream.recv().await {
                let next = match result {
                    Ok(chats) if chats.is_empty() => ChatUiState::Empty,
                    Ok(chats) => ChatUiState::Success(chats),
                    Err(error) => ChatUiState::Error(error.to_string()),
                };
                if tx.send(next).is_err() {
                    return;
                }
            }
        });
        ChatListProjector { state: rx, task }
    }

    pub fn state(&self) -> watch::Receiver<ChatUiState<Vec<Chat>>> {
        self.state.clone()
    }
}

impl Drop for ChatListProjector {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Per-screen state for one open chat: live message and chat projections
/// plus ephemeral UI-only state (draft, title editing, fullscreen image)
/// that never touches the store. Every task it spawns — subscriptions,
/// sends, pending agent replies — dies with the session.
pub struct ChatDetailSession {
    chat_id: String,
    repository: Arc<ChatRepository>,
    simulator: Arc<AgentSimulator>,
    messages_tx: Arc<watch::Sender<ChatUiState<Vec<Message>>>>,
    messages_rx: watch::Receiver<ChatUiState<Vec<Message>>>,
    chat_rx: watch::Receiver<ChatUiState<Chat>>,
    message_draft: String,
    is_editing_title: bool,
    edited_title: String,
    fullscreen_image: Option<String>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChatDetailSession {
    pub fn new(
        repository: Arc<ChatRepository>,
        simulator: Arc<AgentSimulator>,
        chat_id: &str,
    ) -> Self {
        let (messages_tx, messages_rx) = watch::channel(ChatUiState::Loading);
        let messages_tx = Arc::new(messages_tx);
        let (chat_tx, chat_rx) = watch::channel(ChatUiState::Loading);
        let mut tasks = Vec::new();

        let mut message_stream = repository.get_messages_for_chat(chat_id);
        let observer_tx = messages_tx.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(result) = message_stream.recv().await {
                let next = match result {
                    Ok(messages) => ChatUiState::Success(messages),
                    Err(error) => ChatUiState::Error(error.to_string()),
                };
                if observer_tx.send(next).is_err() {
                    return;
                }
            }
        }));

        let mut chat_stream = repository.get_chat_by_id(chat_id);
        tasks.push(tokio::spawn(async move {
            while let Some(result) = chat_stream.recv().await {
                let next = match result {
                    Ok(Some(chat)) => ChatUiState::Success(chat),
                    Ok(None) => ChatUiState::Error("Chat not found".to_string()),
                    Err(error) => ChatUiState::Error(error.to_string()),
                };
                if chat_tx.send(next).is_err() {
                    return;
                }
            }
        }));

        ChatDetailSession {
            chat_id: chat_id.to_string(),
            repository,
            simulator,
            messages_tx,
            messages_rx,
            chat_rx,
            message_draft: String::new(),
            is_editing_title: false,
            edited_title: String::new(),
            fullscreen_image: None,
            tasks,
        }
    }

    pub fn messages_state(&self) -> watch::Receiver<ChatUiState<Vec<Message>>> {
        self.messages_rx.clone()
    }

    pub fn chat_state(&self) -> watch::Receiver<ChatUiState<Chat>> {
        self.chat_rx.clone()
    }

    pub fn message_draft(&self) -> &str {
        &self.message_draft
    }

    pub fn update_message_draft(&mut self, draft: &str) {
        self.message_draft = draft.to_string();
    }

    /// Sends the current draft as the user. A draft that trims to nothing is
    /// silently skipped. The write and the follow-up agent trigger run in a
    /// detached task so the UI never blocks on storage.
    pub fn send_message(&mut self) {
        self.prune_finished_tasks();
        let text = self.message_draft.trim().to_string();
        if text.is_empty() {
            return;
        }
        self.message_draft.clear();

        let repository = self.repository.clone();
        let simulator = self.simulator.clone();
        let chat_id = self.chat_id.clone();
        let messages_tx = self.messages_tx.clone();
        self.tasks.push(tokio::spawn(async move {
            match repository
                .send_text_message(&chat_id, &text, MessageSender::User)
                .await
            {
                Ok(_) => {
                    simulator
                        .process_message_and_maybe_reply(&chat_id, true)
                        .await;
                }
                Err(error) => {
                    let _ = messages_tx.send(ChatUiState::Error(format!(
                        "Failed to send message: {error}"
                    )));
                }
            }
        }));
    }

    /// Sends an image picked or captured by the user; `path` and `size` come
    /// from the capture surface.
    pub fn send_image_message(&mut self, path: &str, size: i64) {
        self.prune_finished_tasks();
        let repository = self.repository.clone();
        let simulator = self.simulator.clone();
        let chat_id = self.chat_id.clone();
        let messages_tx = self.messages_tx.clone();
        let path = path.to_string();
        self.tasks.push(tokio::spawn(async move {
            match repository
                .send_file_message(&chat_id, &path, size, Some(&path), "", MessageSender::User)
                .await
            {
                Ok(_) => {
                    simulator
                        .process_message_and_maybe_reply(&chat_id, true)
                        .await;
                }
                Err(error) => {
                    let _ = messages_tx
                        .send(ChatUiState::Error(format!("Failed to send image: {error}")));
                }
            }
        }));
    }

    pub fn is_editing_title(&self) -> bool {
        self.is_editing_title
    }

    pub fn edited_title(&self) -> &str {
        &self.edited_title
    }

    pub fn start_editing_title(&mut self) {
        if let ChatUiState::Success(chat) = &*self.chat_rx.borrow() {
            self.edited_title = chat.title.clone();
            self.is_editing_title = true;
        }
    }

    pub fn update_edited_title(&mut self, title: &str) {
        self.edited_title = title.to_string();
    }

    /// Persists the edit buffer as the new title; an empty trimmed buffer
    /// just closes the editor.
    pub fn save_title(&mut self) {
        self.prune_finished_tasks();
        let new_title = self.edited_title.trim().to_string();
        self.is_editing_title = false;
        if new_title.is_empty() {
            return;
        }
        let repository = self.repository.clone();
        let chat_id = self.chat_id.clone();
        let messages_tx = self.messages_tx.clone();
        self.tasks.push(tokio::spawn(async move {
            if let Err(error) = repository.update_chat_title(&chat_id, &new_title).await {
                let _ = messages_tx.send(ChatUiState::Error(format!(
                    "Failed to update title: {error}"
                )));
            }
        }));
    }

    pub fn cancel_editing_title(&mut self) {
        self.is_editing_title = false;
    }

    pub fn fullscreen_image(&self) -> Option<&str> {
        self.fullscreen_image.as_deref()
    }

    pub fn show_image_fullscreen(&mut self, image_path: &str) {
        self.fullscreen_image = Some(image_path.to_string());
    }

    pub fn close_image_fullscreen(&mut self) {
        self.fullscreen_image = None;
    }

    // Sessions can outlive many sends; keep only handles that still need
    // aborting on close.
    fn prune_finished_tasks(&mut self) {
        self.tasks.retain(|task| !task.is_finished());
    }

    /// Tears the screen down: cancels subscriptions, in-flight sends and any
    /// pending agent reply. A reply whose thinking delay has not elapsed yet
    /// is dropped on purpose.
    pub fn close(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        debug!("Chat detail session closed: {}", self.chat_id);
    }
}

impl Drop for ChatDetailSession {
    fn drop(&mut self) {
        self.close();
    }
}

use tokio::sync::broadcast;

/// A write that invalidates live queries. Chat-row changes carry no id
/// because both the chat list and every point lookup depend on ordering
/// across all rows; message changes are scoped to their chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Chats,
    Messages { chat_id: String },
}

impl StoreChange {
    /// Whether this change touches the message set of `chat_id`.
    pub fn affects_chat_messages(&self, chat_id: &str) -> bool {
        matches!(self, StoreChange::Messages { chat_id: id } if id == chat_id)
    }
}

/// Fan-out point for store writes. Every subscriber sees every change;
/// filtering for relevance happens on the subscriber side.
#[derive(Debug, Clone)]
pub struct ChangeHub {
    tx: broadcast::Sender<StoreChange>,
}

impl ChangeHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        ChangeHub { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.tx.subscribe()
    }

    pub fn publish(&self, change: StoreChange) {
        // Err just means nobody is listening right now.
        let _ = self.tx.send(change);
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

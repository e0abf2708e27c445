//! Local-first chat core: SQLite-backed chat/message persistence with live
//! query streams, keyset pagination, and a scripted agent that probabilistically
//! replies to user messages.

pub mod config;
pub mod format;
pub mod models;
pub mod repository;
pub mod seed;
pub mod simulator;
pub mod state;
pub mod store;

pub use config::AppConfig;
pub use models::{Chat, FileAttachment, Message, MessageSender, MessageType};
pub use repository::ChatRepository;
pub use simulator::AgentSimulator;
pub use state::{ChatDetailSession, ChatListProjector, ChatUiState};
pub use store::ChatStore;

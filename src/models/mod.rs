pub mod chat;
pub mod message;

pub use chat::Chat;
pub use message::{FileAttachment, Message, MessageSender, MessageType};

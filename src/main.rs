use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatcore::{
    format, seed, AgentSimulator, AppConfig, ChatDetailSession, ChatListProjector, ChatRepository,
    ChatStore, ChatUiState, MessageSender,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let store = ChatStore::connect(&config.database_url).await?;
    let repository = Arc::new(ChatRepository::new(store));
    let simulator = Arc::new(AgentSimulator::new(repository.clone()));

    // One-time bootstrap; a store that already has chats is left alone.
    seed::initialize(&repository).await;

    let projector = ChatListProjector::new(&repository);
    let mut list_state = projector.state();
    let state = list_state
        .wait_for(|s| !matches!(s, ChatUiState::Loading))
        .await?;

    println!("Chats:");
    match &*state {
        ChatUiState::Success(chats) => {
            for chat in chats {
                println!(
                    "  [{}] {} — {}",
                    format::format_chat_list_time(chat.last_message_timestamp),
                    chat.title,
                    chat.last_message,
                );
            }
        }
        ChatUiState::Empty => println!("  (no chats)"),
        ChatUiState::Error(message) => println!("  error: {message}"),
        ChatUiState::Loading => {}
    }
    drop(state);

    // Scripted conversation in a fresh chat. The agent may or may not chime
    // in, depending on its per-send threshold draw.
    let chat_id = repository.create_chat().await?;
    info!("Created demo chat {chat_id}");

    let mut session = ChatDetailSession::new(repository.clone(), simulator.clone(), &chat_id);
    for text in [
        "Book me a flight to Mumbai",
        "Morning departure, please",
        "Window seat if possible",
        "What about the return leg?",
    ] {
        session.update_message_draft(text);
        session.send_message();
        sleep(Duration::from_millis(300)).await;
    }

    // Leave room for a thinking delay before reading the thread back.
    sleep(Duration::from_millis(2500)).await;

    println!("\nThread \"{chat_id}\":");
    for message in repository.store().list_messages(&chat_id).await? {
        let who = match message.sender {
            MessageSender::User => "you",
            MessageSender::Agent => "agent",
        };
        let body = match &message.file {
            Some(file) => format!(
                "[image {} ({})] {}",
                file.path,
                format::format_file_size(file.file_size),
                message.message
            ),
            None => message.message.clone(),
        };
        println!(
            "  {} {}: {}",
            format::format_message_time(message.timestamp),
            who,
            body
        );
    }

    session.close();
    Ok(())
}

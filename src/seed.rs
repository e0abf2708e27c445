use tracing::{debug, warn};

use crate::models::{Chat, FileAttachment, Message, MessageSender, MessageType};
use crate::repository::ChatRepository;

/// First-launch bootstrap: if the store holds no chats yet, inserts the
/// canned conversations in one bulk write. Failures are logged and ignored;
/// the app simply starts with an empty list.
pub async fn initialize(repository: &ChatRepository) {
    let result = async {
        if repository.has_chats().await? {
            return anyhow::Ok(false);
        }
        repository
            .insert_seed_data(&seed_chats(), &seed_messages())
            .await?;
        Ok(true)
    }
    .await;

    match result {
        Ok(true) => debug!("Seed data initialized"),
        Ok(false) => debug!("Store already populated, seed skipped"),
        Err(error) => warn!("Seeding failed: {error:#}"),
    }
}

pub fn seed_chats() -> Vec<Chat> {
    vec![
        Chat {
            id: "chat-001".to_string(),
            title: "Mumbai Flight Booking".to_string(),
            last_message: "The second option looks perfect! How do I proceed?".to_string(),
            last_message_timestamp: 1703520480000,
            created_at: 1703520000000,
            updated_at: 1703520480000,
        },
        Chat {
            id: "chat-002".to_string(),
            title: "Hotel Reservation Help".to_string(),
            last_message: "I've found 5 hotels in that area. Here's a comparison.".to_string(),
            last_message_timestamp: 1703450000000,
            created_at: 1703440000000,
            updated_at: 1703450000000,
        },
        Chat {
            id: "chat-003".to_string(),
            title: "Restaurant Recommendations".to_string(),
            last_message: "Thanks! I'll check them out.".to_string(),
            last_message_timestamp: 1703380000000,
            created_at: 1703370000000,
            updated_at: 1703380000000,
        },
    ]
}

pub fn seed_messages() -> Vec<Message> {
    let mut messages = Vec::new();

    let text = |id: &str, chat_id: &str, body: &str, sender: MessageSender, timestamp: i64| Message {
        id: id.to_string(),
        chat_id: chat_id.to_string(),
        message: body.to_string(),
        message_type: MessageType::Text,
        file: None,
        sender,
        timestamp,
    };

    // chat-001: flight booking, including the two image attachments.
    messages.push(text(
        "msg-001",
        "chat-001",
        "Hi! I need help booking a flight to Mumbai.",
        MessageSender::User,
        1703520000000,
    ));
    messages.push(text(
        "msg-002",
        "chat-001",
        "Hello! I'd be happy to help you book a flight to Mumbai. When are you planning to travel?",
        MessageSender::Agent,
        1703520030000,
    ));
    messages.push(text(
        "msg-003",
        "chat-001",
        "Next Friday, December 29th.",
        MessageSender::User,
        1703520090000,
    ));
    messages.push(text(
        "msg-004",
        "chat-001",
        "Great! And when would you like to return?",
        MessageSender::Agent,
        1703520120000,
    ));
    messages.push(text(
        "msg-005",
        "chat-001",
        "January 5th. Also, I prefer morning flights.",
        MessageSender::User,
        1703520180000,
    ));
    messages.push(text(
        "msg-006",
        "chat-001",
        "Perfect! Let me search for morning flights from your location to Mumbai. Could you also share your departure city?",
        MessageSender::Agent,
        1703520210000,
    ));
    messages.push(Message {
        id: "msg-007".to_string(),
        chat_id: "chat-001".to_string(),
        message: "Bangalore. Here's a screenshot of my preferred airline.".to_string(),
        message_type: MessageType::File,
        file: Some(FileAttachment {
            path: "https://images.unsplash.com/photo-1436491865332-7a61a109cc05?w=400".to_string(),
            file_size: 245680,
            thumbnail_path: Some(
                "https://images.unsplash.com/photo-1436491865332-7a61a109cc05?w=100".to_string(),
            ),
        }),
        sender: MessageSender::User,
        timestamp: 1703520300000,
    });
    messages.push(text(
        "msg-008",
        "chat-001",
        "Thanks for sharing! I can see you prefer IndiGo. Let me find the best options for you.",
        MessageSender::Agent,
        1703520330000,
    ));
    messages.push(Message {
        id: "msg-009".to_string(),
        chat_id: "chat-001".to_string(),
        message: "Flight options comparison".to_string(),
        message_type: MessageType::File,
        file: Some(FileAttachment {
            path: "https://images.unsplash.com/photo-1464037866556-6812c9d1c72e?w=400".to_string(),
            file_size: 189420,
            thumbnail_path: Some(
                "https://images.unsplash.com/photo-1464037866556-6812c9d1c72e?w=100".to_string(),
            ),
        }),
        sender: MessageSender::Agent,
        timestamp: 1703520420000,
    });
    messages.push(text(
        "msg-010",
        "chat-001",
        "The second option looks perfect! How do I proceed?",
        MessageSender::User,
        1703520480000,
    ));

    // chat-002: hotel reservation.
    messages.push(text(
        "msg-011",
        "chat-002",
        "I need a hotel near Mumbai airport for 3 nights.",
        MessageSender::User,
        1703440000000,
    ));
    messages.push(text(
        "msg-012",
        "chat-002",
        "Sure! What's your budget range and preferred star rating?",
        MessageSender::Agent,
        1703440030000,
    ));
    messages.push(text(
        "msg-013",
        "chat-002",
        "Around ₹5000 per night, 4-star would be great.",
        MessageSender::User,
        1703440090000,
    ));
    messages.push(text(
        "msg-014",
        "chat-002",
        "I've found 5 hotels in that area. Here's a comparison.",
        MessageSender::Agent,
        1703450000000,
    ));

    // chat-003: restaurants.
    messages.push(text(
        "msg-015",
        "chat-003",
        "Can you recommend some good restaurants in Bangalore?",
        MessageSender::User,
        1703370000000,
    ));
    messages.push(text(
        "msg-016",
        "chat-003",
        "Of course! What type of cuisine are you interested in?",
        MessageSender::Agent,
        1703370030000,
    ));
    messages.push(text(
        "msg-017",
        "chat-003",
        "I love Indian and Italian food!",
        MessageSender::User,
        1703370090000,
    ));
    messages.push(text(
        "msg-018",
        "chat-003",
        "Great choices! Here are my top recommendations: Karavalli for authentic coastal Indian cuisine, and Toscano for excellent Italian dishes. Both have great ambiance and are highly rated!",
        MessageSender::Agent,
        1703370150000,
    ));
    messages.push(text(
        "msg-019",
        "chat-003",
        "Thanks! I'll check them out.",
        MessageSender::User,
        1703380000000,
    ));

    messages
}

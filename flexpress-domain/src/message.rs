use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use flexpress_shared::events::MessageReceivedEvent;

/// A chat message within a match conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl From<MessageReceivedEvent> for Message {
    fn from(ev: MessageReceivedEvent) -> Self {
        Self {
            id: ev.message_id,
            conversation_id: ev.conversation_id,
            sender_id: ev.sender_id,
            body: ev.body,
            sent_at: DateTime::from_timestamp(ev.sent_at, 0).unwrap_or_else(Utc::now),
        }
    }
}

use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct MessageReceivedEvent {
    pub message_id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub sent_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct TypingEvent {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct MatchAcceptedEvent {
    pub match_id: Uuid,
    pub conversation_id: Uuid,
    pub charter_id: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct CreditApprovedEvent {
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub credits: i64,
    pub amount: i64,
    pub timestamp: i64,
}

/// Everything the realtime channel can deliver to a connected client.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    MessageReceived(MessageReceivedEvent),
    Typing(TypingEvent),
    MatchAccepted(MatchAcceptedEvent),
    CreditApproved(CreditApprovedEvent),
}

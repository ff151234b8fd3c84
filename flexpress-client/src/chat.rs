use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use flexpress_cache::store::QueryCache;
use flexpress_domain::message::Message;
use flexpress_shared::events::{MessageReceivedEvent, RealtimeEvent, TypingEvent};

use crate::guard::InFlightGuard;
use crate::realtime::RealtimeChannel;
use crate::session::SessionHandle;
use crate::toast::Toaster;
use crate::transport::{ApiTransport, CreateReportRequest, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not signed in")]
    NotSignedIn,

    #[error("action already in flight")]
    AlreadyInFlight,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Messaging inside an accepted match's conversation.
///
/// Sending is two-phase: persist over REST, append the persisted response to
/// the cache, then broadcast over the realtime channel for low-latency
/// delivery to the counterpart. The sender's own view comes from the REST
/// response alone; a failed broadcast is logged and otherwise ignored, and
/// the later echo of the same message id is deduplicated by the cache.
pub struct ConversationController {
    transport: Arc<dyn ApiTransport>,
    cache: Arc<QueryCache>,
    realtime: Arc<dyn RealtimeChannel>,
    session: Arc<SessionHandle>,
    toaster: Arc<Toaster>,
    guard: InFlightGuard,
}

impl ConversationController {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        cache: Arc<QueryCache>,
        realtime: Arc<dyn RealtimeChannel>,
        session: Arc<SessionHandle>,
        toaster: Arc<Toaster>,
        guard: InFlightGuard,
    ) -> Self {
        Self { transport, cache, realtime, session, toaster, guard }
    }

    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        body: &str,
    ) -> Result<Message, ChatError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ChatError::Validation("message cannot be empty".to_string()));
        }
        if self.session.user_id().is_none() {
            return Err(ChatError::NotSignedIn);
        }

        // Dedupe is by server-minted id, so a double submission would
        // otherwise persist the same text twice.
        let _token = self
            .guard
            .begin(format!("send-message:{}", conversation_id))
            .ok_or(ChatError::AlreadyInFlight)?;

        let message = self.transport.send_message(conversation_id, body).await?;
        self.cache.append_message(message.clone());

        let event = RealtimeEvent::MessageReceived(MessageReceivedEvent {
            message_id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            body: message.body.clone(),
            sent_at: message.sent_at.timestamp(),
        });
        if let Err(e) = self.realtime.broadcast(event).await {
            // Counterpart catches up on its next poll.
            warn!(message_id = %message.id, "realtime broadcast failed: {}", e);
        }

        Ok(message)
    }

    /// Fire a typing indicator at the counterpart. Pure push, no REST side.
    pub async fn notify_typing(&self, conversation_id: Uuid) {
        let Some(user_id) = self.session.user_id() else { return };
        let event = RealtimeEvent::Typing(TypingEvent {
            conversation_id,
            user_id,
            at: Utc::now().timestamp(),
        });
        if let Err(e) = self.realtime.broadcast(event).await {
            warn!(%conversation_id, "typing broadcast failed: {}", e);
        }
    }

    /// File an abuse report about the counterpart.
    pub async fn report(&self, req: CreateReportRequest) -> Result<(), ChatError> {
        if req.reason.trim().is_empty() {
            return Err(ChatError::Validation("a report reason is required".to_string()));
        }

        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin(format!("report:{}", req.reported_user_id))
            .ok_or(ChatError::AlreadyInFlight)?;

        match self.transport.create_report(&req).await {
            Ok(()) => {
                info!(reported_user = %req.reported_user_id, "report filed");
                self.toaster.success(op, "Report submitted");
                Ok(())
            }
            Err(e) => {
                self.toaster.error(op, "Could not submit report");
                Err(e.into())
            }
        }
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use flexpress_cache::ledger::CreditLedger;
use flexpress_cache::store::QueryCache;
use flexpress_domain::message::Message;
use flexpress_shared::events::RealtimeEvent;

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("realtime channel closed")]
    ChannelClosed,
}

/// Outbound side of the socket. Delivery is best effort; the cache never
/// depends on it.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    async fn broadcast(&self, event: RealtimeEvent) -> Result<(), RealtimeError>;
}

/// Channel-backed implementation used in-process: tests wire its receiver
/// into the counterpart's bridge, a socket adapter drains it onto the wire.
pub struct ChannelRealtime {
    tx: mpsc::Sender<RealtimeEvent>,
}

impl ChannelRealtime {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<RealtimeEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl RealtimeChannel for ChannelRealtime {
    async fn broadcast(&self, event: RealtimeEvent) -> Result<(), RealtimeError> {
        self.tx.send(event).await.map_err(|_| RealtimeError::ChannelClosed)
    }
}

/// Maps inbound push events onto the same cache primitives the mutation
/// layer uses, so a screen fed by polling and a screen fed by push converge
/// to identical state. There is no second rendering path.
pub struct RealtimeBridge {
    cache: Arc<QueryCache>,
    ledger: Arc<CreditLedger>,
    fanout: broadcast::Sender<RealtimeEvent>,
}

impl RealtimeBridge {
    pub fn new(cache: Arc<QueryCache>, ledger: Arc<CreditLedger>) -> Self {
        let (fanout, _) = broadcast::channel(64);
        Self { cache, ledger, fanout }
    }

    /// UI surfaces subscribe here; they receive an event only after the
    /// cache has absorbed it.
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.fanout.subscribe()
    }

    pub fn stream(&self) -> BroadcastStream<RealtimeEvent> {
        BroadcastStream::new(self.fanout.subscribe())
    }

    /// Apply one inbound event to the cache, then fan it out. Duplicate
    /// messages are dropped entirely so no subscriber renders them twice.
    pub fn apply(&self, event: RealtimeEvent) {
        match &event {
            RealtimeEvent::MessageReceived(ev) => {
                let message = Message::from(ev.clone());
                if !self.cache.append_message(message) {
                    debug!(message_id = %ev.message_id, "realtime echo dropped");
                    return;
                }
            }
            RealtimeEvent::Typing(ev) => {
                let at: DateTime<Utc> =
                    DateTime::from_timestamp(ev.at, 0).unwrap_or_else(Utc::now);
                self.cache.set_typing(ev.conversation_id, ev.user_id, at);
            }
            RealtimeEvent::MatchAccepted(ev) => {
                info!(match_id = %ev.match_id, "match accepted via push");
                self.cache
                    .apply_match_accepted(ev.match_id, ev.conversation_id, ev.charter_id);
            }
            RealtimeEvent::CreditApproved(ev) => {
                self.ledger
                    .apply_approval(ev.user_id, ev.payment_id, ev.credits, ev.amount);
            }
        }
        // Receivers may come and go; an empty audience is not an error.
        let _ = self.fanout.send(event);
    }

    /// Drain a socket adapter's inbound queue until it closes.
    pub async fn run(&self, mut rx: mpsc::Receiver<RealtimeEvent>) {
        info!("realtime bridge running");
        while let Some(event) = rx.recv().await {
            self.apply(event);
        }
        warn!("realtime channel closed, bridge stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexpress_shared::events::{MatchAcceptedEvent, MessageReceivedEvent, TypingEvent};
    use flexpress_cache::store::CacheKey;
    use flexpress_domain::matching::{Address, GeoPoint, MatchStatus, TravelMatch};
    use uuid::Uuid;

    fn bridge() -> (RealtimeBridge, Arc<QueryCache>, Arc<CreditLedger>) {
        let cache = Arc::new(QueryCache::new());
        let ledger = Arc::new(CreditLedger::new());
        (RealtimeBridge::new(cache.clone(), ledger.clone()), cache, ledger)
    }

    fn message_event(conversation_id: Uuid, message_id: Uuid) -> MessageReceivedEvent {
        MessageReceivedEvent {
            message_id,
            conversation_id,
            sender_id: Uuid::new_v4(),
            body: "arriving in 10".to_string(),
            sent_at: Utc::now().timestamp(),
        }
    }

    #[test]
    fn test_message_event_lands_in_cache_once() {
        let (bridge, cache, _) = bridge();
        let conversation_id = Uuid::new_v4();
        let message_id = Uuid::new_v4();

        bridge.apply(RealtimeEvent::MessageReceived(message_event(conversation_id, message_id)));
        bridge.apply(RealtimeEvent::MessageReceived(message_event(conversation_id, message_id)));

        assert_eq!(cache.conversation(conversation_id).len(), 1);
    }

    #[test]
    fn test_duplicate_message_not_fanned_out() {
        let (bridge, _, _) = bridge();
        let mut rx = bridge.subscribe();
        let conversation_id = Uuid::new_v4();
        let message_id = Uuid::new_v4();

        bridge.apply(RealtimeEvent::MessageReceived(message_event(conversation_id, message_id)));
        bridge.apply(RealtimeEvent::MessageReceived(message_event(conversation_id, message_id)));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_match_accepted_patches_and_invalidates() {
        let (bridge, cache, _) = bridge();
        let addr = Address {
            label: "Gate 3".to_string(),
            point: GeoPoint { lat: 0.0, lng: 0.0 },
        };
        let mut m = TravelMatch::new_search(Uuid::new_v4(), addr.clone(), addr, 1);
        m.status = MatchStatus::Pending;
        let match_id = m.id;
        cache.put_match(m);

        bridge.apply(RealtimeEvent::MatchAccepted(MatchAcceptedEvent {
            match_id,
            conversation_id: Uuid::new_v4(),
            charter_id: Uuid::new_v4(),
            timestamp: Utc::now().timestamp(),
        }));

        assert_eq!(cache.match_detail(match_id).unwrap().status, MatchStatus::Accepted);
        assert!(cache.is_stale(CacheKey::ActiveMatch));
    }

    #[test]
    fn test_credit_event_feeds_ledger() {
        let (bridge, _, ledger) = bridge();
        let user = Uuid::new_v4();
        ledger.bind_user(user, 0);

        bridge.apply(RealtimeEvent::CreditApproved(
            flexpress_shared::events::CreditApprovedEvent {
                payment_id: Uuid::new_v4(),
                user_id: user,
                credits: 200,
                amount: 4_000,
                timestamp: Utc::now().timestamp(),
            },
        ));

        assert_eq!(ledger.balance(), 200);
        assert_eq!(ledger.unread_count(), 1);
    }

    #[test]
    fn test_typing_event_sets_state() {
        let (bridge, cache, _) = bridge();
        let conversation_id = Uuid::new_v4();
        let user = Uuid::new_v4();

        bridge.apply(RealtimeEvent::Typing(TypingEvent {
            conversation_id,
            user_id: user,
            at: Utc::now().timestamp(),
        }));

        let typing = cache.typing_users(conversation_id, Utc::now(), chrono::Duration::seconds(5));
        assert_eq!(typing, vec![user]);
    }
}

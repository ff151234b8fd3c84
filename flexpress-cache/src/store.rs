use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use flexpress_domain::matching::TravelMatch;
use flexpress_domain::message::Message;
use flexpress_domain::payment::Payment;
use flexpress_domain::identity::UserProfile;
use flexpress_domain::trip::Trip;

/// Cache slots that dependent surfaces read as a whole and that must be
/// re-fetched after a lifecycle transition touches their membership rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    ClientMatches,
    CharterMatches,
    MatchHistory,
    ActiveMatch,
    AdminPayments,
    PendingPaymentCount,
    UserDetail(Uuid),
}

#[derive(Default)]
struct CacheInner {
    matches: HashMap<Uuid, TravelMatch>,
    trips: HashMap<Uuid, Trip>,
    payments: HashMap<Uuid, Payment>,
    users: HashMap<Uuid, UserProfile>,
    messages: HashMap<Uuid, Vec<Message>>,
    // Lives as long as the message log it deduplicates; both are dropped
    // with the cache when the tab session ends.
    seen_message_ids: HashSet<Uuid>,
    typing: HashMap<Uuid, HashMap<Uuid, DateTime<Utc>>>,
    stale: HashMap<CacheKey, u64>,
    generation: u64,
}

/// The client-side mirror of server state.
///
/// Detail writes replace the whole record (never merge) so a stale field can
/// not survive a transition. List keys are only ever marked stale here; the
/// re-fetch is the caller's awaited responsibility, which keeps the detail
/// write ordered before any dependent list resolves.
pub struct QueryCache {
    inner: Mutex<CacheInner>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self { inner: Mutex::new(CacheInner::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- detail slots -----------------------------------------------------

    pub fn put_match(&self, travel_match: TravelMatch) {
        self.lock().matches.insert(travel_match.id, travel_match);
    }

    pub fn match_detail(&self, id: Uuid) -> Option<TravelMatch> {
        self.lock().matches.get(&id).cloned()
    }

    pub fn put_trip(&self, trip: Trip) {
        self.lock().trips.insert(trip.id, trip);
    }

    pub fn trip_detail(&self, id: Uuid) -> Option<Trip> {
        self.lock().trips.get(&id).cloned()
    }

    pub fn put_payment(&self, payment: Payment) {
        self.lock().payments.insert(payment.id, payment);
    }

    pub fn payment_detail(&self, id: Uuid) -> Option<Payment> {
        self.lock().payments.get(&id).cloned()
    }

    pub fn put_user(&self, user: UserProfile) {
        self.lock().users.insert(user.id, user);
    }

    pub fn user_detail(&self, id: Uuid) -> Option<UserProfile> {
        self.lock().users.get(&id).cloned()
    }

    // --- staleness --------------------------------------------------------

    /// Mark a list key stale. Synchronous and cheap; callers re-fetch and
    /// `mark_fresh` afterwards.
    pub fn invalidate(&self, key: CacheKey) {
        let mut inner = self.lock();
        inner.generation += 1;
        let generation = inner.generation;
        inner.stale.insert(key, generation);
        debug!(?key, generation, "cache key invalidated");
    }

    pub fn is_stale(&self, key: CacheKey) -> bool {
        self.lock().stale.contains_key(&key)
    }

    pub fn mark_fresh(&self, key: CacheKey) {
        self.lock().stale.remove(&key);
    }

    // --- conversations ----------------------------------------------------

    /// Append a message, suppressing duplicates by message id. Returns false
    /// when the id was already present (e.g. the realtime echo of a message
    /// the REST response already delivered).
    pub fn append_message(&self, message: Message) -> bool {
        let mut inner = self.lock();
        if !inner.seen_message_ids.insert(message.id) {
            debug!(message_id = %message.id, "duplicate message suppressed");
            return false;
        }
        inner
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(message);
        true
    }

    pub fn conversation(&self, conversation_id: Uuid) -> Vec<Message> {
        self.lock()
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_typing(&self, conversation_id: Uuid, user_id: Uuid, at: DateTime<Utc>) {
        self.lock()
            .typing
            .entry(conversation_id)
            .or_default()
            .insert(user_id, at);
    }

    /// Users typing within `ttl` of `now`; stale indicators are dropped so a
    /// lost "stopped typing" push cannot stick forever.
    pub fn typing_users(&self, conversation_id: Uuid, now: DateTime<Utc>, ttl: Duration) -> Vec<Uuid> {
        self.lock()
            .typing
            .get(&conversation_id)
            .map(|m| {
                m.iter()
                    .filter(|(_, at)| now - **at <= ttl)
                    .map(|(user, _)| *user)
                    .collect()
            })
            .unwrap_or_default()
    }

    // --- realtime patches -------------------------------------------------

    /// Patch a cached match when the push channel reports acceptance before
    /// the next poll does. Only fields the event carries are touched; the
    /// list keys are invalidated alongside so the next read re-fetches.
    pub fn apply_match_accepted(&self, match_id: Uuid, conversation_id: Uuid, charter_id: Uuid) {
        let mut inner = self.lock();
        if let Some(m) = inner.matches.get_mut(&match_id) {
            m.status = flexpress_domain::matching::MatchStatus::Accepted;
            m.conversation_id = Some(conversation_id);
            m.charter_id = Some(charter_id);
            m.updated_at = Utc::now();
        }
        inner.generation += 1;
        let generation = inner.generation;
        inner.stale.insert(CacheKey::ClientMatches, generation);
        inner.stale.insert(CacheKey::ActiveMatch, generation);
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexpress_domain::matching::{Address, GeoPoint, MatchStatus};

    fn message(conversation_id: Uuid) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: Uuid::new_v4(),
            body: "on my way".to_string(),
            sent_at: Utc::now(),
        }
    }

    #[test]
    fn test_detail_write_replaces() {
        let cache = QueryCache::new();
        let addr = Address {
            label: "Pier 9".to_string(),
            point: GeoPoint { lat: 0.0, lng: 0.0 },
        };
        let mut m = TravelMatch::new_search(Uuid::new_v4(), addr.clone(), addr, 1);
        let id = m.id;
        m.conversation_id = Some(Uuid::new_v4());
        cache.put_match(m.clone());

        // A later authoritative write without the conversation id must win.
        m.conversation_id = None;
        m.status = MatchStatus::Cancelled;
        cache.put_match(m);

        let read = cache.match_detail(id).unwrap();
        assert_eq!(read.status, MatchStatus::Cancelled);
        assert!(read.conversation_id.is_none());
    }

    #[test]
    fn test_invalidate_and_refresh() {
        let cache = QueryCache::new();
        assert!(!cache.is_stale(CacheKey::ClientMatches));
        cache.invalidate(CacheKey::ClientMatches);
        assert!(cache.is_stale(CacheKey::ClientMatches));
        assert!(!cache.is_stale(CacheKey::MatchHistory));
        cache.mark_fresh(CacheKey::ClientMatches);
        assert!(!cache.is_stale(CacheKey::ClientMatches));
    }

    #[test]
    fn test_message_dedupe_by_id() {
        let cache = QueryCache::new();
        let conversation_id = Uuid::new_v4();
        let msg = message(conversation_id);

        assert!(cache.append_message(msg.clone()));
        assert!(!cache.append_message(msg));
        assert_eq!(cache.conversation(conversation_id).len(), 1);
    }

    #[test]
    fn test_typing_ttl() {
        let cache = QueryCache::new();
        let conversation_id = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();

        cache.set_typing(conversation_id, user, now - Duration::seconds(10));
        assert!(cache.typing_users(conversation_id, now, Duration::seconds(5)).is_empty());

        cache.set_typing(conversation_id, user, now);
        assert_eq!(cache.typing_users(conversation_id, now, Duration::seconds(5)), vec![user]);
    }

    #[test]
    fn test_match_accepted_patch_invalidates_lists() {
        let cache = QueryCache::new();
        let addr = Address {
            label: "Pier 9".to_string(),
            point: GeoPoint { lat: 0.0, lng: 0.0 },
        };
        let mut m = TravelMatch::new_search(Uuid::new_v4(), addr.clone(), addr, 1);
        m.status = MatchStatus::Pending;
        let id = m.id;
        cache.put_match(m);

        let conversation_id = Uuid::new_v4();
        let charter_id = Uuid::new_v4();
        cache.apply_match_accepted(id, conversation_id, charter_id);

        let read = cache.match_detail(id).unwrap();
        assert_eq!(read.status, MatchStatus::Accepted);
        assert_eq!(read.conversation_id, Some(conversation_id));
        assert!(cache.is_stale(CacheKey::ClientMatches));
        assert!(cache.is_stale(CacheKey::ActiveMatch));
    }
}

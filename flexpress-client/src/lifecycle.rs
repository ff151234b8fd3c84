use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use flexpress_cache::ledger::CreditLedger;
use flexpress_cache::local::{LocalStores, TravelMatchDraft};
use flexpress_cache::store::{CacheKey, QueryCache};
use flexpress_domain::clock;
use flexpress_domain::feedback::Feedback;
use flexpress_domain::matching::{MatchSearchDraft, TravelMatch};
use flexpress_domain::trip::Trip;

use crate::guard::InFlightGuard;
use crate::session::SessionHandle;
use crate::toast::Toaster;
use crate::transport::{ApiTransport, FeedbackRequest, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Client-side validation failure; rendered inline, never networked.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The match expired locally; the stale charter list must not be
    /// submitted. Prompt a new search instead.
    #[error("match has expired")]
    MatchExpired,

    /// The same mutation is already awaiting the server.
    #[error("action already in flight")]
    AlreadyInFlight,

    /// The signed-in role cannot perform this transition.
    #[error("not permitted for this role")]
    Forbidden,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// How a charter answers a pending match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharterResponse {
    Accept,
    Reject,
}

/// Drives every match and trip transition, and defines what the cache must
/// absorb after each one.
///
/// Every success handler runs the same sequence: write the authoritative
/// response into the detail slot (replace, not merge), mark the dependent
/// list keys stale while still inside the handler, then emit exactly one
/// toast. List re-fetches observe the detail write because invalidation is
/// synchronous. Failures leave cached state untouched; nothing optimistic is
/// written before the server confirms.
pub struct MatchLifecycleController {
    transport: Arc<dyn ApiTransport>,
    cache: Arc<QueryCache>,
    ledger: Arc<CreditLedger>,
    session: Arc<SessionHandle>,
    stores: Arc<LocalStores>,
    toaster: Arc<Toaster>,
    guard: InFlightGuard,
    urgency: Duration,
}

impl MatchLifecycleController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        cache: Arc<QueryCache>,
        ledger: Arc<CreditLedger>,
        session: Arc<SessionHandle>,
        stores: Arc<LocalStores>,
        toaster: Arc<Toaster>,
        guard: InFlightGuard,
    ) -> Self {
        Self {
            transport,
            cache,
            ledger,
            session,
            stores,
            toaster,
            guard,
            urgency: clock::default_urgency(),
        }
    }

    pub fn with_urgency(mut self, urgency: Duration) -> Self {
        self.urgency = urgency;
        self
    }

    /// SEARCHING: post the draft, cache the returned match and candidate
    /// charters, and persist them so a reload can resume the selection.
    pub async fn create_search(
        &self,
        draft: MatchSearchDraft,
    ) -> Result<TravelMatch, LifecycleError> {
        if !self.session.capabilities().can_create_searches {
            return Err(LifecycleError::Forbidden);
        }
        if draft.pickup.is_none() || draft.destination.is_none() {
            return Err(LifecycleError::Validation(
                "pickup and destination are required".to_string(),
            ));
        }
        if draft.workers_count == 0 {
            return Err(LifecycleError::Validation("at least one worker".to_string()));
        }

        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin("create-search")
            .ok_or(LifecycleError::AlreadyInFlight)?;

        match self.transport.create_match_search(&draft).await {
            Ok(response) => {
                info!(match_id = %response.travel_match.id, "match search created");
                self.cache.put_match(response.travel_match.clone());
                if let Err(e) = self.stores.persist_draft(&TravelMatchDraft {
                    search: draft,
                    last_match: Some(response.travel_match.clone()),
                    charters: response.charters.clone(),
                }) {
                    warn!("could not persist search draft: {}", e);
                }
                self.cache.invalidate(CacheKey::ClientMatches);
                self.cache.invalidate(CacheKey::ActiveMatch);
                self.toaster.success(op, "Search created");
                Ok(response.travel_match)
            }
            Err(e) => {
                self.toaster.error(op, "Could not create search");
                Err(e.into())
            }
        }
    }

    /// SEARCHING -> PENDING. Refused locally once the expiration clock
    /// reports expiry for the cached match: the candidate list is stale and
    /// the user must search again.
    pub async fn select_charter(
        &self,
        match_id: Uuid,
        charter_id: Uuid,
    ) -> Result<TravelMatch, LifecycleError> {
        if !self.session.capabilities().can_create_searches {
            return Err(LifecycleError::Forbidden);
        }
        if let Some(cached) = self.cache.match_detail(match_id) {
            if clock::remaining(Utc::now(), cached.expires_at, self.urgency).is_expired {
                self.drop_stale_candidates();
                return Err(LifecycleError::MatchExpired);
            }
        }

        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin(format!("select-charter:{}", match_id))
            .ok_or(LifecycleError::AlreadyInFlight)?;

        match self.transport.select_charter(match_id, charter_id).await {
            Ok(updated) => {
                info!(%match_id, %charter_id, "charter selected, awaiting response");
                self.cache.put_match(updated.clone());
                self.cache.invalidate(CacheKey::ClientMatches);
                self.cache.invalidate(CacheKey::ActiveMatch);
                self.toaster.success(op, "Charter selected");
                Ok(updated)
            }
            Err(e) => {
                self.toaster.error(op, "Could not select charter");
                Err(e.into())
            }
        }
    }

    /// PENDING -> ACCEPTED | REJECTED, from the charter's side.
    pub async fn charter_respond(
        &self,
        match_id: Uuid,
        response: CharterResponse,
    ) -> Result<TravelMatch, LifecycleError> {
        if !self.session.capabilities().can_respond_matches {
            return Err(LifecycleError::Forbidden);
        }

        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin(format!("charter-respond:{}", match_id))
            .ok_or(LifecycleError::AlreadyInFlight)?;

        let accept = response == CharterResponse::Accept;
        match self.transport.charter_respond(match_id, accept).await {
            Ok(updated) => {
                info!(%match_id, accept, "charter responded");
                self.cache.put_match(updated.clone());
                self.cache.invalidate(CacheKey::CharterMatches);
                self.cache.invalidate(CacheKey::ClientMatches);
                self.cache.invalidate(CacheKey::ActiveMatch);
                let message = if accept { "Match accepted" } else { "Match declined" };
                self.toaster.success(op, message);
                Ok(updated)
            }
            Err(e) => {
                self.toaster.error(op, "Could not respond to match");
                Err(e.into())
            }
        }
    }

    /// ACCEPTED -> ACCEPTED with a pending trip attached.
    pub async fn create_trip(&self, match_id: Uuid) -> Result<Trip, LifecycleError> {
        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin(format!("create-trip:{}", match_id))
            .ok_or(LifecycleError::AlreadyInFlight)?;

        match self.transport.create_trip(match_id).await {
            Ok(response) => {
                info!(%match_id, trip_id = %response.trip.id, "trip created");
                self.cache.put_match(response.travel_match);
                self.cache.put_trip(response.trip.clone());
                self.cache.invalidate(CacheKey::ClientMatches);
                self.cache.invalidate(CacheKey::CharterMatches);
                self.cache.invalidate(CacheKey::ActiveMatch);
                self.toaster.success(op, "Trip created");
                Ok(response.trip)
            }
            Err(e) => {
                self.toaster.error(op, "Could not create trip");
                Err(e.into())
            }
        }
    }

    /// trip PENDING -> ACCEPTED, by the charter.
    pub async fn accept_trip(&self, trip_id: Uuid) -> Result<Trip, LifecycleError> {
        if !self.session.capabilities().can_respond_matches {
            return Err(LifecycleError::Forbidden);
        }

        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin(format!("accept-trip:{}", trip_id))
            .ok_or(LifecycleError::AlreadyInFlight)?;

        match self.transport.accept_trip(trip_id).await {
            Ok(trip) => {
                info!(%trip_id, "trip accepted by charter");
                self.cache.put_trip(trip.clone());
                self.cache.invalidate(CacheKey::CharterMatches);
                self.cache.invalidate(CacheKey::ActiveMatch);
                self.toaster.success(op, "Trip accepted");
                Ok(trip)
            }
            Err(e) => {
                self.toaster.error(op, "Could not accept trip");
                Err(e.into())
            }
        }
    }

    /// trip ACCEPTED -> CHARTER_COMPLETED, by the charter.
    pub async fn charter_complete(&self, trip_id: Uuid) -> Result<Trip, LifecycleError> {
        if !self.session.capabilities().can_respond_matches {
            return Err(LifecycleError::Forbidden);
        }

        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin(format!("charter-complete:{}", trip_id))
            .ok_or(LifecycleError::AlreadyInFlight)?;

        match self.transport.charter_complete(trip_id).await {
            Ok(trip) => {
                info!(%trip_id, "charter marked delivery complete");
                self.cache.put_trip(trip.clone());
                self.cache.invalidate(CacheKey::CharterMatches);
                self.cache.invalidate(CacheKey::ActiveMatch);
                self.cache.invalidate(CacheKey::MatchHistory);
                self.toaster.success(op, "Delivery marked complete");
                Ok(trip)
            }
            Err(e) => {
                self.toaster.error(op, "Could not complete delivery");
                Err(e.into())
            }
        }
    }

    /// trip CHARTER_COMPLETED -> COMPLETED. The credits move server-side;
    /// the response balance replaces the mirror wholesale, never a local
    /// subtraction.
    pub async fn client_confirm(&self, trip_id: Uuid) -> Result<Trip, LifecycleError> {
        if !self.session.capabilities().can_confirm_trips {
            return Err(LifecycleError::Forbidden);
        }

        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin(format!("client-confirm:{}", trip_id))
            .ok_or(LifecycleError::AlreadyInFlight)?;

        match self.transport.client_confirm(trip_id).await {
            Ok(response) => {
                info!(%trip_id, balance = response.balance, "trip confirmed");
                self.cache.put_trip(response.trip.clone());
                self.ledger.replace_balance(response.balance);
                self.cache.invalidate(CacheKey::ClientMatches);
                self.cache.invalidate(CacheKey::ActiveMatch);
                self.cache.invalidate(CacheKey::MatchHistory);
                self.toaster.success(op, "Trip confirmed");
                Ok(response.trip)
            }
            Err(e) => {
                self.toaster.error(op, "Could not confirm trip");
                Err(e.into())
            }
        }
    }

    /// Any non-terminal trip -> CANCELLED.
    pub async fn cancel_trip(&self, trip_id: Uuid) -> Result<Trip, LifecycleError> {
        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin(format!("cancel-trip:{}", trip_id))
            .ok_or(LifecycleError::AlreadyInFlight)?;

        match self.transport.cancel_trip(trip_id).await {
            Ok(trip) => {
                info!(%trip_id, "trip cancelled");
                self.cache.put_trip(trip.clone());
                self.cache.invalidate(CacheKey::ClientMatches);
                self.cache.invalidate(CacheKey::CharterMatches);
                self.cache.invalidate(CacheKey::ActiveMatch);
                self.cache.invalidate(CacheKey::MatchHistory);
                self.toaster.success(op, "Trip cancelled");
                Ok(trip)
            }
            Err(e) => {
                self.toaster.error(op, "Could not cancel trip");
                Err(e.into())
            }
        }
    }

    /// Rate the counterpart once the trip completed. Rating is mandatory;
    /// the request never leaves the client without one.
    pub async fn submit_feedback(
        &self,
        trip_id: Uuid,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Feedback, LifecycleError> {
        if !(1..=5).contains(&rating) {
            return Err(LifecycleError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin(format!("feedback:{}", trip_id))
            .ok_or(LifecycleError::AlreadyInFlight)?;

        let request = FeedbackRequest { rating, comment };
        match self.transport.submit_feedback(trip_id, &request).await {
            Ok(feedback) => {
                info!(%trip_id, rating, "feedback submitted");
                // Eligibility is spent: reflect it on the cached match so
                // the awaiting-feedback surface drops it immediately.
                if let Some(trip) = self.cache.trip_detail(trip_id) {
                    if let Some(mut cached) = self.cache.match_detail(trip.match_id) {
                        cached.can_give_feedback = false;
                        self.cache.put_match(cached);
                    }
                }
                self.cache.invalidate(CacheKey::MatchHistory);
                self.toaster.success(op, "Feedback submitted");
                Ok(feedback)
            }
            Err(e) => {
                self.toaster.error(op, "Could not submit feedback");
                Err(e.into())
            }
        }
    }

    /// The candidate list died with the match; keep the search form but drop
    /// the match and charters so the UI prompts a fresh search.
    fn drop_stale_candidates(&self) {
        match self.stores.hydrate_draft() {
            Ok(Some(mut draft)) => {
                draft.last_match = None;
                draft.charters.clear();
                if let Err(e) = self.stores.persist_draft(&draft) {
                    warn!("could not persist pruned draft: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("could not read draft while pruning: {}", e),
        }
    }
}

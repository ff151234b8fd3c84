use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Match status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Searching,
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    Expired,
    Completed,
}

impl MatchStatus {
    /// Terminal statuses never leave their state again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MatchStatus::Rejected | MatchStatus::Cancelled | MatchStatus::Expired
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub label: String,
    pub point: GeoPoint,
}

/// A proposed pairing of one client freight search to one selected charter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelMatch {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub charter_id: Option<Uuid>,
    pub status: MatchStatus,
    pub pickup: Address,
    pub destination: Address,
    pub workers_count: u32,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub conversation_id: Option<Uuid>,
    pub trip_id: Option<Uuid>,
    pub can_give_feedback: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TravelMatch {
    /// Create a fresh search with no charter selected yet
    pub fn new_search(requester_id: Uuid, pickup: Address, destination: Address, workers_count: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            requester_id,
            charter_id: None,
            status: MatchStatus::Searching,
            pickup,
            destination,
            workers_count,
            scheduled_date: None,
            expires_at: None,
            conversation_id: None,
            trip_id: None,
            can_give_feedback: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// A conversation only exists once the charter accepted
    pub fn has_conversation(&self) -> bool {
        self.status == MatchStatus::Accepted && self.conversation_id.is_some()
    }
}

/// A candidate driver returned by a match search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharterCandidate {
    pub id: Uuid,
    pub name: String,
    pub rating: Option<f32>,
    pub distance_km: f64,
}

/// The client-side search form, persisted as a draft between sessions
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MatchSearchDraft {
    pub pickup: Option<Address>,
    pub destination: Option<Address>,
    pub workers_count: u32,
    pub scheduled_date: Option<DateTime<Utc>>,
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Trip status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Pending,
    Accepted,
    CharterCompleted,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }
}

/// The operational execution of an accepted match.
///
/// `estimated_credits` is fixed at creation and is the amount transferred to
/// the charter on completion; once status is Completed the record is
/// immutable from the client's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub match_id: Uuid,
    pub client_id: Uuid,
    pub charter_id: Uuid,
    pub status: TripStatus,
    pub address: String,
    pub estimated_credits: i64,
    pub distance_km: f64,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

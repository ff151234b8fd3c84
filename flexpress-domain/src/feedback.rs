use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A rating from one trip participant about the other.
/// At most one feedback exists per (trip, direction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub trip_id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Payment status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A client-submitted credit purchase request.
///
/// Credits are applied to the user balance exactly once, when an admin moves
/// the status from Pending to Accepted. Rejection never touches the balance
/// and always carries a reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub credits: i64,
    pub amount: i64,
    pub receipt_url: String,
    pub status: PaymentStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Client-local record of a credit approval, kept for toast/badge display.
/// Not authoritative; rebuilt from payment-approval responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditNotification {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub credits: i64,
    pub amount: i64,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl CreditNotification {
    pub fn new(payment_id: Uuid, credits: i64, amount: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_id,
            credits,
            amount,
            read: false,
            created_at: Utc::now(),
        }
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Every actor in the marketplace carries exactly one role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    Charter,
    Admin,
    SubAdmin,
}

/// Capability table computed once from the role, consumed everywhere
/// instead of repeated role comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub can_create_searches: bool,
    pub can_respond_matches: bool,
    pub can_confirm_trips: bool,
    pub can_view_payments: bool,
    pub can_approve_payments: bool,
    pub can_purchase_credits: bool,
}

impl Role {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Role::Client => Capabilities {
                can_create_searches: true,
                can_confirm_trips: true,
                can_purchase_credits: true,
                ..Capabilities::default()
            },
            Role::Charter => Capabilities {
                can_respond_matches: true,
                can_purchase_credits: true,
                ..Capabilities::default()
            },
            Role::Admin => Capabilities {
                can_view_payments: true,
                can_approve_payments: true,
                ..Capabilities::default()
            },
            // Sub-admins review the payment queue but cannot settle it
            Role::SubAdmin => Capabilities {
                can_view_payments: true,
                ..Capabilities::default()
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub credit_balance: i64,
    pub created_at: DateTime<Utc>,
}

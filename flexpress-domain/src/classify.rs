use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock;
use crate::matching::{MatchStatus, TravelMatch};
use crate::trip::{Trip, TripStatus};
use crate::identity::Role;

/// Semantic category of a match as one side of the marketplace sees it.
/// Drives list membership, the bottom-nav active-match badge, and which
/// actions are offered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchCategory {
    Inactive,
    PendingAwaitingCharter,
    ActiveConversation,
    InProgressTrip,
    AwaitingFeedback,
    Done,
}

impl MatchCategory {
    /// Whether the match should appear in "active" surfaces
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            MatchCategory::PendingAwaitingCharter
                | MatchCategory::ActiveConversation
                | MatchCategory::InProgressTrip
        )
    }
}

/// Which side of the match the classification is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Client,
    Charter,
}

impl Viewer {
    /// Admins browsing a match see it the way the requesting client does.
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Charter => Viewer::Charter,
            Role::Client | Role::Admin | Role::SubAdmin => Viewer::Client,
        }
    }
}

/// Classify a match snapshot (optionally with its nested trip) for a viewer.
///
/// Total over every reachable (status, viewer, trip) combination; anything
/// ambiguous degrades to Inactive rather than erroring. A pending match whose
/// expiry has elapsed is Inactive even before the server transitions it.
pub fn classify(
    travel_match: &TravelMatch,
    trip: Option<&Trip>,
    viewer: Viewer,
    now: DateTime<Utc>,
) -> MatchCategory {
    match travel_match.status {
        // Terminal statuses stay inactive even if stale conversation or
        // trip ids are still attached.
        MatchStatus::Rejected | MatchStatus::Cancelled | MatchStatus::Expired => {
            MatchCategory::Inactive
        }

        // A bare search is not yet a pairing anyone acts on.
        MatchStatus::Searching => MatchCategory::Inactive,

        MatchStatus::Pending => {
            if clock::is_expired(now, travel_match.expires_at) {
                MatchCategory::Inactive
            } else if viewer == Viewer::Client {
                MatchCategory::PendingAwaitingCharter
            } else {
                // Charters act through the respond endpoint, not the list.
                MatchCategory::Inactive
            }
        }

        MatchStatus::Accepted => {
            if travel_match.conversation_id.is_none() {
                return MatchCategory::Inactive;
            }
            let trip_running = travel_match.trip_id.is_some()
                && matches!(trip, Some(t) if !t.status.is_terminal());
            if viewer == Viewer::Charter && trip_running {
                MatchCategory::InProgressTrip
            } else {
                MatchCategory::ActiveConversation
            }
        }

        MatchStatus::Completed => match (travel_match.trip_id, trip) {
            (Some(_), Some(t)) if t.status == TripStatus::Completed => {
                if travel_match.can_give_feedback {
                    MatchCategory::AwaitingFeedback
                } else {
                    MatchCategory::Done
                }
            }
            (Some(_), Some(t)) if t.status == TripStatus::Cancelled => MatchCategory::Inactive,
            (Some(_), Some(_)) => MatchCategory::InProgressTrip,
            // Trip not loaded or never created: nothing to act on.
            _ => MatchCategory::Inactive,
        },
    }
}

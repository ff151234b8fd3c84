use chrono::{DateTime, Duration, Utc};

/// Default urgency window before a match expires. The source UI warned at
/// two different thresholds; a single configurable one replaces both.
pub fn default_urgency() -> Duration {
    Duration::minutes(2)
}

/// Snapshot of time left on an expiring match, derived purely from
/// timestamps already in memory. Safe to recompute every second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    pub minutes: i64,
    pub seconds: i64,
    pub is_expired: bool,
    pub is_urgent: bool,
}

impl Remaining {
    fn expired() -> Self {
        Self { minutes: 0, seconds: 0, is_expired: true, is_urgent: false }
    }
}

/// Time remaining until `expires_at`, measured at `now`.
///
/// The boundary is inclusive: at exactly `now == expires_at` the match is
/// expired. A `None` expiry never expires.
pub fn remaining(now: DateTime<Utc>, expires_at: Option<DateTime<Utc>>, urgency: Duration) -> Remaining {
    let Some(expires_at) = expires_at else {
        return Remaining { minutes: 0, seconds: 0, is_expired: false, is_urgent: false };
    };

    if now >= expires_at {
        return Remaining::expired();
    }

    let left = expires_at - now;
    Remaining {
        minutes: left.num_minutes(),
        seconds: left.num_seconds() % 60,
        is_expired: false,
        is_urgent: left <= urgency,
    }
}

/// Convenience check used by list filters and action guards.
pub fn is_expired(now: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) -> bool {
    remaining(now, expires_at, default_urgency()).is_expired
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusive_boundary() {
        let now = Utc::now();
        let r = remaining(now, Some(now), default_urgency());
        assert!(r.is_expired);
        assert_eq!(r.minutes, 0);
        assert_eq!(r.seconds, 0);
    }

    #[test]
    fn test_past_expiry() {
        let now = Utc::now();
        assert!(remaining(now, Some(now - Duration::seconds(1)), default_urgency()).is_expired);
    }

    #[test]
    fn test_none_never_expires() {
        let now = Utc::now();
        let r = remaining(now, None, default_urgency());
        assert!(!r.is_expired);
        assert!(!r.is_urgent);
    }

    #[test]
    fn test_minutes_and_seconds() {
        let now = Utc::now();
        let r = remaining(now, Some(now + Duration::seconds(95)), default_urgency());
        assert!(!r.is_expired);
        assert_eq!(r.minutes, 1);
        assert_eq!(r.seconds, 35);
    }

    #[test]
    fn test_urgency_threshold_edge() {
        let now = Utc::now();

        let inside = remaining(now, Some(now + Duration::seconds(119)), default_urgency());
        assert!(inside.is_urgent);

        let at = remaining(now, Some(now + default_urgency()), default_urgency());
        assert!(at.is_urgent);

        let outside = remaining(now, Some(now + Duration::seconds(121)), default_urgency());
        assert!(!outside.is_urgent);
    }

    #[test]
    fn test_custom_threshold() {
        let now = Utc::now();
        let r = remaining(now, Some(now + Duration::minutes(4)), Duration::minutes(5));
        assert!(r.is_urgent);
    }
}

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Tracks mutations currently awaiting the server so a second identical
/// submission (double click, two surfaces firing the same action) is refused
/// before it reaches the network.
#[derive(Default, Clone)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
}

/// Releases its key when dropped, whether the mutation settled or panicked.
pub struct InFlightToken {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an operation key. Returns None while the same key is in flight.
    pub fn begin(&self, key: impl Into<String>) -> Option<InFlightToken> {
        let key = key.into();
        let claimed = self
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        claimed.then(|| InFlightToken { keys: self.keys.clone(), key })
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

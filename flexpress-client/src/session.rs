use std::sync::{Arc, RwLock, PoisonError};

use tracing::{info, warn};
use uuid::Uuid;

use flexpress_cache::ledger::CreditLedger;
use flexpress_cache::local::{LocalStores, PersistedSession};
use flexpress_domain::identity::{Capabilities, Role, UserProfile};

use crate::transport::{ApiTransport, TransportError};

/// Who is signed in, if anyone. Capabilities are computed once from the role
/// and read everywhere instead of re-comparing role strings.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    pub capabilities: Capabilities,
}

impl Session {
    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }
}

/// Shared, explicitly-passed session state. Constructed logged-out so the
/// first render is deterministic; `rehydrate` is a separate step invoked
/// once after startup.
pub struct SessionHandle {
    inner: RwLock<Session>,
    ledger: Arc<CreditLedger>,
}

impl SessionHandle {
    pub fn new(ledger: Arc<CreditLedger>) -> Self {
        Self { inner: RwLock::new(Session::default()), ledger }
    }

    pub fn snapshot(&self) -> Session {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.snapshot().capabilities
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.snapshot().user_id()
    }

    pub fn login(&self, profile: UserProfile, token: String) {
        self.ledger.bind_user(profile.id, profile.credit_balance);
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.capabilities = profile.role.capabilities();
        inner.token = Some(token);
        inner.user = Some(profile);
    }

    pub fn logout(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner = Session::default();
    }

    /// Restore a persisted session, then re-fetch the profile so role and
    /// balance come from the server, not from storage. A dead token just
    /// leaves the session logged out.
    pub async fn rehydrate(
        &self,
        stores: &LocalStores,
        transport: &dyn ApiTransport,
    ) -> Result<bool, TransportError> {
        let persisted = match stores.hydrate_session() {
            Ok(Some(p)) => p,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!("session storage unreadable: {}", e);
                return Ok(false);
            }
        };

        match transport.fetch_profile(persisted.user_id).await {
            Ok(profile) => {
                info!(user_id = %profile.id, "session rehydrated");
                self.login(profile, persisted.token);
                Ok(true)
            }
            Err(TransportError::Api(reason)) => {
                warn!("persisted session rejected: {}", reason);
                if let Err(e) = stores.clear_session() {
                    warn!("could not clear stale session: {}", e);
                }
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn persist(&self, stores: &LocalStores) {
        let session = self.snapshot();
        if let (Some(user_id), Some(token)) = (session.user_id(), session.token) {
            if let Err(e) = stores.persist_session(&PersistedSession { user_id, token }) {
                warn!("could not persist session: {}", e);
            }
        }
    }
}

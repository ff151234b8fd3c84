use std::sync::Arc;

use tracing::{info, warn};

use flexpress_cache::ledger::CreditLedger;
use flexpress_cache::local::LocalStores;
use flexpress_cache::store::QueryCache;
use flexpress_cache::StorageBackend;

use crate::chat::ConversationController;
use crate::guard::InFlightGuard;
use crate::lifecycle::MatchLifecycleController;
use crate::payments::PaymentLifecycleController;
use crate::realtime::{RealtimeBridge, RealtimeChannel};
use crate::session::SessionHandle;
use crate::toast::{Toaster, ToastSink};
use crate::transport::{ApiTransport, TransportError};

/// Composition root: wires transport, cache, ledger, session, controllers
/// and the realtime bridge together. The UI shell holds one of these.
///
/// Construction is side-effect free; the first render sees default state.
/// `hydrate` is the explicit second phase that restores persisted session
/// and notification state.
pub struct ClientRuntime {
    pub session: Arc<SessionHandle>,
    pub cache: Arc<QueryCache>,
    pub ledger: Arc<CreditLedger>,
    pub stores: Arc<LocalStores>,
    pub bridge: Arc<RealtimeBridge>,
    matches: MatchLifecycleController,
    payments: PaymentLifecycleController,
    conversations: ConversationController,
    transport: Arc<dyn ApiTransport>,
}

impl ClientRuntime {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        realtime: Arc<dyn RealtimeChannel>,
        storage: Arc<dyn StorageBackend>,
        toast_sink: Arc<dyn ToastSink>,
    ) -> Self {
        let cache = Arc::new(QueryCache::new());
        let ledger = Arc::new(CreditLedger::new());
        let stores = Arc::new(LocalStores::new(storage));
        let session = Arc::new(SessionHandle::new(ledger.clone()));
        let toaster = Arc::new(Toaster::new(toast_sink));
        let guard = InFlightGuard::new();
        let bridge = Arc::new(RealtimeBridge::new(cache.clone(), ledger.clone()));

        let matches = MatchLifecycleController::new(
            transport.clone(),
            cache.clone(),
            ledger.clone(),
            session.clone(),
            stores.clone(),
            toaster.clone(),
            guard.clone(),
        );
        let payments = PaymentLifecycleController::new(
            transport.clone(),
            cache.clone(),
            ledger.clone(),
            session.clone(),
            toaster.clone(),
            guard.clone(),
        );
        let conversations = ConversationController::new(
            transport.clone(),
            cache.clone(),
            realtime,
            session.clone(),
            toaster.clone(),
            guard,
        );

        info!("client runtime assembled");
        Self {
            session,
            cache,
            ledger,
            stores,
            bridge,
            matches,
            payments,
            conversations,
            transport,
        }
    }

    pub fn matches(&self) -> &MatchLifecycleController {
        &self.matches
    }

    pub fn payments(&self) -> &PaymentLifecycleController {
        &self.payments
    }

    pub fn conversations(&self) -> &ConversationController {
        &self.conversations
    }

    /// Phase two of startup: restore the notification log and dedupe set,
    /// then the session (which re-fetches the profile server-side).
    pub async fn hydrate(&self) -> Result<(), TransportError> {
        match self.stores.hydrate_ledger() {
            Ok(Some(snapshot)) => self.ledger.restore(snapshot),
            Ok(None) => {}
            Err(e) => warn!("notification log unreadable, starting empty: {}", e),
        }
        self.session
            .rehydrate(self.stores.as_ref(), self.transport.as_ref())
            .await?;
        Ok(())
    }

    /// Persist what survives a restart. Call on teardown and after
    /// notable ledger changes.
    pub fn persist(&self) {
        if let Err(e) = self.stores.persist_ledger(&self.ledger.snapshot()) {
            warn!("could not persist notification log: {}", e);
        }
        self.session.persist(self.stores.as_ref());
    }
}

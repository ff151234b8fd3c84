use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use flexpress_cache::ledger::{ApprovalOutcome, CreditLedger};
use flexpress_cache::store::{CacheKey, QueryCache};
use flexpress_domain::payment::Payment;

use crate::guard::InFlightGuard;
use crate::session::SessionHandle;
use crate::toast::Toaster;
use crate::transport::{ApiTransport, CreatePaymentRequest, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// Rejection requires a non-empty reason; rendered inline, no network
    /// call is made.
    #[error("a rejection reason is required")]
    MissingReason,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not permitted for this role")]
    Forbidden,

    #[error("action already in flight")]
    AlreadyInFlight,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Drives the two-outcome payment machine: pending -> accepted (credits
/// applied once, via the ledger mirror) or pending -> rejected (reason
/// required, balance untouched).
pub struct PaymentLifecycleController {
    transport: Arc<dyn ApiTransport>,
    cache: Arc<QueryCache>,
    ledger: Arc<CreditLedger>,
    session: Arc<SessionHandle>,
    toaster: Arc<Toaster>,
    guard: InFlightGuard,
}

impl PaymentLifecycleController {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        cache: Arc<QueryCache>,
        ledger: Arc<CreditLedger>,
        session: Arc<SessionHandle>,
        toaster: Arc<Toaster>,
        guard: InFlightGuard,
    ) -> Self {
        Self { transport, cache, ledger, session, toaster, guard }
    }

    /// Submit a credit purchase; it lands in the admin queue as pending.
    pub async fn create(&self, req: CreatePaymentRequest) -> Result<Payment, PaymentError> {
        if !self.session.capabilities().can_purchase_credits {
            return Err(PaymentError::Forbidden);
        }
        if req.credits <= 0 || req.amount <= 0 {
            return Err(PaymentError::Validation(
                "credits and amount must be positive".to_string(),
            ));
        }
        if req.receipt_url.trim().is_empty() {
            return Err(PaymentError::Validation("a receipt is required".to_string()));
        }

        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin("create-payment")
            .ok_or(PaymentError::AlreadyInFlight)?;

        match self.transport.create_payment(&req).await {
            Ok(payment) => {
                info!(payment_id = %payment.id, credits = payment.credits, "payment submitted");
                self.cache.put_payment(payment.clone());
                self.cache.invalidate(CacheKey::AdminPayments);
                self.cache.invalidate(CacheKey::PendingPaymentCount);
                self.toaster.success(op, "Payment submitted for review");
                Ok(payment)
            }
            Err(e) => {
                self.toaster.error(op, "Could not submit payment");
                Err(e.into())
            }
        }
    }

    /// pending -> accepted. Feeds the credit mirror (idempotent per payment
    /// id) and refreshes every admin surface plus the payer's detail slot.
    pub async fn approve(&self, payment_id: Uuid) -> Result<Payment, PaymentError> {
        if !self.session.capabilities().can_approve_payments {
            return Err(PaymentError::Forbidden);
        }

        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin(format!("approve-payment:{}", payment_id))
            .ok_or(PaymentError::AlreadyInFlight)?;

        match self.transport.approve_payment(payment_id).await {
            Ok(payment) => {
                info!(%payment_id, user_id = %payment.user_id, "payment approved");
                self.cache.put_payment(payment.clone());
                let outcome = self.ledger.apply_approval(
                    payment.user_id,
                    payment.id,
                    payment.credits,
                    payment.amount,
                );
                if outcome == ApprovalOutcome::DuplicatePayment {
                    info!(%payment_id, "approval already mirrored, skipped");
                }
                self.cache.invalidate(CacheKey::AdminPayments);
                self.cache.invalidate(CacheKey::PendingPaymentCount);
                self.cache.invalidate(CacheKey::UserDetail(payment.user_id));
                self.toaster.success(op, "Payment approved");
                Ok(payment)
            }
            Err(e) => {
                self.toaster.error(op, "Could not approve payment");
                Err(e.into())
            }
        }
    }

    /// pending -> rejected. The reason is validated before any network call
    /// and shown to the payer; the balance is never touched.
    pub async fn reject(&self, payment_id: Uuid, reason: &str) -> Result<Payment, PaymentError> {
        if !self.session.capabilities().can_approve_payments {
            return Err(PaymentError::Forbidden);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PaymentError::MissingReason);
        }

        let op = Uuid::new_v4();
        let _token = self
            .guard
            .begin(format!("reject-payment:{}", payment_id))
            .ok_or(PaymentError::AlreadyInFlight)?;

        match self.transport.reject_payment(payment_id, reason).await {
            Ok(payment) => {
                info!(%payment_id, "payment rejected");
                self.cache.put_payment(payment.clone());
                self.cache.invalidate(CacheKey::AdminPayments);
                self.cache.invalidate(CacheKey::PendingPaymentCount);
                self.toaster.success(op, "Payment rejected");
                Ok(payment)
            }
            Err(e) => {
                self.toaster.error(op, "Could not reject payment");
                Err(e.into())
            }
        }
    }
}

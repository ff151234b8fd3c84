use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use flexpress_domain::notification::CreditNotification;

/// What a call to `apply_approval` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// Balance bumped and a notification appended, together.
    Applied,
    /// Same payment id seen before; nothing changed.
    DuplicatePayment,
    /// Approval belongs to another user; nothing changed.
    ForeignUser,
}

/// Serializable snapshot of the ledger, persisted in local storage so the
/// notification badge survives a restart.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LedgerSnapshot {
    pub notifications: Vec<CreditNotification>,
    pub seen_payments: Vec<Uuid>,
}

#[derive(Default)]
struct LedgerInner {
    user_id: Option<Uuid>,
    balance: i64,
    seen_payments: HashSet<Uuid>,
    notifications: Vec<CreditNotification>,
}

/// Optimistic local mirror of the signed-in user's credit balance.
///
/// Only approvals are applied optimistically, and only additively. Debits
/// are server-priced, so the balance is otherwise replaced wholesale from
/// server responses and never decremented locally. Approval application is
/// deduplicated by payment id.
pub struct CreditLedger {
    inner: Mutex<LedgerInner>,
}

impl CreditLedger {
    pub fn new() -> Self {
        Self { inner: Mutex::new(LedgerInner::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind the mirror to the signed-in user and seed the balance from the
    /// authoritative profile.
    pub fn bind_user(&self, user_id: Uuid, balance: i64) {
        let mut inner = self.lock();
        inner.user_id = Some(user_id);
        inner.balance = balance;
    }

    pub fn balance(&self) -> i64 {
        self.lock().balance
    }

    /// Apply a payment approval. The balance increment and the notification
    /// append happen under one lock, so no render can observe one without
    /// the other.
    pub fn apply_approval(
        &self,
        user_id: Uuid,
        payment_id: Uuid,
        credits: i64,
        amount: i64,
    ) -> ApprovalOutcome {
        let mut inner = self.lock();
        if inner.user_id != Some(user_id) {
            return ApprovalOutcome::ForeignUser;
        }
        if !inner.seen_payments.insert(payment_id) {
            return ApprovalOutcome::DuplicatePayment;
        }
        inner.balance += credits;
        inner
            .notifications
            .push(CreditNotification::new(payment_id, credits, amount));
        info!(%payment_id, credits, "credit approval mirrored");
        ApprovalOutcome::Applied
    }

    /// Replace the balance with a server-reported value. The only way the
    /// mirror ever goes down.
    pub fn replace_balance(&self, balance: i64) {
        self.lock().balance = balance;
    }

    pub fn notifications(&self) -> Vec<CreditNotification> {
        self.lock().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.lock().notifications.iter().filter(|n| !n.read).count()
    }

    pub fn mark_read(&self, notification_id: Uuid) {
        let mut inner = self.lock();
        if let Some(n) = inner.notifications.iter_mut().find(|n| n.id == notification_id) {
            n.read = true;
        }
    }

    pub fn mark_all_read(&self) {
        for n in self.lock().notifications.iter_mut() {
            n.read = true;
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let inner = self.lock();
        LedgerSnapshot {
            notifications: inner.notifications.clone(),
            seen_payments: inner.seen_payments.iter().copied().collect(),
        }
    }

    /// Restore notifications and the dedupe set from a persisted snapshot.
    /// The balance is not restored; it is seeded from the profile on login.
    pub fn restore(&self, snapshot: LedgerSnapshot) {
        let mut inner = self.lock();
        inner.notifications = snapshot.notifications;
        inner.seen_payments = snapshot.seen_payments.into_iter().collect();
    }
}

impl Default for CreditLedger {
    fn default() -> Self {
        Self::new()
    }
}

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

/// Where user-facing confirmations go. The UI shell plugs in its renderer.
pub trait ToastSink: Send + Sync {
    fn push(&self, toast: Toast);
}

/// Sink that keeps toasts in memory; used by tests and headless runs.
#[derive(Default)]
pub struct CollectingSink {
    toasts: Mutex<Vec<Toast>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Toast> {
        std::mem::take(&mut *self.toasts.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn all(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ToastSink for CollectingSink {
    fn push(&self, toast: Toast) {
        self.toasts.lock().unwrap_or_else(PoisonError::into_inner).push(toast);
    }
}

/// Op ids only matter while the mutation that minted them settles; once the
/// set reaches this size it is reset rather than growing for the whole
/// session.
const MAX_TRACKED_OPS: usize = 1024;

/// Emits exactly one toast per mutation instance. Controllers mint a fresh
/// op id per invocation; if two surfaces share the same mutation callback
/// they pass the same id and only the first emission lands.
pub struct Toaster {
    sink: Arc<dyn ToastSink>,
    emitted: Mutex<HashSet<Uuid>>,
}

impl Toaster {
    pub fn new(sink: Arc<dyn ToastSink>) -> Self {
        Self { sink, emitted: Mutex::new(HashSet::new()) }
    }

    pub fn success(&self, op_id: Uuid, message: impl Into<String>) {
        self.emit(op_id, ToastLevel::Success, message.into());
    }

    pub fn error(&self, op_id: Uuid, message: impl Into<String>) {
        self.emit(op_id, ToastLevel::Error, message.into());
    }

    fn emit(&self, op_id: Uuid, level: ToastLevel, message: String) {
        let mut emitted = self.emitted.lock().unwrap_or_else(PoisonError::into_inner);
        if emitted.len() >= MAX_TRACKED_OPS {
            emitted.clear();
        }
        if !emitted.insert(op_id) {
            return;
        }
        self.sink.push(Toast { level, message });
    }
}

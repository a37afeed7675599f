//! The callback surface and the cooperative pause/cancel control plane.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::warn;

use crate::store::HandleStore;

/// Notifications fired by the engine while driving a session. All methods default to no-ops so
/// callers only implement the ones they care about.
///
/// Each method receives the session's [`ControlHandle`] so a callback can pause or cancel the
/// transfer in response to a notification (progress exceeding a quota, a user cancel button)
/// without needing a second mutable borrow of the `Upload` value itself.
pub trait UploadObserver {
    /// Fired once, after the authoritative server offset has been resolved, before the first
    /// chunk is sent. `eta_s` is `Some` only if a speed probe measurement succeeded.
    fn on_start(&mut self, _eta_s: Option<f64>, _control: &ControlHandle) {}

    /// Fired once per acknowledged chunk, using the post-acknowledgement offset.
    fn on_progress(&mut self, _percent: f64, _eta_s: Option<f64>, _control: &ControlHandle) {}

    /// Fired exactly once, when the session reaches the terminal `Done` state.
    fn on_complete(&mut self, _control: &ControlHandle) {}
}

/// A no-op observer, useful when the caller doesn't need any notifications.
impl UploadObserver for () {}

/// A small, cheaply `Clone`-able handle for pausing or cancelling a running session from outside
/// the thread driving `upload()`, or from inside an [`UploadObserver`] callback.
///
/// Distinct from the `Upload` value itself (which `upload()` borrows mutably for its duration)
/// so it can be handed to another thread, stored for later, or passed into callbacks freely.
#[derive(Clone)]
pub struct ControlHandle {
    paused: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    store: Option<Arc<dyn HandleStore>>,
    fingerprint: String,
}

impl ControlHandle {
    pub(crate) fn new(store: Option<Arc<dyn HandleStore>>, fingerprint: String) -> Self {
        Self {
            paused: Arc::new(AtomicBool::new(false)),
            cancelled: Arc::new(AtomicBool::new(false)),
            store,
            fingerprint,
        }
    }

    /// Request that the session pause at the next chunk boundary. Returns `true` iff this call
    /// actually changed the state (idempotent on repeat).
    pub fn pause(&self) -> bool {
        !self.paused.swap(true, Ordering::SeqCst)
    }

    /// Clear a previously requested pause. Returns `true` iff this call actually changed state.
    pub fn resume(&self) -> bool {
        self.paused.swap(false, Ordering::SeqCst)
    }

    /// Request that the session cancel at the next chunk boundary, and delete the store entry
    /// for this session's fingerprint now (best-effort; failures are logged, not propagated).
    /// Returns `true` iff this call actually changed the cancellation state.
    pub fn cancel(&self) -> bool {
        let changed = !self.cancelled.swap(true, Ordering::SeqCst);
        if changed {
            if let Some(store) = &self.store {
                if let Err(e) = store.delete(&self.fingerprint) {
                    warn!("failed to delete store entry for {}: {e}", self.fingerprint);
                }
            }
        }
        changed
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn clear_paused(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }
}

use crate::error::ListenerError;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback invoked from the rendering side when a new frame has been
/// consumed by the surface.
///
/// Returning an error unregisters the listener; delivery to the remaining
/// listeners continues.
pub trait FrameListener: Send + Sync {
    fn on_frame_available(&self) -> Result<(), ListenerError>;
}

/// Registry of frame listeners with snapshot-iteration delivery.
///
/// `notify` walks a snapshot of the set, so listeners may be added or removed
/// concurrently (including from inside a callback) without invalidating the
/// iteration. Identity is Arc pointer identity; the same Arc is registered at
/// most once. No ordering is guaranteed across listeners.
#[derive(Default)]
pub struct FrameListeners {
    inner: Mutex<Vec<Arc<dyn FrameListener>>>,
}

impl FrameListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; a no-op if this Arc is already registered
    pub fn add(&self, listener: Arc<dyn FrameListener>) {
        let mut inner = self.inner.lock();
        if !inner.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            inner.push(listener);
        }
    }

    /// Unregister a listener by Arc identity; a no-op if absent
    pub fn remove(&self, listener: &Arc<dyn FrameListener>) {
        self.inner.lock().retain(|l| !Arc::ptr_eq(l, listener));
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Deliver a frame-available notification to every registered listener.
    ///
    /// Best-effort: a listener whose callback fails is unregistered and
    /// delivery continues with the rest.
    pub fn notify(&self) {
        let snapshot: Vec<Arc<dyn FrameListener>> = self.inner.lock().clone();
        for listener in snapshot {
            if let Err(e) = listener.on_frame_available() {
                warn!("frame listener failed, unregistering it: {}", e);
                self.remove(&listener);
                debug!("{} listener(s) remain registered", self.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingListener {
        calls: AtomicU32,
        fail: AtomicBool,
    }

    impl FrameListener for CountingListener {
        fn on_frame_available(&self) -> Result<(), ListenerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(ListenerError::new("simulated failure"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_add_is_idempotent_per_arc() {
        let listeners = FrameListeners::new();
        let listener: Arc<dyn FrameListener> = Arc::new(CountingListener::default());
        listeners.add(Arc::clone(&listener));
        listeners.add(Arc::clone(&listener));
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn test_notify_reaches_all_listeners() {
        let listeners = FrameListeners::new();
        let a = Arc::new(CountingListener::default());
        let b = Arc::new(CountingListener::default());
        listeners.add(a.clone());
        listeners.add(b.clone());

        listeners.notify();
        listeners.notify();

        assert_eq!(a.calls.load(Ordering::SeqCst), 2);
        assert_eq!(b.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failing_listener_is_unregistered() {
        let listeners = FrameListeners::new();
        let good = Arc::new(CountingListener::default());
        let bad = Arc::new(CountingListener::default());
        bad.fail.store(true, Ordering::SeqCst);
        listeners.add(bad.clone());
        listeners.add(good.clone());

        listeners.notify();
        assert_eq!(listeners.len(), 1);
        assert_eq!(good.calls.load(Ordering::SeqCst), 1);

        // The failed listener no longer receives notifications.
        listeners.notify();
        assert_eq!(bad.calls.load(Ordering::SeqCst), 1);
        assert_eq!(good.calls.load(Ordering::SeqCst), 2);
    }

    struct SelfRemovingListener {
        registry: Arc<FrameListeners>,
        this: Mutex<Option<Arc<dyn FrameListener>>>,
        calls: AtomicU32,
    }

    impl FrameListener for SelfRemovingListener {
        fn on_frame_available(&self) -> Result<(), ListenerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(this) = self.this.lock().take() {
                self.registry.remove(&this);
            }
            Ok(())
        }
    }

    #[test]
    fn test_remove_during_delivery_is_safe() {
        let registry = Arc::new(FrameListeners::new());
        let listener = Arc::new(SelfRemovingListener {
            registry: Arc::clone(&registry),
            this: Mutex::new(None),
            calls: AtomicU32::new(0),
        });
        let as_dyn: Arc<dyn FrameListener> = listener.clone();
        *listener.this.lock() = Some(Arc::clone(&as_dyn));
        registry.add(as_dyn);

        registry.notify();
        assert_eq!(registry.len(), 0);

        // Excluded from subsequent notifications.
        registry.notify();
        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
    }
}

//! Listener Registry
//!
//! Ordered list of callbacks for one event kind.

use parking_lot::Mutex;
use std::sync::Arc;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Callbacks invoked in registration order
pub struct ListenerRegistry<E> {
    listeners: Mutex<Vec<Listener<E>>>,
}

impl<E> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<E> ListenerRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, listener: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.listeners.lock().push(Arc::new(listener));
    }

    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Call every listener with `event`. Returns how many were called.
    ///
    /// Runs on a snapshot taken under the lock, so a listener may add or
    /// clear listeners without deadlocking; such changes apply to the next
    /// event.
    pub fn dispatch(&self, event: &E) -> usize {
        let snapshot: Vec<Listener<E>> = self.listeners.lock().clone();
        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }
}

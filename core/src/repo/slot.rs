use std::sync::{Arc, Mutex, MutexGuard};

/// Backend resources of one open repository handle, shared with every
/// `Revision` obtained through it.
///
/// `close` empties the slot, which releases the resources and makes every
/// later access (from the handle or any of its revisions) see `None`.
#[derive(Debug)]
pub struct Slot<T> {
    inner: Arc<Mutex<Option<T>>>,
}

impl<T> Slot<T> {
    pub fn new(resources: T) -> Slot<T> {
        Slot {
            inner: Arc::new(Mutex::new(Some(resources))),
        }
    }

    /// Run `f` against the resources, or return `None` once closed.
    pub fn with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        self.lock().as_ref().map(f)
    }

    /// Release the resources. Returns false if they were already released.
    pub fn close(&self) -> bool {
        self.lock().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        // A panic while holding the lock cannot leave `Option<T>` half
        // updated, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Slot {
            inner: Arc::clone(&self.inner),
        }
    }
}

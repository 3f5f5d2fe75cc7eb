//! # Shared Pool Manager
//!
//! A [`PoolManager`] behind one `parking_lot` mutex.

use parking_lot::Mutex;

use crate::memory::{Handle, PoolManager};

/// A [`PoolManager`] that can be shared between threads.
///
/// Every call takes the single lock for its whole duration. Use
/// [`with`](Self::with) to batch several operations under one lock.
///
/// # Example
///
/// ```rust,ignore
/// let shared = Arc::new(SharedPoolManager::new(PoolManager::from_sizes([16, 64], 4096)?));
///
/// let handle = shared.alloc(40);
/// shared.with(|pools| pools.bytes_mut(&mut handle)[0] = 1);
/// shared.release(handle);
/// ```
#[derive(Debug)]
pub struct SharedPoolManager {
    inner: Mutex<PoolManager>,
}

impl SharedPoolManager {
    /// Wraps a manager.
    #[must_use]
    pub fn new(manager: PoolManager) -> Self {
        Self {
            inner: Mutex::new(manager),
        }
    }

    /// Allocates at least `size` bytes. See [`PoolManager::alloc`].
    pub fn alloc(&self, size: usize) -> Handle {
        self.inner.lock().alloc(size)
    }

    /// Releases a handle. See [`PoolManager::release`].
    pub fn release(&self, handle: Handle) {
        self.inner.lock().release(handle);
    }

    /// Runs `f` with exclusive access to the manager.
    pub fn with<R>(&self, f: impl FnOnce(&mut PoolManager) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Unwraps the manager.
    #[must_use]
    pub fn into_inner(self) -> PoolManager {
        self.inner.into_inner()
    }
}

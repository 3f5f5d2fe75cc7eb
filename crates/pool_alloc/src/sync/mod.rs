//! # Shared Access
//!
//! Pools and managers carry no locks of their own. Sharing one across threads
//! means locking the whole instance:
//!
//! ```text
//! Thread 1 ──┐
//! Thread 2 ──┼──> Mutex<PoolManager> ──> index ──> pools
//! Thread 3 ──┘
//! ```
//!
//! There is no per-class locking.

mod shared;

pub use shared::SharedPoolManager;

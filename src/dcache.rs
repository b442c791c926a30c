//! The global dentry-tree lock (spec.md §5, `g_dcache_lock`).
//!
//! Modeled as a process-wide recursive mutex acquired at operation
//! boundaries, exactly as spec.md §9 prescribes: "Model as a process-wide
//! recursive mutex acquired at syscall boundaries; callees assert-check
//! possession rather than reacquiring." Rust has no ambient "current thread
//! holds lock X" assertion, so this crate encodes possession as a witness
//! token (`DCacheGuard`) that structural dentry mutations require in their
//! signature — the compiler statically enforces "the dcache lock must be
//! held" instead of a runtime assert.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// The global dentry cache lock. One instance lives inside [`crate::fs::ChrootFs`].
pub struct DCache {
    lock: ReentrantMutex<()>,
}

impl Default for DCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DCache {
    pub fn new() -> Self {
        DCache {
            lock: ReentrantMutex::new(()),
        }
    }

    /// Acquires the lock. Reentrant: an operation that internally calls
    /// another dcache-locking helper (e.g. rename calling into lookup-style
    /// path resolution) will not deadlock against itself on the same thread.
    pub fn lock(&self) -> DCacheGuard<'_> {
        DCacheGuard {
            _guard: self.lock.lock(),
        }
    }
}

/// Proof that the dcache lock is held by the current thread. Dentry methods
/// that mutate the tree or dentry→inode linking require a `&DCacheGuard`
/// parameter; they never lock anything themselves.
pub struct DCacheGuard<'a> {
    _guard: ReentrantMutexGuard<'a, ()>,
}

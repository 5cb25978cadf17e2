//! Process-wide, path-keyed mutual exclusion.
//!
//! The serial file and the inventory file are each read-modify-write (or
//! append) critical sections that must never interleave across worker
//! threads. The reference Ruby CA uses a single global lock; we key the
//! lock by path instead so hosting more than one CA's files in one
//! process stays correct (see the design notes in `SPEC_FULL.md` §9).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// A registry of one [`Mutex`] per distinct path, created lazily.
struct PathLocks {
    inner: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    const fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

static REGISTRY: OnceLock<PathLocks> = OnceLock::new();

/// The process-wide registry used by [`crate::serial`] and
/// [`crate::inventory`] via [`with_lock`].
fn registry() -> &'static PathLocks {
    REGISTRY.get_or_init(PathLocks::new)
}

/// Convenience: acquire the named path's lock for the duration of `f`.
pub fn with_lock<T>(path: &Path, f: impl FnOnce() -> T) -> T {
    let lock = registry().lock_for(path);
    let _guard: MutexGuard<'_, ()> = lock.lock().unwrap_or_else(|e| e.into_inner());
    f()
}

use std::sync::{Mutex, MutexGuard};

/// Serializes tests that read or change the process working directory.
pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
    static MUTEX: Mutex<()> = Mutex::new(());
    MUTEX.lock().unwrap_or_else(|e| e.into_inner())
}

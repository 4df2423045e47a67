use std::sync::{Mutex, MutexGuard, OnceLock};

// Tests that read or mutate process environment variables must hold this
// guard, otherwise parallel tests observe each other's half-written config.
pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

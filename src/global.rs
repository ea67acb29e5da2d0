//! Process-wide runtime for callers that cannot thread one through
//!
//! Design: One `Runtime` behind a `parking_lot::Mutex`, created on first
//! use. Reentering `with` from inside its own closure on the same thread
//! is reported as an error instead of deadlocking on the lock.

use crate::config::RuntimeConfig;
use crate::error::{AdiError, AdiResult, ErrorKind};
use crate::runtime::{Runtime, RuntimeStats};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::cell::Cell;

static RUNTIME: Lazy<Mutex<Option<Runtime>>> = Lazy::new(|| Mutex::new(None));

thread_local! {
    static ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Clears the thread's reentry flag when the closure finishes or unwinds
struct ActiveGuard;

impl ActiveGuard {
    fn enter() -> AdiResult<Self> {
        if ACTIVE.with(Cell::get) {
            return Err(AdiError::new(ErrorKind::Recursion, "Illegal recursion"));
        }
        ACTIVE.with(|active| active.set(true));
        Ok(Self)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.set(false));
    }
}

/// Create the shared runtime; a no-op when it already exists
pub fn init(config: RuntimeConfig) -> AdiResult<()> {
    let _guard = ActiveGuard::enter()?;
    let mut slot = RUNTIME.lock();
    if slot.is_none() {
        *slot = Some(Runtime::with_config(config)?);
    }
    Ok(())
}

/// Run `f` against the shared runtime, creating it with defaults if needed
pub fn with<R>(f: impl FnOnce(&mut Runtime) -> AdiResult<R>) -> AdiResult<R> {
    let _guard = ActiveGuard::enter()?;
    let mut slot = RUNTIME.lock();
    if slot.is_none() {
        *slot = Some(Runtime::new()?);
    }
    match slot.as_mut() {
        Some(runtime) => f(runtime),
        None => Err(AdiError::illegal("Runtime is not initialised")),
    }
}

/// Tear down the shared runtime, returning its final statistics
pub fn shutdown() -> AdiResult<Option<RuntimeStats>> {
    let _guard = ActiveGuard::enter()?;
    let runtime = RUNTIME.lock().take();
    Ok(runtime.map(Runtime::shutdown))
}

/// Whether the shared runtime exists
pub fn is_initialized() -> bool {
    RUNTIME.lock().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests share one process-wide runtime; keep them independent of order
    #[test]
    fn test_with_creates_and_reuses_runtime() {
        let id = with(|rt| rt.new_value(42i32)).unwrap();
        let value = with(|rt| rt.get_value::<i32>(id, "")).unwrap();
        assert_eq!(value, 42);
        with(|rt| rt.erase(id)).unwrap();
        assert!(is_initialized());
    }

    #[test]
    fn test_reentry_is_an_error() {
        let err = with(|_| with(|_| Ok(()))).unwrap_err();
        assert!(err.is(ErrorKind::Recursion));
        assert_eq!(err.message(), "Illegal recursion");

        // The flag is cleared afterwards
        assert!(with(|_| Ok(())).is_ok());
    }
}

//! Guard predicates for controlling transitions.
//!
//! Guards are boolean functions evaluated at the moment a trigger is
//! processed. They close over whatever embedder state they need.

use std::fmt;
use std::sync::Arc;

/// Predicate that determines whether a permitted transition or an ignore
/// takes effect.
///
/// # Example
///
/// ```rust
/// use hfsm::core::Guard;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// let armed = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&armed);
/// let guard = Guard::new(move || flag.load(Ordering::SeqCst));
///
/// assert!(!guard.check());
/// armed.store(true, Ordering::SeqCst);
/// assert!(guard.check());
/// ```
#[derive(Clone)]
pub struct Guard {
    predicate: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl Guard {
    /// Create a guard from a predicate.
    ///
    /// The predicate runs on whichever thread is draining the machine, so it
    /// must be `Send + Sync`.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// A guard that always passes.
    pub fn always() -> Self {
        Guard::new(|| true)
    }

    /// Evaluate the guard.
    pub fn check(&self) -> bool {
        (self.predicate)()
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn always_guard_passes() {
        assert!(Guard::always().check());
        assert!(Guard::default().check());
    }

    #[test]
    fn guard_reads_captured_state() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        let guard = Guard::new(move || seen.load(Ordering::SeqCst) > 2);

        assert!(!guard.check());
        counter.store(3, Ordering::SeqCst);
        assert!(guard.check());
    }

    #[test]
    fn cloned_guard_shares_predicate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let tally = Arc::clone(&calls);
        let guard = Guard::new(move || {
            tally.fetch_add(1, Ordering::SeqCst);
            true
        });
        let copy = guard.clone();

        guard.check();
        copy.check();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

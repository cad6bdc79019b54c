//! Runtime bounds for a machine.

use serde::{Deserialize, Serialize};

/// Pending triggers beyond which `fire` drops new triggers.
pub const DEFAULT_MAX_PENDING_TRIGGERS: usize = 10;

/// Maximum number of initial-substate hops followed from a destination.
pub const DEFAULT_MAX_INITIAL_DEPTH: usize = 8;

/// Bounds applied while a machine runs.
///
/// Deserializable so embedders can carry it in their own configuration
/// files; missing fields fall back to the defaults.
///
/// # Example
///
/// ```rust
/// use hfsm::Limits;
///
/// let limits = Limits::default().max_pending_triggers(32);
/// assert_eq!(limits.max_pending_triggers, 32);
/// assert_eq!(limits.max_initial_depth, 8);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// A trigger fired while this many are already queued is dropped.
    pub max_pending_triggers: usize,
    /// Longest initial-substate chain accepted at lock time and followed
    /// at run time.
    pub max_initial_depth: usize,
}

impl Limits {
    pub fn max_pending_triggers(mut self, n: usize) -> Self {
        self.max_pending_triggers = n;
        self
    }

    pub fn max_initial_depth(mut self, n: usize) -> Self {
        self.max_initial_depth = n;
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_pending_triggers: DEFAULT_MAX_PENDING_TRIGGERS,
            max_initial_depth: DEFAULT_MAX_INITIAL_DEPTH,
        }
    }
}

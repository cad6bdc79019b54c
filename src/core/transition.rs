//! The immutable record describing one state change.

use super::state::{State, Trigger};
use serde::{Deserialize, Serialize};

/// Record of a single resolved transition.
///
/// A fresh value is built for every transition the machine performs and
/// handed to entry, exit and internal callbacks by reference. Internal
/// transitions carry `source == destination`.
///
/// # Example
///
/// ```rust
/// use hfsm::{state_enum, trigger_enum, Transition};
///
/// state_enum! {
///     enum Door { Open, Closed }
/// }
///
/// trigger_enum! {
///     enum Action { Close }
/// }
///
/// let transition = Transition::new(Action::Close, Door::Open, Door::Closed);
/// assert_eq!(transition.source, Door::Open);
/// assert!(!transition.is_internal());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Transition<S: State, T: Trigger> {
    /// The trigger that caused the transition
    pub trigger: T,
    /// The state being left
    pub source: S,
    /// The state being entered (after any initial-substate chaining)
    pub destination: S,
}

impl<S: State, T: Trigger> Transition<S, T> {
    pub fn new(trigger: T, source: S, destination: S) -> Self {
        Self {
            trigger,
            source,
            destination,
        }
    }

    /// A transition that stays in `state`.
    pub fn internal(trigger: T, state: S) -> Self {
        Self {
            trigger,
            source: state.clone(),
            destination: state,
        }
    }

    /// True when source and destination are the same state.
    pub fn is_internal(&self) -> bool {
        self.source == self.destination
    }
}

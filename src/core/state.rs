//! Identifier traits for states and triggers.
//!
//! States and triggers are opaque, caller-supplied values. The engine only
//! needs to compare them, hash them, and name them in diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for state machine states.
///
/// States are keys into the machine's configuration map, so they must be
/// hashable and structurally comparable. Closed, fieldless enums are the
/// usual choice; the [`state_enum!`](crate::state_enum) macro derives
/// everything needed.
///
/// # Required Traits
///
/// - `Clone`: states are copied into every [`Transition`](crate::Transition)
/// - `Eq` + `Hash`: states key the configuration map
/// - `Debug`: states are debuggable for diagnostics
/// - `Serialize` + `Deserialize`: notifications can be journaled
/// - `Send` + `Sync`: machines may be fired from any thread
///
/// # Example
///
/// ```rust
/// use hfsm::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Player {
///     Idle,
///     Running,
///     Paused,
/// }
///
/// impl State for Player {
///     fn name(&self) -> &str {
///         match self {
///             Self::Idle => "Idle",
///             Self::Running => "Running",
///             Self::Paused => "Paused",
///         }
///     }
/// }
///
/// assert_eq!(Player::Paused.name(), "Paused");
/// ```
pub trait State:
    Clone + Eq + Hash + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;
}

/// Trait for the events a machine reacts to.
///
/// Same requirements as [`State`]; triggers key each state's
/// trigger table and the pending queue.
pub trait Trigger:
    Clone + Eq + Hash + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Get the trigger's name for display/logging.
    fn name(&self) -> &str;
}

//! hfsm: a hierarchical finite-state-machine engine
//!
//! Declare states, triggers, substate relationships, guarded and internal
//! transitions, and entry/exit callbacks; then fire triggers from anywhere,
//! including from inside those callbacks.
//!
//! # Core Concepts
//!
//! - **State / Trigger**: caller-supplied identifiers via the `State` and
//!   `Trigger` traits (or the `state_enum!` / `trigger_enum!` macros)
//! - **Configuration**: fluent per-state declarations, mutable until the
//!   machine is first fired
//! - **Hierarchy**: a trigger is resolved by the nearest ancestor that
//!   declares it; transitions exit and enter only the states below the
//!   least common ancestor
//! - **Queue**: triggers fired during processing are appended and handled
//!   in order by whoever is already draining
//!
//! # Example
//!
//! ```rust
//! use hfsm::{state_enum, trigger_enum, StateMachine};
//! use std::sync::{Arc, Mutex};
//!
//! state_enum! {
//!     enum Door { Closed, Open, Locked }
//! }
//!
//! trigger_enum! {
//!     enum Action { Open, Close, Lock, Unlock }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let machine = StateMachine::new(Door::Closed);
//!
//! let entered = Arc::clone(&log);
//! machine
//!     .configure(Door::Closed)?
//!     .permit(Action::Open, Door::Open)?
//!     .permit(Action::Lock, Door::Locked)?
//!     .on_entry(move || entered.lock().unwrap().push("closed"))?;
//! machine.configure(Door::Open)?.permit(Action::Close, Door::Closed)?;
//! machine
//!     .configure(Door::Locked)?
//!     .substate_of(Door::Closed)?
//!     .permit(Action::Unlock, Door::Closed)?;
//!
//! machine.fire(Action::Open)?;
//! machine.fire(Action::Close)?;
//! machine.fire(Action::Lock)?;
//!
//! assert_eq!(machine.state(), Door::Locked);
//! assert!(machine.is_in_state(&Door::Closed));
//! assert_eq!(*log.lock().unwrap(), vec!["closed"]);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod core;
pub mod machine;

// Re-export commonly used types
pub use crate::builder::{ConfigError, StateConfiguration};
pub use crate::core::{Guard, State, Transition, Trigger};
pub use crate::machine::{
    EventKind, FireError, Limits, MachineEvent, MachineHandle, StateMachine, SubscriptionId,
};

//! Core value types.
//!
//! This module contains the pieces with no behaviour of their own:
//! - State and trigger identifiers via the `State` and `Trigger` traits
//! - Guard predicates for transition control
//! - The immutable `Transition` record

mod guard;
mod state;
mod transition;

pub use guard::Guard;
pub use state::{State, Trigger};
pub use transition::Transition;

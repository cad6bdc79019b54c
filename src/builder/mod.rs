//! Declaration API for states, triggers and hierarchy.
//!
//! [`StateConfiguration`] is the fluent surface returned by
//! [`StateMachine::configure`](crate::StateMachine::configure). The
//! declarations it collects stay mutable until the machine locks on its
//! first `fire`.

mod configuration;
pub(crate) mod definition;
pub mod error;
pub mod macros;

pub use configuration::StateConfiguration;
pub use error::ConfigError;

pub(crate) use configuration::Blueprint;

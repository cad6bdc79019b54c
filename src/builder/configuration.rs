//! Fluent declaration handle for a single state.

use crate::builder::definition::{Destination, StateAction, StateDefinition, TriggerBehaviour};
use crate::builder::error::ConfigError;
use crate::core::{Guard, State, Transition, Trigger};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Declarations for every state, keyed by state. `None` once the machine
/// has locked.
pub(crate) type Blueprint<S, T> = Mutex<Option<HashMap<S, StateDefinition<S, T>>>>;

/// Builder for one state's triggers, hierarchy and callbacks.
///
/// Obtained from [`StateMachine::configure`](crate::StateMachine::configure).
/// Every method consumes and returns the configuration so calls chain with
/// `?`. All of them fail with [`ConfigError::Locked`] once the machine has
/// been fired.
///
/// # Example
///
/// ```rust
/// use hfsm::{state_enum, trigger_enum, StateMachine};
///
/// state_enum! {
///     enum Player { Idle, Running, Paused }
/// }
///
/// trigger_enum! {
///     enum Command { Start, Pause, Stop }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let machine = StateMachine::new(Player::Idle);
///
/// machine.configure(Player::Idle)?.permit(Command::Start, Player::Running)?;
/// machine
///     .configure(Player::Running)?
///     .permit(Command::Pause, Player::Paused)?
///     .permit(Command::Stop, Player::Idle)?;
/// machine
///     .configure(Player::Paused)?
///     .substate_of(Player::Running)?
///     .ignore(Command::Pause)?;
///
/// machine.fire(Command::Start)?;
/// machine.fire(Command::Pause)?;
/// assert_eq!(machine.state(), Player::Paused);
/// assert!(machine.is_in_state(&Player::Running));
/// # Ok(())
/// # }
/// ```
pub struct StateConfiguration<'a, S: State, T: Trigger> {
    state: S,
    blueprint: &'a Blueprint<S, T>,
}

impl<'a, S: State, T: Trigger> StateConfiguration<'a, S, T> {
    /// Open (creating if absent) the declaration for `state`.
    pub(crate) fn open(state: S, blueprint: &'a Blueprint<S, T>) -> Result<Self, ConfigError> {
        Self { state, blueprint }.update(|_| Ok(()))
    }

    /// The state being configured.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Transition to `destination` when `trigger` fires.
    pub fn permit(self, trigger: T, destination: S) -> Result<Self, ConfigError> {
        self.permit_if(trigger, destination, Guard::always())
    }

    /// Transition to `destination` when `trigger` fires and `guard` holds.
    pub fn permit_if(self, trigger: T, destination: S, guard: Guard) -> Result<Self, ConfigError> {
        if destination == self.state {
            return Err(ConfigError::ReentrantTransition {
                state: self.state.name().to_string(),
                trigger: trigger.name().to_string(),
            });
        }
        self.register(
            trigger,
            TriggerBehaviour::Permit {
                guard,
                destination: Destination::Static(destination),
            },
        )
    }

    /// Transition to whatever `selector` returns when `trigger` fires.
    ///
    /// The selector runs while the trigger is processed. Returning the
    /// current state or an unconfigured state is reported as a runtime
    /// error.
    pub fn permit_dynamic<F>(self, trigger: T, selector: F) -> Result<Self, ConfigError>
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.permit_dynamic_if(trigger, Guard::always(), selector)
    }

    /// Guarded form of [`permit_dynamic`](Self::permit_dynamic).
    pub fn permit_dynamic_if<F>(
        self,
        trigger: T,
        guard: Guard,
        selector: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.register(
            trigger,
            TriggerBehaviour::Permit {
                guard,
                destination: Destination::Dynamic(Arc::new(selector)),
            },
        )
    }

    /// Accept `trigger` in this state without doing anything.
    ///
    /// Only suppresses unhandled-trigger reporting for this exact state
    /// (and its substates through normal ancestor resolution).
    pub fn ignore(self, trigger: T) -> Result<Self, ConfigError> {
        self.ignore_if(trigger, Guard::always())
    }

    /// Ignore `trigger` while `guard` holds. When the guard fails the
    /// trigger is reported as unhandled.
    pub fn ignore_if(self, trigger: T, guard: Guard) -> Result<Self, ConfigError> {
        self.register(trigger, TriggerBehaviour::Ignore { guard })
    }

    /// Ignore each trigger in `triggers`.
    pub fn ignore_many<I>(self, triggers: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
    {
        triggers
            .into_iter()
            .try_fold(self, |configuration, trigger| configuration.ignore(trigger))
    }

    /// Run `action` when `trigger` fires, without leaving the state.
    ///
    /// Several actions may be attached to the same trigger; they run in
    /// registration order. No entry or exit callbacks fire.
    pub fn internal_transition<F>(self, trigger: T, action: F) -> Result<Self, ConfigError>
    where
        F: Fn(&Transition<S, T>) + Send + Sync + 'static,
    {
        let duplicate = self.duplicate(&trigger);
        self.update(move |definition| match definition.triggers.entry(trigger) {
            Entry::Vacant(slot) => {
                slot.insert(TriggerBehaviour::Internal {
                    actions: vec![Arc::new(action)],
                });
                Ok(())
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                TriggerBehaviour::Internal { actions } => {
                    actions.push(Arc::new(action));
                    Ok(())
                }
                _ => Err(duplicate),
            },
        })
    }

    /// Make this state a substate of `parent`.
    pub fn substate_of(self, parent: S) -> Result<Self, ConfigError> {
        if parent == self.state {
            return Err(ConfigError::CyclicHierarchy {
                state: self.state.name().to_string(),
            });
        }
        self.update(move |definition| {
            definition.parent = parent;
            Ok(())
        })
    }

    /// Enter `child` whenever this state is the destination of a
    /// transition.
    pub fn initial_transition(self, child: S) -> Result<Self, ConfigError> {
        if child == self.state {
            return Err(ConfigError::InvalidInitial {
                state: self.state.name().to_string(),
                initial: child.name().to_string(),
            });
        }
        self.update(move |definition| {
            definition.initial = child;
            Ok(())
        })
    }

    /// Run `action` on entry. Also runs on [`activate`](crate::StateMachine::activate).
    pub fn on_entry<F>(self, action: F) -> Result<Self, ConfigError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.update(move |definition| {
            definition.entry.push(StateAction::Plain(Arc::new(action)));
            Ok(())
        })
    }

    /// Run `action` with the transition on entry.
    pub fn on_entry_with<F>(self, action: F) -> Result<Self, ConfigError>
    where
        F: Fn(&Transition<S, T>) + Send + Sync + 'static,
    {
        self.update(move |definition| {
            definition
                .entry
                .push(StateAction::WithTransition(Arc::new(action)));
            Ok(())
        })
    }

    /// Run `action` on exit.
    pub fn on_exit<F>(self, action: F) -> Result<Self, ConfigError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.update(move |definition| {
            definition.exit.push(StateAction::Plain(Arc::new(action)));
            Ok(())
        })
    }

    /// Run `action` with the transition on exit.
    pub fn on_exit_with<F>(self, action: F) -> Result<Self, ConfigError>
    where
        F: Fn(&Transition<S, T>) + Send + Sync + 'static,
    {
        self.update(move |definition| {
            definition
                .exit
                .push(StateAction::WithTransition(Arc::new(action)));
            Ok(())
        })
    }

    fn register(self, trigger: T, behaviour: TriggerBehaviour<S, T>) -> Result<Self, ConfigError> {
        let duplicate = self.duplicate(&trigger);
        self.update(move |definition| match definition.triggers.entry(trigger) {
            Entry::Vacant(slot) => {
                slot.insert(behaviour);
                Ok(())
            }
            Entry::Occupied(_) => Err(duplicate),
        })
    }

    fn duplicate(&self, trigger: &T) -> ConfigError {
        ConfigError::DuplicateTrigger {
            state: self.state.name().to_string(),
            trigger: trigger.name().to_string(),
        }
    }

    fn update<F>(self, apply: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&mut StateDefinition<S, T>) -> Result<(), ConfigError>,
    {
        {
            let mut blueprint = self.blueprint.lock();
            let definitions = blueprint.as_mut().ok_or(ConfigError::Locked)?;
            let definition = definitions
                .entry(self.state.clone())
                .or_insert_with(|| StateDefinition::new(self.state.clone()));
            apply(definition)?;
        }
        Ok(self)
    }
}

impl<S: State, T: Trigger> fmt::Debug for StateConfiguration<'_, S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateConfiguration")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

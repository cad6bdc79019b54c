//! Per-state declaration data collected by [`StateConfiguration`].
//!
//! [`StateConfiguration`]: crate::builder::StateConfiguration

use crate::core::{Guard, State, Transition, Trigger};
use std::collections::HashMap;
use std::sync::Arc;

/// Callback receiving the transition being performed.
pub(crate) type TransitionAction<S, T> = Arc<dyn Fn(&Transition<S, T>) + Send + Sync>;

/// Callback without parameters.
pub(crate) type PlainAction = Arc<dyn Fn() + Send + Sync>;

/// Selector choosing a destination when the trigger is processed.
pub(crate) type DestinationSelector<S> = Arc<dyn Fn() -> S + Send + Sync>;

/// An entry or exit callback.
pub(crate) enum StateAction<S: State, T: Trigger> {
    Plain(PlainAction),
    WithTransition(TransitionAction<S, T>),
}

impl<S: State, T: Trigger> StateAction<S, T> {
    pub(crate) fn run(&self, transition: &Transition<S, T>) {
        match self {
            StateAction::Plain(action) => action(),
            StateAction::WithTransition(action) => action(transition),
        }
    }
}

pub(crate) enum Destination<S: State> {
    Static(S),
    Dynamic(DestinationSelector<S>),
}

impl<S: State> Destination<S> {
    pub(crate) fn resolve(&self) -> S {
        match self {
            Destination::Static(state) => state.clone(),
            Destination::Dynamic(selector) => selector(),
        }
    }
}

/// How a state responds to one trigger.
pub(crate) enum TriggerBehaviour<S: State, T: Trigger> {
    Permit {
        guard: Guard,
        destination: Destination<S>,
    },
    Ignore {
        guard: Guard,
    },
    Internal {
        actions: Vec<TransitionAction<S, T>>,
    },
}

/// Everything declared for a single state.
pub(crate) struct StateDefinition<S: State, T: Trigger> {
    pub(crate) state: S,
    /// Equal to `state` for a root state.
    pub(crate) parent: S,
    /// Equal to `state` when there is no forced initial substate.
    pub(crate) initial: S,
    pub(crate) triggers: HashMap<T, TriggerBehaviour<S, T>>,
    pub(crate) entry: Vec<StateAction<S, T>>,
    pub(crate) exit: Vec<StateAction<S, T>>,
}

impl<S: State, T: Trigger> StateDefinition<S, T> {
    pub(crate) fn new(state: S) -> Self {
        Self {
            parent: state.clone(),
            initial: state.clone(),
            state,
            triggers: HashMap::new(),
            entry: Vec::new(),
            exit: Vec::new(),
        }
    }

    pub(crate) fn is_root(&self) -> bool {
        self.parent == self.state
    }

    pub(crate) fn initial_substate(&self) -> Option<&S> {
        (self.initial != self.state).then_some(&self.initial)
    }
}

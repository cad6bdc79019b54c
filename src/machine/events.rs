//! Lifecycle notifications and their subscribers.

use crate::core::{State, Transition, Trigger};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Notification raised while a machine processes triggers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub enum MachineEvent<S: State, T: Trigger> {
    /// A transition was resolved; nothing has been exited yet.
    Transitioning(Transition<S, T>),

    /// Exits have run and the current state has changed; entries are next.
    StateChanged(Transition<S, T>),

    /// Entries have run; the transition is complete.
    Transitioned(Transition<S, T>),

    /// No state in the current ancestor chain declares the trigger.
    Unhandled { state: S, trigger: T },

    /// A runtime error occurred while processing a trigger.
    Error(String),

    /// Debug trace of trigger processing.
    Trace(String),
}

impl<S: State, T: Trigger> MachineEvent<S, T> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Transitioning(_) => EventKind::Transitioning,
            Self::StateChanged(_) => EventKind::StateChanged,
            Self::Transitioned(_) => EventKind::Transitioned,
            Self::Unhandled { .. } => EventKind::Unhandled,
            Self::Error(_) => EventKind::Error,
            Self::Trace(_) => EventKind::Trace,
        }
    }
}

/// Channel selector for [`StateMachine::subscribe`](crate::StateMachine::subscribe).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Transitioning,
    StateChanged,
    Transitioned,
    Unhandled,
    /// Subscribing here makes runtime errors non-fatal: they are delivered
    /// to the subscriber and draining continues.
    Error,
    Trace,
}

/// Token returned by `subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub(crate) type Listener<S, T> = Arc<dyn Fn(&MachineEvent<S, T>) + Send + Sync>;

struct Subscription<S: State, T: Trigger> {
    id: SubscriptionId,
    kind: EventKind,
    listener: Listener<S, T>,
}

pub(crate) struct Subscribers<S: State, T: Trigger> {
    entries: RwLock<Vec<Subscription<S, T>>>,
}

impl<S: State, T: Trigger> Subscribers<S, T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self, kind: EventKind, listener: Listener<S, T>) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.entries.write().push(Subscription { id, kind, listener });
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|subscription| subscription.id != id);
        entries.len() != before
    }

    pub(crate) fn has(&self, kind: EventKind) -> bool {
        self.entries
            .read()
            .iter()
            .any(|subscription| subscription.kind == kind)
    }

    /// Deliver the event built by `event` to every listener of `kind`.
    ///
    /// The event is only built if someone listens. Listeners run after the
    /// registry lock is released.
    pub(crate) fn emit<F>(&self, kind: EventKind, event: F)
    where
        F: FnOnce() -> MachineEvent<S, T>,
    {
        let listeners: Vec<Listener<S, T>> = self
            .entries
            .read()
            .iter()
            .filter(|subscription| subscription.kind == kind)
            .map(|subscription| Arc::clone(&subscription.listener))
            .collect();

        if listeners.is_empty() {
            return;
        }

        let event = event();
        for listener in listeners {
            listener(&event);
        }
    }
}

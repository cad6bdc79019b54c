//! The hierarchical state machine runtime.
//!
//! A [`StateMachine`] goes through two phases:
//!
//! 1. **Build**: [`configure`](StateMachine::configure) declares states,
//!    triggers and hierarchy.
//! 2. **Run**: the first [`fire`](StateMachine::fire) (or an explicit
//!    [`lock`](StateMachine::lock)) validates the declarations, freezes them
//!    into an index-based graph and precomputes every ancestor chain.
//!
//! Triggers are appended to a bounded queue. Whichever caller wins a
//! compare-and-swap on the drain gate processes the queue until it is
//! empty; everyone else returns at once. Firing from inside a callback
//! therefore never recurses: it only appends.

mod events;
mod graph;
mod limits;
mod queue;

pub use events::{EventKind, MachineEvent, SubscriptionId};
pub use limits::{Limits, DEFAULT_MAX_INITIAL_DEPTH, DEFAULT_MAX_PENDING_TRIGGERS};

use crate::builder::definition::{StateAction, StateDefinition, TriggerBehaviour};
use crate::builder::{Blueprint, ConfigError, StateConfiguration};
use crate::core::{Guard, State, Transition, Trigger};
use events::Subscribers;
use graph::{declared_ancestors, StateGraph};
use parking_lot::Mutex;
use queue::{DrainGate, PendingQueue};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use thiserror::Error;
use tracing::{debug, error, trace, warn};

/// Errors returned by the runtime operations of a [`StateMachine`].
#[derive(Debug, Error)]
pub enum FireError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("State '{state}' is not configured")]
    UnknownState { state: String },

    #[error("Trigger '{trigger}' in '{state}' selected unconfigured state '{destination}'")]
    UnknownDestination {
        state: String,
        trigger: String,
        destination: String,
    },

    #[error("Trigger '{trigger}' selected the current state '{state}'")]
    ReentrantTransition { state: String, trigger: String },

    #[error("Initial substate chain entered from '{state}' exceeds {max} hops")]
    InitialChainTooDeep { state: String, max: usize },

    #[error("Another caller is draining the machine")]
    Busy,

    #[error("The state machine has been dropped")]
    Disposed,
}

struct Shared<S: State, T: Trigger> {
    initial: S,
    limits: Limits,
    blueprint: Blueprint<S, T>,
    graph: OnceLock<StateGraph<S, T>>,
    /// Index into `graph`; meaningless until the graph is set.
    current: AtomicUsize,
    queue: PendingQueue<T>,
    gate: DrainGate,
    subscribers: Subscribers<S, T>,
}

/// A hierarchical state machine over states `S` and triggers `T`.
///
/// Cloning yields another strong handle to the same machine. Callbacks that
/// need to fire back into the machine should capture a [`MachineHandle`]
/// from [`handle`](Self::handle) instead, so the machine does not own
/// itself.
///
/// # Example
///
/// ```rust
/// use hfsm::{state_enum, trigger_enum, StateMachine};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// state_enum! {
///     enum Player { Idle, Running, Paused }
/// }
///
/// trigger_enum! {
///     enum Command { Start, Pause, Resume }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let resumed = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&resumed);
///
/// let machine = StateMachine::new(Player::Idle);
/// machine.configure(Player::Idle)?.permit(Command::Start, Player::Running)?;
/// machine.configure(Player::Running)?.permit(Command::Pause, Player::Paused)?;
/// machine
///     .configure(Player::Paused)?
///     .substate_of(Player::Running)?
///     .internal_transition(Command::Resume, move |_| {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })?;
///
/// machine.fire(Command::Start)?;
/// machine.fire(Command::Pause)?;
/// machine.fire(Command::Resume)?;
/// machine.fire(Command::Resume)?;
///
/// assert_eq!(machine.state(), Player::Paused);
/// assert_eq!(resumed.load(Ordering::SeqCst), 2);
/// # Ok(())
/// # }
/// ```
pub struct StateMachine<S: State, T: Trigger> {
    shared: Arc<Shared<S, T>>,
}

/// Weak handle for firing into a machine from its own callbacks.
pub struct MachineHandle<S: State, T: Trigger> {
    shared: Weak<Shared<S, T>>,
}

impl<S: State, T: Trigger> StateMachine<S, T> {
    /// Create a machine in `initial`, with default [`Limits`].
    pub fn new(initial: S) -> Self {
        Self::with_limits(initial, Limits::default())
    }

    /// Create a machine in `initial` with custom limits.
    pub fn with_limits(initial: S, limits: Limits) -> Self {
        let mut definitions = HashMap::new();
        definitions.insert(initial.clone(), StateDefinition::new(initial.clone()));

        Self {
            shared: Arc::new(Shared {
                initial,
                limits,
                blueprint: Mutex::new(Some(definitions)),
                graph: OnceLock::new(),
                current: AtomicUsize::new(0),
                queue: PendingQueue::new(limits.max_pending_triggers),
                gate: DrainGate::default(),
                subscribers: Subscribers::new(),
            }),
        }
    }

    /// Declare or extend the configuration of `state`.
    ///
    /// Fails with [`ConfigError::Locked`] once the machine has been fired.
    pub fn configure(&self, state: S) -> Result<StateConfiguration<'_, S, T>, ConfigError> {
        StateConfiguration::open(state, &self.shared.blueprint)
    }

    /// Validate the configuration and freeze it.
    ///
    /// Happens implicitly on the first [`fire`](Self::fire) or
    /// [`activate`](Self::activate); calling it early surfaces
    /// configuration errors before any trigger is processed. Idempotent.
    pub fn lock(&self) -> Result<(), ConfigError> {
        self.graph().map(|_| ())
    }

    /// True once the configuration has been frozen.
    pub fn is_locked(&self) -> bool {
        self.shared.graph.get().is_some()
    }

    /// Queue `trigger` and, unless another caller is already draining,
    /// process the queue until it is empty.
    ///
    /// Returning `Ok` does not guarantee the trigger has been processed:
    /// if the drain gate is held elsewhere (another thread, or a callback
    /// further up this thread's stack), the holder processes it. Triggers
    /// fired while the queue already holds
    /// [`max_pending_triggers`](Limits::max_pending_triggers) entries are
    /// logged and dropped.
    pub fn fire(&self, trigger: T) -> Result<(), FireError> {
        let graph = self.graph()?;

        if let Err(dropped) = self.shared.queue.push(trigger) {
            warn!(
                trigger = dropped.name(),
                limit = self.shared.queue.limit(),
                "pending trigger queue is full, dropping trigger"
            );
            self.trace(|| format!("dropped {}: queue full", dropped.name()));
            return Ok(());
        }

        self.drain(graph)
    }

    /// Force the current state to `state` and run only its parameterless
    /// entry callbacks. No exits, no ancestor entries, no notifications.
    ///
    /// Fails with [`FireError::Busy`] if a drain is in progress.
    pub fn activate(&self, state: S) -> Result<(), FireError> {
        let graph = self.graph()?;
        let index = graph.index_of(&state).ok_or_else(|| FireError::UnknownState {
            state: state.name().to_string(),
        })?;

        {
            let Some(_gate) = self.shared.gate.try_acquire() else {
                return Err(FireError::Busy);
            };
            self.shared.current.store(index, Ordering::Release);
            for action in &graph.node(index).definition.entry {
                if let StateAction::Plain(action) = action {
                    action();
                }
            }
            debug!(state = state.name(), "activated");
        }

        // Triggers that arrived while the gate was held for activation.
        if self.shared.queue.is_empty() {
            Ok(())
        } else {
            self.drain(graph)
        }
    }

    /// The current state.
    pub fn state(&self) -> S {
        match self.shared.graph.get() {
            Some(graph) => graph.state(self.current_index()).clone(),
            None => self.shared.initial.clone(),
        }
    }

    /// True if `state` is the current state or one of its ancestors.
    pub fn is_in_state(&self, state: &S) -> bool {
        if let Some(graph) = self.shared.graph.get() {
            return graph
                .index_of(state)
                .is_some_and(|candidate| graph.is_within(self.current_index(), candidate));
        }

        let blueprint = self.shared.blueprint.lock();
        let initial = &self.shared.initial;
        let within = *state == *initial
            || blueprint.as_ref().is_some_and(|definitions| {
                declared_ancestors(initial, definitions).any(|ancestor| ancestor == state)
            });
        within
    }

    /// True if `trigger` is waiting in the queue.
    pub fn is_queued(&self, trigger: &T) -> bool {
        self.shared.queue.contains(trigger)
    }

    /// Number of triggers waiting in the queue.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// True if firing `trigger` now would run a transition or an internal
    /// action. Evaluates guards; does not lock the configuration.
    pub fn can_fire(&self, trigger: &T) -> bool {
        if let Some(graph) = self.shared.graph.get() {
            return graph
                .resolve(self.current_index(), trigger)
                .and_then(|(_, behaviour)| acceptance(behaviour))
                .is_some_and(|guard| guard.check());
        }

        // The guard runs after the blueprint is released so it may query
        // the machine.
        let guard = {
            let blueprint = self.shared.blueprint.lock();
            let Some(definitions) = blueprint.as_ref() else {
                return false;
            };
            let initial = &self.shared.initial;
            let guard = std::iter::once(initial)
                .chain(declared_ancestors(initial, definitions))
                .find_map(|state| definitions.get(state)?.triggers.get(trigger))
                .and_then(acceptance);
            guard
        };
        guard.is_some_and(|guard| guard.check())
    }

    /// Register `listener` for events of `kind`.
    ///
    /// Listeners run synchronously on the draining thread and may fire,
    /// subscribe or unsubscribe.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&MachineEvent<S, T>) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(kind, Arc::new(listener))
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers.unsubscribe(id)
    }

    /// A weak handle for use inside callbacks.
    pub fn handle(&self) -> MachineHandle<S, T> {
        MachineHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Release this handle. In-flight processing on other threads is not
    /// cancelled.
    pub fn dispose(self) {
        debug!(
            state = self.state().name(),
            pending = self.pending(),
            "state machine handle disposed"
        );
    }

    fn current_index(&self) -> usize {
        self.shared.current.load(Ordering::Acquire)
    }

    /// The frozen graph, building it on first use.
    fn graph(&self) -> Result<&StateGraph<S, T>, ConfigError> {
        if let Some(graph) = self.shared.graph.get() {
            return Ok(graph);
        }

        let mut blueprint = self.shared.blueprint.lock();
        // Another caller may have locked while we waited.
        if let Some(graph) = self.shared.graph.get() {
            return Ok(graph);
        }
        let definitions = blueprint.as_ref().ok_or(ConfigError::Locked)?;
        StateGraph::validate(definitions, &self.shared.limits)?;

        let definitions = blueprint.take().unwrap_or_default();
        let graph = StateGraph::build(definitions, &self.shared.limits);
        // The initial state is declared by the constructor and never removed.
        let initial = graph.index_of(&self.shared.initial).unwrap_or_default();
        self.shared.current.store(initial, Ordering::Release);
        debug!(
            states = graph.len(),
            initial = self.shared.initial.name(),
            "configuration locked"
        );

        Ok(self.shared.graph.get_or_init(|| graph))
    }

    /// Process the queue until it is empty.
    ///
    /// A failing trigger never stops the drain. Without an error subscriber
    /// the first failure is returned once the queue is empty.
    fn drain(&self, graph: &StateGraph<S, T>) -> Result<(), FireError> {
        let mut first_failure = None;
        loop {
            {
                let Some(_gate) = self.shared.gate.try_acquire() else {
                    break;
                };
                while let Some(trigger) = self.shared.queue.pop() {
                    if let Err(failure) = self.process(graph, trigger) {
                        self.report(failure, &mut first_failure);
                    }
                }
            }

            // A trigger queued between the last pop and the release would
            // otherwise wait for the next fire.
            if self.shared.queue.is_empty() {
                break;
            }
        }
        first_failure.map_or(Ok(()), Err)
    }

    fn report(&self, failure: FireError, first_failure: &mut Option<FireError>) {
        let subscribers = &self.shared.subscribers;
        if subscribers.has(EventKind::Error) {
            warn!(error = %failure, "trigger processing failed");
            subscribers.emit(EventKind::Error, || MachineEvent::Error(failure.to_string()));
        } else {
            error!(error = %failure, "trigger processing failed");
            first_failure.get_or_insert(failure);
        }
    }

    fn process(&self, graph: &StateGraph<S, T>, trigger: T) -> Result<(), FireError> {
        let current = self.current_index();
        let state = graph.state(current);
        trace!(trigger = trigger.name(), state = state.name(), "processing trigger");

        let Some((owner, behaviour)) = graph.resolve(current, &trigger) else {
            self.unhandled(state, trigger);
            return Ok(());
        };

        match behaviour {
            TriggerBehaviour::Ignore { guard } => {
                if guard.check() {
                    trace!(trigger = trigger.name(), state = state.name(), "trigger ignored");
                    self.trace(|| format!("{} ignored in {}", trigger.name(), state.name()));
                } else {
                    self.unhandled(state, trigger);
                }
                Ok(())
            }
            TriggerBehaviour::Internal { actions } => {
                self.trace(|| {
                    format!(
                        "{} handled internally by {} in {}",
                        trigger.name(),
                        graph.state(owner).name(),
                        state.name()
                    )
                });
                let transition = Transition::internal(trigger, state.clone());
                for action in actions {
                    action(&transition);
                }
                Ok(())
            }
            TriggerBehaviour::Permit { guard, destination } => {
                if !guard.check() {
                    trace!(
                        trigger = trigger.name(),
                        state = state.name(),
                        "guard rejected trigger"
                    );
                    self.trace(|| {
                        format!("{} rejected by guard in {}", trigger.name(), state.name())
                    });
                    return Ok(());
                }

                let target = destination.resolve();
                let target_index = graph.index_of(&target).ok_or_else(|| {
                    FireError::UnknownDestination {
                        state: state.name().to_string(),
                        trigger: trigger.name().to_string(),
                        destination: target.name().to_string(),
                    }
                })?;
                if target_index == current {
                    return Err(FireError::ReentrantTransition {
                        state: state.name().to_string(),
                        trigger: trigger.name().to_string(),
                    });
                }
                let leaf = graph
                    .initial_leaf(target_index)
                    .ok_or_else(|| FireError::InitialChainTooDeep {
                        state: target.name().to_string(),
                        max: self.shared.limits.max_initial_depth,
                    })?;

                self.transition(graph, current, leaf, trigger);
                Ok(())
            }
        }
    }

    fn transition(&self, graph: &StateGraph<S, T>, source: usize, destination: usize, trigger: T) {
        let transition = Transition::new(
            trigger,
            graph.state(source).clone(),
            graph.state(destination).clone(),
        );
        let subscribers = &self.shared.subscribers;

        subscribers.emit(EventKind::Transitioning, || {
            MachineEvent::Transitioning(transition.clone())
        });
        self.trace(|| {
            let via = graph
                .common_ancestor(source, destination)
                .map_or("<none>", |lca| graph.state(lca).name());
            format!(
                "{}: {} -> {} via {}",
                transition.trigger.name(),
                transition.source.name(),
                transition.destination.name(),
                via
            )
        });

        let path = graph.path(source, destination);
        for &exited in &path.exits {
            for action in &graph.node(exited).definition.exit {
                action.run(&transition);
            }
        }

        self.shared.current.store(destination, Ordering::Release);
        subscribers.emit(EventKind::StateChanged, || {
            MachineEvent::StateChanged(transition.clone())
        });

        for &entered in &path.entries {
            for action in &graph.node(entered).definition.entry {
                action.run(&transition);
            }
        }

        debug!(
            trigger = transition.trigger.name(),
            from = transition.source.name(),
            to = transition.destination.name(),
            "transitioned"
        );
        subscribers.emit(EventKind::Transitioned, || MachineEvent::Transitioned(transition));
    }

    fn unhandled(&self, state: &S, trigger: T) {
        warn!(trigger = trigger.name(), state = state.name(), "unhandled trigger");
        self.shared.subscribers.emit(EventKind::Unhandled, || MachineEvent::Unhandled {
            state: state.clone(),
            trigger,
        });
    }

    fn trace<F>(&self, message: F)
    where
        F: FnOnce() -> String,
    {
        self.shared
            .subscribers
            .emit(EventKind::Trace, || MachineEvent::Trace(message()));
    }
}

/// The guard deciding whether `behaviour` would act, or `None` for an
/// ignore.
fn acceptance<S: State, T: Trigger>(behaviour: &TriggerBehaviour<S, T>) -> Option<Guard> {
    match behaviour {
        TriggerBehaviour::Permit { guard, .. } => Some(guard.clone()),
        TriggerBehaviour::Internal { .. } => Some(Guard::always()),
        TriggerBehaviour::Ignore { .. } => None,
    }
}

impl<S: State, T: Trigger> Clone for StateMachine<S, T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: State, T: Trigger> fmt::Debug for StateMachine<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("state", &self.state())
            .field("locked", &self.is_locked())
            .field("pending", &self.pending())
            .finish()
    }
}

impl<S: State, T: Trigger> MachineHandle<S, T> {
    /// Fire into the machine, if it is still alive.
    pub fn fire(&self, trigger: T) -> Result<(), FireError> {
        self.upgrade().ok_or(FireError::Disposed)?.fire(trigger)
    }

    /// A strong handle, if the machine is still alive.
    pub fn upgrade(&self) -> Option<StateMachine<S, T>> {
        self.shared.upgrade().map(|shared| StateMachine { shared })
    }
}

impl<S: State, T: Trigger> Clone for MachineHandle<S, T> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

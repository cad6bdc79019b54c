//! Frozen, index-based view of a machine's configuration.
//!
//! Built once when the machine locks. Every state gets a dense index;
//! parents, initial substates and ancestor chains are stored as indices so
//! trigger resolution and ancestor diffing never hash a state.

use crate::builder::definition::{Destination, StateDefinition, TriggerBehaviour};
use crate::builder::ConfigError;
use crate::core::{State, Trigger};
use crate::machine::limits::Limits;
use std::collections::HashMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ConfigError>>;

pub(crate) struct StateNode<S: State, T: Trigger> {
    pub(crate) definition: StateDefinition<S, T>,
    parent: Option<usize>,
    initial: Option<usize>,
    /// This state first, then each parent up to the root.
    ancestors: Vec<usize>,
}

/// States that must be exited and entered for one transition.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct TransitionPath {
    /// Deepest first.
    pub(crate) exits: Vec<usize>,
    /// Shallowest first, ending at the destination.
    pub(crate) entries: Vec<usize>,
}

pub(crate) struct StateGraph<S: State, T: Trigger> {
    nodes: Vec<StateNode<S, T>>,
    index: HashMap<S, usize>,
    max_initial_depth: usize,
}

impl<S: State, T: Trigger> StateGraph<S, T> {
    /// Check every declaration, accumulating all violations.
    pub(crate) fn validate(
        definitions: &HashMap<S, StateDefinition<S, T>>,
        limits: &Limits,
    ) -> Result<(), ConfigError> {
        let mut checks: Vec<Check> = Vec::new();

        for definition in definitions.values() {
            checks.push(check_parent(definition, definitions));
            checks.push(check_acyclic(definition, definitions));
            checks.extend(check_destinations(definition, definitions));
            checks.push(check_initial(definition, definitions, limits.max_initial_depth));
        }

        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => {
                let mut errors: Vec<ConfigError> = errors.iter().cloned().collect();
                if errors.len() == 1 {
                    Err(errors.remove(0))
                } else {
                    Err(ConfigError::Multiple(errors))
                }
            }
        }
    }

    /// Index validated declarations and precompute ancestor chains.
    ///
    /// Callers must have run [`validate`](Self::validate) on the same map.
    pub(crate) fn build(definitions: HashMap<S, StateDefinition<S, T>>, limits: &Limits) -> Self {
        let mut index = HashMap::with_capacity(definitions.len());
        let mut pending = Vec::with_capacity(definitions.len());
        for (position, (state, definition)) in definitions.into_iter().enumerate() {
            index.insert(state, position);
            pending.push(definition);
        }

        let mut nodes: Vec<StateNode<S, T>> = pending
            .into_iter()
            .map(|definition| {
                let parent = if definition.is_root() {
                    None
                } else {
                    index.get(&definition.parent).copied()
                };
                let initial = definition
                    .initial_substate()
                    .and_then(|initial| index.get(initial).copied());
                StateNode {
                    definition,
                    parent,
                    initial,
                    ancestors: Vec::new(),
                }
            })
            .collect();

        for position in 0..nodes.len() {
            let mut ancestors = vec![position];
            let mut cursor = position;
            while let Some(parent) = nodes[cursor].parent {
                ancestors.push(parent);
                cursor = parent;
            }
            nodes[position].ancestors = ancestors;
        }

        Self {
            nodes,
            index,
            max_initial_depth: limits.max_initial_depth,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn index_of(&self, state: &S) -> Option<usize> {
        self.index.get(state).copied()
    }

    pub(crate) fn state(&self, index: usize) -> &S {
        &self.nodes[index].definition.state
    }

    pub(crate) fn node(&self, index: usize) -> &StateNode<S, T> {
        &self.nodes[index]
    }

    pub(crate) fn ancestors(&self, index: usize) -> &[usize] {
        &self.nodes[index].ancestors
    }

    /// True if `candidate` is `index` or one of its ancestors.
    pub(crate) fn is_within(&self, index: usize, candidate: usize) -> bool {
        self.nodes[index].ancestors.contains(&candidate)
    }

    /// Nearest configuration, from `current` upward, that declares
    /// `trigger`, together with the declaring state's index.
    pub(crate) fn resolve(
        &self,
        current: usize,
        trigger: &T,
    ) -> Option<(usize, &TriggerBehaviour<S, T>)> {
        self.nodes[current].ancestors.iter().find_map(|&owner| {
            self.nodes[owner]
                .definition
                .triggers
                .get(trigger)
                .map(|behaviour| (owner, behaviour))
        })
    }

    /// Follow initial-substate links from `destination`. `None` when the
    /// chain is longer than the configured maximum.
    pub(crate) fn initial_leaf(&self, destination: usize) -> Option<usize> {
        let mut leaf = destination;
        let mut hops = 0;
        while let Some(next) = self.nodes[leaf].initial {
            if hops == self.max_initial_depth {
                return None;
            }
            leaf = next;
            hops += 1;
        }
        Some(leaf)
    }

    /// Least common ancestor of two states, if their hierarchies meet.
    pub(crate) fn common_ancestor(&self, source: usize, destination: usize) -> Option<usize> {
        let shared = shared_suffix(self.ancestors(source), self.ancestors(destination));
        let chain = self.ancestors(source);
        (shared > 0).then(|| chain[chain.len() - shared])
    }

    /// States exited and entered when moving from `source` to
    /// `destination`. The common ancestor itself is neither.
    pub(crate) fn path(&self, source: usize, destination: usize) -> TransitionPath {
        let from = self.ancestors(source);
        let to = self.ancestors(destination);
        let shared = shared_suffix(from, to);

        TransitionPath {
            exits: from[..from.len() - shared].to_vec(),
            entries: to[..to.len() - shared].iter().rev().copied().collect(),
        }
    }
}

/// Length of the common root-end suffix of two ancestor chains.
fn shared_suffix(a: &[usize], b: &[usize]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Walk parent links from `start` (exclusive). Stops at a root, at an
/// undeclared parent, or after `definitions.len()` steps.
pub(crate) fn declared_ancestors<'a, S: State, T: Trigger>(
    start: &'a S,
    definitions: &'a HashMap<S, StateDefinition<S, T>>,
) -> impl Iterator<Item = &'a S> + 'a {
    let mut cursor = definitions.get(start);
    let mut remaining = definitions.len();
    std::iter::from_fn(move || {
        let definition = cursor?;
        if definition.is_root() || remaining == 0 {
            return None;
        }
        remaining -= 1;
        cursor = definitions.get(&definition.parent);
        Some(&definition.parent)
    })
}

fn check_parent<S: State, T: Trigger>(
    definition: &StateDefinition<S, T>,
    definitions: &HashMap<S, StateDefinition<S, T>>,
) -> Check {
    if definition.is_root() || definitions.contains_key(&definition.parent) {
        Validation::success(())
    } else {
        Validation::fail(ConfigError::UnknownParent {
            state: definition.state.name().to_string(),
            parent: definition.parent.name().to_string(),
        })
    }
}

fn check_acyclic<S: State, T: Trigger>(
    definition: &StateDefinition<S, T>,
    definitions: &HashMap<S, StateDefinition<S, T>>,
) -> Check {
    let state = &definition.state;
    if declared_ancestors(state, definitions).any(|ancestor| ancestor == state) {
        Validation::fail(ConfigError::CyclicHierarchy {
            state: definition.state.name().to_string(),
        })
    } else {
        Validation::success(())
    }
}

fn check_destinations<S: State, T: Trigger>(
    definition: &StateDefinition<S, T>,
    definitions: &HashMap<S, StateDefinition<S, T>>,
) -> Vec<Check> {
    definition
        .triggers
        .iter()
        .filter_map(|(trigger, behaviour)| match behaviour {
            TriggerBehaviour::Permit {
                destination: Destination::Static(destination),
                ..
            } if !definitions.contains_key(destination) => {
                Some(Validation::fail(ConfigError::UnknownDestination {
                    state: definition.state.name().to_string(),
                    trigger: trigger.name().to_string(),
                    destination: destination.name().to_string(),
                }))
            }
            _ => None,
        })
        .collect()
}

fn check_initial<S: State, T: Trigger>(
    definition: &StateDefinition<S, T>,
    definitions: &HashMap<S, StateDefinition<S, T>>,
    max_depth: usize,
) -> Check {
    let Some(initial) = definition.initial_substate() else {
        return Validation::success(());
    };

    let is_descendant = definitions.contains_key(initial)
        && declared_ancestors(initial, definitions).any(|ancestor| *ancestor == definition.state);
    if !is_descendant {
        return Validation::fail(ConfigError::InvalidInitial {
            state: definition.state.name().to_string(),
            initial: initial.name().to_string(),
        });
    }

    let mut hops = 0;
    let mut cursor = definition;
    while let Some(next) = cursor.initial_substate() {
        if hops == max_depth {
            return Validation::fail(ConfigError::InitialChainTooDeep {
                state: definition.state.name().to_string(),
                max: max_depth,
            });
        }
        match definitions.get(next) {
            Some(found) => cursor = found,
            None => break,
        }
        hops += 1;
    }
    Validation::success(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Guard;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum S {
        Root,
        Left,
        LeftLeaf,
        Right,
        RightLeaf,
        Island,
    }

    impl State for S {
        fn name(&self) -> &str {
            match self {
                Self::Root => "Root",
                Self::Left => "Left",
                Self::LeftLeaf => "LeftLeaf",
                Self::Right => "Right",
                Self::RightLeaf => "RightLeaf",
                Self::Island => "Island",
            }
        }
    }

    #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum T {
        Go,
    }

    impl Trigger for T {
        fn name(&self) -> &str {
            "Go"
        }
    }

    fn declare(definitions: &mut HashMap<S, StateDefinition<S, T>>, state: S, parent: Option<S>) {
        let mut definition = StateDefinition::new(state.clone());
        if let Some(parent) = parent {
            definition.parent = parent;
        }
        definitions.insert(state, definition);
    }

    fn tree() -> HashMap<S, StateDefinition<S, T>> {
        let mut definitions = HashMap::new();
        declare(&mut definitions, S::Root, None);
        declare(&mut definitions, S::Left, Some(S::Root));
        declare(&mut definitions, S::LeftLeaf, Some(S::Left));
        declare(&mut definitions, S::Right, Some(S::Root));
        declare(&mut definitions, S::RightLeaf, Some(S::Right));
        declare(&mut definitions, S::Island, None);
        definitions
    }

    fn graph(definitions: HashMap<S, StateDefinition<S, T>>) -> StateGraph<S, T> {
        let limits = Limits::default();
        StateGraph::validate(&definitions, &limits).unwrap();
        StateGraph::build(definitions, &limits)
    }

    fn idx(graph: &StateGraph<S, T>, state: S) -> usize {
        graph.index_of(&state).unwrap()
    }

    #[test]
    fn ancestors_start_with_self_and_end_at_root() {
        let graph = graph(tree());
        let chain: Vec<&S> = graph
            .ancestors(idx(&graph, S::LeftLeaf))
            .iter()
            .map(|&i| graph.state(i))
            .collect();
        assert_eq!(chain, vec![&S::LeftLeaf, &S::Left, &S::Root]);
    }

    #[test]
    fn common_ancestor_of_cousins_is_root() {
        let graph = graph(tree());
        let lca = graph.common_ancestor(idx(&graph, S::LeftLeaf), idx(&graph, S::RightLeaf));
        assert_eq!(lca, Some(idx(&graph, S::Root)));
    }

    #[test]
    fn common_ancestor_handles_uneven_depths() {
        let graph = graph(tree());
        let lca = graph.common_ancestor(idx(&graph, S::LeftLeaf), idx(&graph, S::Left));
        assert_eq!(lca, Some(idx(&graph, S::Left)));
    }

    #[test]
    fn disjoint_hierarchies_have_no_common_ancestor() {
        let graph = graph(tree());
        assert_eq!(
            graph.common_ancestor(idx(&graph, S::LeftLeaf), idx(&graph, S::Island)),
            None
        );
    }

    #[test]
    fn path_between_cousins_skips_shared_root() {
        let graph = graph(tree());
        let path = graph.path(idx(&graph, S::LeftLeaf), idx(&graph, S::RightLeaf));
        assert_eq!(
            path,
            TransitionPath {
                exits: vec![idx(&graph, S::LeftLeaf), idx(&graph, S::Left)],
                entries: vec![idx(&graph, S::Right), idx(&graph, S::RightLeaf)],
            }
        );
    }

    #[test]
    fn path_into_disjoint_hierarchy_exits_everything() {
        let graph = graph(tree());
        let path = graph.path(idx(&graph, S::LeftLeaf), idx(&graph, S::Island));
        assert_eq!(
            path.exits,
            vec![idx(&graph, S::LeftLeaf), idx(&graph, S::Left), idx(&graph, S::Root)]
        );
        assert_eq!(path.entries, vec![idx(&graph, S::Island)]);
    }

    #[test]
    fn nearest_declaration_wins() {
        let mut definitions = tree();
        for state in [S::Root, S::Left] {
            let destination = if state == S::Root { S::Island } else { S::Right };
            definitions.get_mut(&state).unwrap().triggers.insert(
                T::Go,
                TriggerBehaviour::Permit {
                    guard: Guard::always(),
                    destination: Destination::Static(destination),
                },
            );
        }
        let graph = graph(definitions);

        let (owner, _) = graph.resolve(idx(&graph, S::LeftLeaf), &T::Go).unwrap();
        assert_eq!(owner, idx(&graph, S::Left));

        let (owner, _) = graph.resolve(idx(&graph, S::RightLeaf), &T::Go).unwrap();
        assert_eq!(owner, idx(&graph, S::Root));

        assert!(graph.resolve(idx(&graph, S::Island), &T::Go).is_none());
    }

    #[test]
    fn cycle_is_reported_for_each_member() {
        let mut definitions = tree();
        definitions.get_mut(&S::Root).unwrap().parent = S::LeftLeaf;

        let error = StateGraph::validate(&definitions, &Limits::default()).unwrap_err();
        let cyclic = error
            .violations()
            .into_iter()
            .filter(|e| matches!(e, ConfigError::CyclicHierarchy { .. }))
            .count();
        assert_eq!(cyclic, 3);
    }

    #[test]
    fn unknown_parent_is_reported() {
        let mut definitions = tree();
        definitions.remove(&S::Right);

        let error = StateGraph::validate(&definitions, &Limits::default()).unwrap_err();
        assert_eq!(
            error,
            ConfigError::UnknownParent {
                state: "RightLeaf".to_string(),
                parent: "Right".to_string(),
            }
        );
    }

    #[test]
    fn initial_must_be_descendant() {
        let mut definitions = tree();
        definitions.get_mut(&S::Left).unwrap().initial = S::RightLeaf;

        let error = StateGraph::validate(&definitions, &Limits::default()).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidInitial { .. }));
    }

    #[test]
    fn initial_leaf_follows_chain() {
        let mut definitions = tree();
        definitions.get_mut(&S::Root).unwrap().initial = S::Left;
        definitions.get_mut(&S::Left).unwrap().initial = S::LeftLeaf;
        let graph = graph(definitions);

        assert_eq!(
            graph.initial_leaf(idx(&graph, S::Root)),
            Some(idx(&graph, S::LeftLeaf))
        );
        assert_eq!(
            graph.initial_leaf(idx(&graph, S::Right)),
            Some(idx(&graph, S::Right))
        );
    }

    #[test]
    fn initial_chain_respects_limit() {
        let mut definitions = tree();
        definitions.get_mut(&S::Root).unwrap().initial = S::Left;
        definitions.get_mut(&S::Left).unwrap().initial = S::LeftLeaf;

        let limits = Limits::default().max_initial_depth(1);
        let error = StateGraph::validate(&definitions, &limits).unwrap_err();
        assert_eq!(
            error,
            ConfigError::InitialChainTooDeep {
                state: "Root".to_string(),
                max: 1,
            }
        );
    }
}

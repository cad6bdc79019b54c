//! Entry/exit ordering across a state hierarchy.

use hfsm::{state_enum, trigger_enum, EventKind, StateMachine, Transition};
use std::sync::{Arc, Mutex};

state_enum! {
    enum Region {
        Root,
        A,
        A1,
        B,
        B1,
        Island,
    }
}

trigger_enum! {
    enum Signal {
        Go,
        Up,
        Leave,
        Reset,
    }
}

type Journal = Arc<Mutex<Vec<String>>>;

fn record(journal: &Journal, entry: impl Into<String>) {
    journal.lock().unwrap().push(entry.into());
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Root { A { A1 }, B { B1 } } plus a separate root Island, with every
/// entry and exit journaled.
fn regions() -> (StateMachine<Region, Signal>, Journal) {
    let machine = StateMachine::new(Region::A1);
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));

    let hierarchy = [
        (Region::Root, None),
        (Region::A, Some(Region::Root)),
        (Region::A1, Some(Region::A)),
        (Region::B, Some(Region::Root)),
        (Region::B1, Some(Region::B)),
        (Region::Island, None),
    ];

    for (region, parent) in hierarchy {
        let on_entry = Arc::clone(&journal);
        let on_exit = Arc::clone(&journal);
        let mut configuration = machine
            .configure(region)
            .unwrap()
            .on_entry_with(move |transition: &Transition<Region, Signal>| {
                assert_ne!(transition.source, transition.destination);
                record(&on_entry, format!("enter {:?}", region));
            })
            .unwrap()
            .on_exit(move || record(&on_exit, format!("exit {:?}", region)))
            .unwrap();
        if let Some(parent) = parent {
            configuration = configuration.substate_of(parent).unwrap();
        }
        drop(configuration);
    }

    machine
        .configure(Region::A1)
        .unwrap()
        .permit(Signal::Go, Region::B1)
        .unwrap()
        .permit(Signal::Up, Region::A)
        .unwrap()
        .permit(Signal::Leave, Region::Island)
        .unwrap()
        .ignore(Signal::Reset)
        .unwrap();
    machine
        .configure(Region::Root)
        .unwrap()
        .permit(Signal::Reset, Region::Island)
        .unwrap();

    (machine, journal)
}

#[test]
fn cousins_exit_and_enter_below_common_ancestor() {
    let (machine, journal) = regions();

    machine.fire(Signal::Go).unwrap();

    assert_eq!(machine.state(), Region::B1);
    assert_eq!(
        entries(&journal),
        vec!["exit A1", "exit A", "enter B", "enter B1"]
    );
}

#[test]
fn moving_to_an_ancestor_only_exits_the_child() {
    let (machine, journal) = regions();

    machine.fire(Signal::Up).unwrap();

    assert_eq!(machine.state(), Region::A);
    assert_eq!(entries(&journal), vec!["exit A1"]);
}

#[test]
fn disjoint_hierarchies_exit_and_enter_everything() {
    let (machine, journal) = regions();

    machine.fire(Signal::Leave).unwrap();

    assert_eq!(machine.state(), Region::Island);
    assert_eq!(
        entries(&journal),
        vec!["exit A1", "exit A", "exit Root", "enter Island"]
    );
}

#[test]
fn nearest_declaration_shadows_superstate() {
    let (machine, journal) = regions();

    machine.fire(Signal::Reset).unwrap();
    assert_eq!(machine.state(), Region::A1);
    assert!(entries(&journal).is_empty());

    machine.fire(Signal::Go).unwrap();
    machine.fire(Signal::Reset).unwrap();
    assert_eq!(machine.state(), Region::Island);
}

#[test]
fn notifications_bracket_exits_and_entries() {
    let (machine, journal) = regions();

    for (kind, label) in [
        (EventKind::Transitioning, "transitioning"),
        (EventKind::StateChanged, "changed"),
        (EventKind::Transitioned, "transitioned"),
    ] {
        let log = Arc::clone(&journal);
        machine.subscribe(kind, move |_| record(&log, label));
    }

    machine.fire(Signal::Go).unwrap();

    assert_eq!(
        entries(&journal),
        vec![
            "transitioning",
            "exit A1",
            "exit A",
            "changed",
            "enter B",
            "enter B1",
            "transitioned",
        ]
    );
}

#[test]
fn state_is_updated_before_entries_run() {
    let machine = StateMachine::new(Region::A);
    let handle = machine.handle();
    let seen = Arc::new(Mutex::new(None));

    machine
        .configure(Region::A)
        .unwrap()
        .permit(Signal::Go, Region::B)
        .unwrap();
    let observed = Arc::clone(&seen);
    machine
        .configure(Region::B)
        .unwrap()
        .on_entry(move || {
            let machine = handle.upgrade().unwrap();
            *observed.lock().unwrap() = Some(machine.state());
        })
        .unwrap();

    machine.fire(Signal::Go).unwrap();

    assert_eq!(*seen.lock().unwrap(), Some(Region::B));
}

state_enum! {
    enum Nested {
        Top,
        Outer,
        Middle,
        Inner,
    }
}

#[test]
fn initial_substates_chain_into_leaf() {
    let machine = StateMachine::new(Nested::Top);
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));

    machine
        .configure(Nested::Top)
        .unwrap()
        .permit(Signal::Go, Nested::Outer)
        .unwrap();
    for (state, parent, initial) in [
        (Nested::Outer, None, Some(Nested::Middle)),
        (Nested::Middle, Some(Nested::Outer), Some(Nested::Inner)),
        (Nested::Inner, Some(Nested::Middle), None),
    ] {
        let log = Arc::clone(&journal);
        let mut configuration = machine
            .configure(state)
            .unwrap()
            .on_entry_with(move |transition: &Transition<Nested, Signal>| {
                assert_eq!(transition.destination, Nested::Inner);
                record(&log, format!("enter {:?}", state));
            })
            .unwrap();
        if let Some(parent) = parent {
            configuration = configuration.substate_of(parent).unwrap();
        }
        if let Some(initial) = initial {
            configuration = configuration.initial_transition(initial).unwrap();
        }
        drop(configuration);
    }

    machine.fire(Signal::Go).unwrap();

    assert_eq!(machine.state(), Nested::Inner);
    assert!(machine.is_in_state(&Nested::Outer));
    assert_eq!(
        entries(&journal),
        vec!["enter Outer", "enter Middle", "enter Inner"]
    );
}

state_enum! {
    enum Player {
        Idle,
        Running,
        Paused,
    }
}

trigger_enum! {
    enum Command {
        Start,
        Pause,
        Resume,
    }
}

#[test]
fn pause_and_resume_scenario() {
    let machine = StateMachine::new(Player::Idle);
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let resumed = Arc::new(Mutex::new(0));

    machine
        .configure(Player::Idle)
        .unwrap()
        .permit(Command::Start, Player::Running)
        .unwrap();

    let entered = Arc::clone(&journal);
    let exited = Arc::clone(&journal);
    machine
        .configure(Player::Running)
        .unwrap()
        .permit(Command::Pause, Player::Paused)
        .unwrap()
        .on_entry(move || record(&entered, "enter Running"))
        .unwrap()
        .on_exit(move || record(&exited, "exit Running"))
        .unwrap();

    let entered = Arc::clone(&journal);
    let counter = Arc::clone(&resumed);
    machine
        .configure(Player::Paused)
        .unwrap()
        .substate_of(Player::Running)
        .unwrap()
        .on_entry(move || record(&entered, "enter Paused"))
        .unwrap()
        .internal_transition(Command::Resume, move |transition| {
            assert!(transition.is_internal());
            assert_eq!(transition.source, Player::Paused);
            *counter.lock().unwrap() += 1;
        })
        .unwrap();

    machine.fire(Command::Start).unwrap();
    assert_eq!(machine.state(), Player::Running);

    machine.fire(Command::Pause).unwrap();
    assert_eq!(machine.state(), Player::Paused);

    machine.fire(Command::Resume).unwrap();
    machine.fire(Command::Resume).unwrap();

    assert_eq!(*resumed.lock().unwrap(), 2);
    assert_eq!(machine.state(), Player::Paused);
    assert_eq!(entries(&journal), vec!["enter Running", "enter Paused"]);
}

#[test]
fn is_in_state_covers_current_and_ancestors_only() {
    let (machine, _) = regions();
    machine.lock().unwrap();

    assert!(machine.is_in_state(&Region::A1));
    assert!(machine.is_in_state(&Region::A));
    assert!(machine.is_in_state(&Region::Root));
    assert!(!machine.is_in_state(&Region::B));
    assert!(!machine.is_in_state(&Region::B1));
    assert!(!machine.is_in_state(&Region::Island));
}

use histcop_core::history::{Event, State};
use histcop_core::{
    Check, CompositeCheck, Error, ExternalConsistencyChecker, LinearizabilityChecker, Witness,
};

mod common;
use common::{fail, initial, invoke, ok, r, rv, w};

fn valid_history() -> (Vec<Event>, State) {
    let state = initial(&[("x", 0), ("y", 0)]);
    let history = vec![
        invoke(0, 2, 0, vec![r("x"), r("y")]),
        ok(0, 2, 3, vec![rv("x", 0), rv("y", 0)]),
    ];
    (history, state)
}

#[test]
fn full_battery_reports_one_witness_per_constituent() {
    let (history, state) = valid_history();
    match CompositeCheck::full().check(&history, &state) {
        Ok(Witness::Composite(witnesses)) => {
            assert_eq!(witnesses.len(), 2);
            assert!(matches!(witnesses[0], Witness::Linearized { records: 2, .. }));
            assert!(matches!(
                witnesses[1],
                Witness::TimeConsistent { abnormal_reads: 0, .. }
            ));
        }
        other => panic!("expected a composite witness, got {other:?}"),
    }
}

#[test]
fn one_failing_constituent_fails_the_composite() {
    // Linearizability rejects the stale read; the history has no abnormal
    // reads, so external consistency accepts it. The composite must fail
    // with exactly the linearizability diagnostic.
    let state = initial(&[("x", 0), ("y", 0)]);
    let history = vec![
        invoke(0, 0, 0, vec![r("x"), w("y", 2)]),
        invoke(2, 0, 0, vec![w("x", 3), r("y")]),
        ok(0, 3, 3, vec![rv("x", 2), w("y", 2)]),
        ok(2, 3, 3, vec![w("x", 3), rv("y", 2)]),
    ];

    assert!(ExternalConsistencyChecker::new().check(&history, &state).is_ok());

    match CompositeCheck::full().check(&history, &state) {
        Err(Error::Composite(failures)) => {
            assert_eq!(failures.len(), 1);
            assert!(matches!(failures[0], Error::Unexplainable { .. }));
        }
        other => panic!("expected a composite failure, got {other:?}"),
    }
}

#[test]
fn all_failures_are_collected_without_short_circuit() {
    let state = initial(&[("x", 0)]);
    let history = vec![
        invoke(0, 0, 0, vec![r("x")]),
        fail(0, 1, 1, vec![r("x")]),
    ];

    match CompositeCheck::full().check(&history, &state) {
        Err(Error::Composite(failures)) => {
            assert_eq!(failures.len(), 2);
            assert!(failures
                .iter()
                .all(|failure| matches!(failure, Error::Aborted { .. })));
        }
        other => panic!("expected both constituents to fail, got {other:?}"),
    }
}

#[test]
fn empty_composite_is_vacuously_valid() {
    let (history, state) = valid_history();
    assert_eq!(
        CompositeCheck::new(Vec::new()).check(&history, &state),
        Ok(Witness::Composite(Vec::new()))
    );
}

#[test]
fn constituents_report_their_names() {
    assert_eq!(LinearizabilityChecker::new().name(), "linearizability");
    assert_eq!(
        ExternalConsistencyChecker::new().name(),
        "external-consistency"
    );
    assert_eq!(CompositeCheck::full().name(), "composite");
}

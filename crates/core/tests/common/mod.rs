//! Builders for test histories.
//!
//! Events are written the way the recorder logs them: an `invoke` with the
//! reads still pending (`r`), then a completion carrying the observed
//! values (`rv`). Timestamps are plain ticks.

#![allow(dead_code)]

use histcop_core::history::{Action, Event, EventKind, State, Timestamp};

pub fn r(key: &str) -> Action {
    Action::read(key.to_string())
}

pub fn rv(key: &str, value: i64) -> Action {
    Action::read_value(key.to_string(), value)
}

pub fn w(key: &str, value: i64) -> Action {
    Action::write(key.to_string(), value)
}

fn event(kind: EventKind, process: u64, commit: i64, real: i64, actions: Vec<Action>) -> Event {
    Event {
        kind,
        operation_name: "txn".to_string(),
        actions,
        process_id: process,
        commit_timestamp: Timestamp(commit),
        real_timestamp: Some(Timestamp(real)),
    }
}

pub fn invoke(process: u64, commit: i64, real: i64, actions: Vec<Action>) -> Event {
    event(EventKind::Invoke, process, commit, real, actions)
}

pub fn ok(process: u64, commit: i64, real: i64, actions: Vec<Action>) -> Event {
    event(EventKind::Ok, process, commit, real, actions)
}

pub fn fail(process: u64, commit: i64, real: i64, actions: Vec<Action>) -> Event {
    event(EventKind::Fail, process, commit, real, actions)
}

pub fn info(process: u64, commit: i64, real: i64, actions: Vec<Action>) -> Event {
    event(EventKind::Info, process, commit, real, actions)
}

pub fn initial(pairs: &[(&str, i64)]) -> State {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), *value))
        .collect()
}

//! The history data model: events, actions, timestamps, and the structural
//! invariant every checker relies on.
//!
//! A history is a `&[Event]` in file order. Checkers re-sort internally by
//! the key each needs (commit timestamp for linearizability, a hybrid key
//! for external consistency); the slice itself is never reordered.

use hashbrown::HashSet;

pub mod error;
pub mod types;

pub use types::{Action, ActionVerb, Event, EventKind, State, Timestamp};

/// Check the invoke/completion nesting invariant in file order: for every
/// process, an `Invoke` and its matching completion form a strictly nested
/// pair, so no process ever has two outstanding invokes.
///
/// # Errors
///
/// Returns [`error::Error::OverlappingInvoke`] or
/// [`error::Error::DanglingCompletion`] citing the first offending entry.
pub fn validate(history: &[Event]) -> Result<(), error::Error> {
    let mut outstanding: HashSet<u64> = HashSet::default();

    for (index, event) in history.iter().enumerate() {
        match event.kind {
            EventKind::Invoke => {
                if !outstanding.insert(event.process_id) {
                    return Err(error::Error::OverlappingInvoke {
                        index,
                        event: event.clone(),
                    });
                }
            }
            EventKind::Ok | EventKind::Fail | EventKind::Info => {
                if !outstanding.remove(&event.process_id) {
                    return Err(error::Error::DanglingCompletion {
                        index,
                        event: event.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;

    use super::*;

    fn entry(kind: EventKind, process_id: u64) -> Event {
        Event {
            kind,
            operation_name: "txn".to_string(),
            actions: vec![Action::read("x".to_string())],
            process_id,
            commit_timestamp: Timestamp(0),
            real_timestamp: None,
        }
    }

    #[test]
    fn nested_pairs_pass() {
        let history = vec![
            entry(EventKind::Invoke, 0),
            entry(EventKind::Invoke, 1),
            entry(EventKind::Ok, 0),
            entry(EventKind::Ok, 1),
        ];
        assert!(validate(&history).is_ok());
    }

    #[test]
    fn double_invoke_rejected() {
        let history = vec![entry(EventKind::Invoke, 0), entry(EventKind::Invoke, 0)];
        assert!(matches!(
            validate(&history),
            Err(error::Error::OverlappingInvoke { index: 1, .. })
        ));
    }

    #[test]
    fn completion_without_invoke_rejected() {
        let history = vec![entry(EventKind::Fail, 3)];
        assert!(matches!(
            validate(&history),
            Err(error::Error::DanglingCompletion { index: 0, .. })
        ));
    }

    #[test]
    fn trailing_invoke_allowed() {
        // A truncated history may end with operations still outstanding.
        let history = vec![entry(EventKind::Invoke, 0)];
        assert!(validate(&history).is_ok());
    }
}

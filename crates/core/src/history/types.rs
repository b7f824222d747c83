use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter, Result};

/// A point on the store's timeline, in unit-agnostic ticks.
///
/// Histories carry two timelines: the *commit* timestamps the store assigns
/// and the *real* (wall-clock) timestamps the recorder observes. Both use
/// this type; they are only ever compared within the same timeline.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

impl From<i64> for Timestamp {
    fn from(ticks: i64) -> Self {
        Self(ticks)
    }
}

/// The phase of an operation a log entry marks: its start or one of the
/// three possible outcomes.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The operation started.
    Invoke,
    /// The operation completed successfully.
    Ok,
    /// The operation definitely failed.
    Fail,
    /// The outcome is indeterminate (crash, timeout).
    Info,
}

#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionVerb {
    Read,
    Write,
}

/// A single key-level effect within an event.
///
/// `value` is `None` for a read whose result is not yet known at invoke
/// time; completions carry the observed value.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Action {
    pub verb: ActionVerb,
    pub key: String,
    pub value: Option<i64>,
}

impl Action {
    /// A read whose result is not yet known.
    #[must_use]
    pub const fn read(key: String) -> Self {
        Self {
            verb: ActionVerb::Read,
            key,
            value: None,
        }
    }

    /// A read that observed `value`.
    #[must_use]
    pub const fn read_value(key: String, value: i64) -> Self {
        Self {
            verb: ActionVerb::Read,
            key,
            value: Some(value),
        }
    }

    #[must_use]
    pub const fn write(key: String, value: i64) -> Self {
        Self {
            verb: ActionVerb::Write,
            key,
            value: Some(value),
        }
    }
}

impl Debug for Action {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self.verb {
            ActionVerb::Read => {
                write!(f, "{}=>", self.key)?;
                match self.value {
                    Some(value) => write!(f, "{value}"),
                    None => write!(f, "?"),
                }
            }
            ActionVerb::Write => match self.value {
                Some(value) => write!(f, "{}<={value}", self.key),
                None => write!(f, "{}<=?", self.key),
            },
        }
    }
}

/// The hypothesized or reconstructed contents of the store: key to value.
pub type State = BTreeMap<String, i64>;

/// One log entry: the invoke or completion of an operation, with the
/// read/write actions it carries. Action order is significant.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Event {
    pub kind: EventKind,
    /// Name of the logical load that issued the operation (e.g. `txn`).
    pub operation_name: String,
    pub actions: Vec<Action>,
    /// Issuing client. A process has at most one outstanding operation.
    pub process_id: u64,
    /// Transaction timestamp assigned by the store.
    pub commit_timestamp: Timestamp,
    /// Wall-clock observation time, when the recorder captured one.
    pub real_timestamp: Option<Timestamp>,
}

impl Event {
    /// True when every action is a read.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.actions
            .iter()
            .all(|action| action.verb == ActionVerb::Read)
    }

    /// The values this event observed: key to value over its reads with a
    /// known result. Later reads of the same key win.
    #[must_use]
    pub fn read_observation(&self) -> State {
        self.actions
            .iter()
            .filter(|action| action.verb == ActionVerb::Read)
            .filter_map(|action| action.value.map(|value| (action.key.clone(), value)))
            .collect()
    }

    /// The delta this event applies: key to value over its writes. Later
    /// writes of the same key win, matching replay order.
    #[must_use]
    pub fn write_delta(&self) -> State {
        self.actions
            .iter()
            .filter(|action| action.verb == ActionVerb::Write)
            .filter_map(|action| action.value.map(|value| (action.key.clone(), value)))
            .collect()
    }

    /// Every key this event touches, reads and writes alike.
    #[must_use]
    pub fn touched_keys(&self) -> BTreeSet<String> {
        self.actions
            .iter()
            .map(|action| action.key.clone())
            .collect()
    }
}

impl Debug for Event {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(
            f,
            "p{} {:?} {} {:?} @{}",
            self.process_id, self.kind, self.operation_name, self.actions, self.commit_timestamp.0
        )?;
        if let Some(real) = self.real_timestamp {
            write!(f, "~{}", real.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    fn event(kind: EventKind, actions: Vec<Action>) -> Event {
        Event {
            kind,
            operation_name: "txn".to_string(),
            actions,
            process_id: 0,
            commit_timestamp: Timestamp(2),
            real_timestamp: Some(Timestamp(3)),
        }
    }

    #[test]
    fn read_only_detection() {
        let read = event(
            EventKind::Invoke,
            vec![Action::read("x".to_string()), Action::read("y".to_string())],
        );
        assert!(read.is_read_only());

        let mixed = event(
            EventKind::Invoke,
            vec![
                Action::read("x".to_string()),
                Action::write("y".to_string(), 2),
            ],
        );
        assert!(!mixed.is_read_only());
    }

    #[test]
    fn observation_skips_pending_reads() {
        let e = event(
            EventKind::Ok,
            vec![
                Action::read("x".to_string()),
                Action::read_value("y".to_string(), 7),
            ],
        );
        let observation = e.read_observation();
        assert_eq!(observation.get("y"), Some(&7));
        assert!(!observation.contains_key("x"));
    }

    #[test]
    fn delta_keeps_last_write() {
        let e = event(
            EventKind::Ok,
            vec![
                Action::write("x".to_string(), 1),
                Action::write("x".to_string(), 4),
            ],
        );
        assert_eq!(e.write_delta().get("x"), Some(&4));
    }

    #[test]
    fn action_debug() {
        assert_eq!(format!("{:?}", Action::read("x".to_string())), "x=>?");
        assert_eq!(format!("{:?}", Action::read_value("x".to_string(), 3)), "x=>3");
        assert_eq!(format!("{:?}", Action::write("y".to_string(), 2)), "y<=2");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn event_round_trips_through_serde() {
        let original = event(
            EventKind::Invoke,
            vec![
                Action::read("x".to_string()),
                Action::write("y".to_string(), 2),
            ],
        );
        let json = serde_json::to_string(&original).expect("serialize");
        let back: Event = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, original);
    }
}

use alloc::string::String;
use alloc::vec::Vec;

use derive_more::From;

use crate::history::error::Error as HistoryError;
use crate::history::{Event, State, Timestamp};

/// Error returned when a history fails verification.
///
/// Every variant is a normal negative result, not an exceptional condition:
/// the checkers are deterministic decision procedures and a violation is one
/// of their two answers. The variants carry the offending events so the
/// operator can locate the violation in the raw log.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum Error {
    /// The event sequence violates the nesting invariant.
    Malformed(HistoryError),
    /// A key was referenced but is absent from both the initial state and
    /// every write in the history.
    #[from(skip)]
    UnknownKey { key: String, event: Event },
    /// A `Fail` or `Info` completion was found. The workloads under test
    /// are assumed crash-free, so any such entry invalidates the history.
    #[from(skip)]
    Aborted { index: usize, event: Event },
    /// No linearization explains the history past this record. `index` is
    /// the deepest position any search path consumed.
    #[from(skip)]
    Unexplainable {
        index: usize,
        event: Event,
        states_explored: usize,
    },
    /// The search hit its state budget before reaching a verdict.
    #[from(skip)]
    StateLimitExceeded { explored: usize },
    /// A read-only event lacks the real timestamp the external-consistency
    /// ordering needs.
    #[from(skip)]
    MissingRealTimestamp { event: Event },
    /// An abnormal read's snapshot cannot share a single advancing timeline
    /// with the concurrent normal reads around it.
    #[from(skip)]
    Irreconcilable {
        read: Event,
        unexplained: Vec<Event>,
        changes: Vec<(Timestamp, State)>,
    },
    /// Every constituent failure from a composite run.
    Composite(Vec<Error>),
}

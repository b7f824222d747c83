//! External consistency checking for stale reads.
//!
//! A bounded-staleness read may legitimately observe an old snapshot: the
//! store assigns it a commit timestamp *earlier* than the moment the client
//! issued it. We call such a read *abnormal* (commit timestamp < real start
//! time). Abnormality alone is not a violation -- the violation is an
//! abnormal read whose snapshot cannot be placed on the same advancing
//! timeline as the reads that completed around it in real time.
//!
//! Consider initial state `{x: 0, y: 0}`, `*` marking commit times:
//!
//! ```text
//! write x=1   |--*------------------------|
//!             2  5                        20
//! write y=2        |-*--|
//!                  6 8  10
//! read  y=2             |---*---|
//!                       11  13  15
//! read  x=0   *                    |---|
//!             1                    16  19
//! ```
//!
//! The read of `y` observes the second write, so by real time the write to
//! `y` is fully complete before the read of `x` begins -- every observer must
//! order `x=1` (committed at 5, before `y`'s 8) before it. Yet the late read
//! of `x` is served at commit time 1 and observes `x = 0`: no single
//! timeline passes through both observations, so real-time causality is
//! violated.
//!
//! The checker scans events in hybrid time order (real time for read-only
//! events, commit time otherwise), maintaining the completed normal reads,
//! the commit-time-ordered write deltas, and the abnormal invokes awaiting
//! their completion. When an abnormal read completes, its observation is
//! replayed against every state the store passed through between its commit
//! time and the concurrent normal reads' commit times; if some point along
//! that delta sequence explains each normal read merged with the abnormal
//! observation, one timeline exists and the read is consistent.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::ops::Bound;

use hashbrown::HashMap;

use crate::history::{self, Event, EventKind, State, Timestamp};
use crate::verifier::error::Error;
use crate::verifier::witness::Witness;
use crate::verifier::{reject_aborted, Check};

/// Commit-time-ordered write deltas, one entry per completed
/// write-containing event. Reconstructs the store at any past timestamp.
type ChangeRecord = BTreeMap<Timestamp, State>;

/// Pairs an abnormal invoke with its later completion: the invoke knows the
/// real start time, the completion knows the observed values, and neither
/// alone is enough.
type CorrelationKey = (u64, BTreeSet<String>);

/// External consistency checker for histories with stale reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalConsistencyChecker;

impl ExternalConsistencyChecker {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Check for ExternalConsistencyChecker {
    fn name(&self) -> &'static str {
        "external-consistency"
    }

    /// Validate every abnormal read in `history` against real-time order.
    ///
    /// # Errors
    ///
    /// [`Error::Malformed`] for nesting violations, [`Error::Aborted`] on any
    /// `Fail`/`Info` record, [`Error::MissingRealTimestamp`] for a read-only
    /// event without a wall-clock observation, [`Error::UnknownKey`] when
    /// state reconstruction hits a key with no origin, and
    /// [`Error::Irreconcilable`] when an abnormal read admits no timeline.
    fn check(&self, history: &[Event], initial_state: &State) -> Result<Witness, Error> {
        history::validate(history)?;
        reject_aborted(history)?;

        let mut ordered: Vec<Event> = history.to_vec();
        for event in &ordered {
            if event.is_read_only() && event.real_timestamp.is_none() {
                return Err(Error::MissingRealTimestamp {
                    event: event.clone(),
                });
            }
        }
        ordered.sort_by_key(schedule_timestamp);

        tracing::debug!(records = ordered.len(), "scanning for abnormal reads");

        let mut finished_reads: BTreeMap<Timestamp, Event> = BTreeMap::new();
        let mut change_history = ChangeRecord::new();
        let mut hanging: HashMap<CorrelationKey, Event> = HashMap::default();
        let mut abnormal_reads = 0usize;

        for event in &ordered {
            if event.is_read_only() {
                let id = (event.process_id, event.touched_keys());
                match event.kind {
                    EventKind::Ok => {
                        if let Some(invoke) = hanging.remove(&id) {
                            let start = invoke.real_timestamp
                                .expect("read-only events were checked for real timestamps");
                            abnormal_reads += 1;
                            validate_abnormal_read(
                                event,
                                start,
                                &finished_reads,
                                &change_history,
                                initial_state,
                            )?;
                        } else {
                            finished_reads.insert(event.commit_timestamp, event.clone());
                        }
                    }
                    EventKind::Invoke => {
                        let real = event.real_timestamp
                            .expect("read-only events were checked for real timestamps");
                        if event.commit_timestamp < real {
                            // Abnormal: its verdict waits for the completion
                            // that carries the observed values.
                            hanging.insert(id, event.clone());
                        }
                    }
                    EventKind::Fail | EventKind::Info => unreachable!("rejected up front"),
                }
            } else if event.kind == EventKind::Ok {
                change_history.insert(event.commit_timestamp, event.write_delta());
            }
        }

        tracing::debug!(
            abnormal_reads,
            changes = change_history.len(),
            "all abnormal reads reconciled"
        );

        Ok(Witness::TimeConsistent {
            abnormal_reads,
            changes_tracked: change_history.len(),
        })
    }
}

/// The ordering key of the incremental scan: read-only events sort by when
/// they really happened, everything else by when it committed.
fn schedule_timestamp(event: &Event) -> Timestamp {
    if event.is_read_only() {
        event.real_timestamp.unwrap_or(event.commit_timestamp)
    } else {
        event.commit_timestamp
    }
}

/// Decide whether the abnormal read `read` (commit time `Tc`, real start
/// `start`) can share one timeline with the normal reads that completed
/// concurrently with it.
///
/// Candidates are the finished normal reads with commit timestamp in
/// `[Tc, start)` that really finished no later than `start`. Starting from
/// the store as of `Tc`, each write delta up to the candidates' largest
/// commit timestamp is applied in turn; a candidate is explained once its
/// observation, overwritten with the abnormal read's own observation on
/// overlapping keys, matches the state at some point. Every candidate must
/// be explained, else no single timeline produced all the observations.
fn validate_abnormal_read(
    read: &Event,
    start: Timestamp,
    finished_reads: &BTreeMap<Timestamp, Event>,
    change_history: &ChangeRecord,
    initial_state: &State,
) -> Result<(), Error> {
    let commit = read.commit_timestamp;

    let candidates: Vec<&Event> = finished_reads
        .range(commit..start)
        .map(|(_, event)| event)
        .filter(|event| {
            event
                .real_timestamp
                .is_some_and(|real| real <= start)
        })
        .collect();

    let Some(last_commit) = candidates.iter().map(|e| e.commit_timestamp).max() else {
        // Nothing completed inside the read's staleness window; the old
        // snapshot is unobservable and trivially consistent.
        return Ok(());
    };

    let mut keys: BTreeSet<String> = read.touched_keys();
    for candidate in &candidates {
        keys.extend(candidate.touched_keys());
    }

    let mut timeline_state = reconstruct_state(&keys, commit, change_history, initial_state)
        .map_err(|key| Error::UnknownKey {
            key,
            event: read.clone(),
        })?;

    let abnormal_observation = read.read_observation();
    let explained = |candidate: &Event, at: &State| {
        let mut merged = candidate.read_observation();
        merged.extend(abnormal_observation.iter().map(|(k, v)| (k.clone(), *v)));
        merged.iter().all(|(key, value)| at.get(key) == Some(value))
    };

    let window: Vec<(Timestamp, State)> = change_history
        .range((Bound::Excluded(commit), Bound::Included(last_commit)))
        .map(|(ts, delta)| (*ts, delta.clone()))
        .collect();

    let mut pending = candidates;
    pending.retain(|candidate| !explained(candidate, &timeline_state));

    for (_, delta) in &window {
        if pending.is_empty() {
            break;
        }
        for (key, value) in delta {
            // Only the keys some observation cares about are tracked.
            if timeline_state.contains_key(key) {
                timeline_state.insert(key.clone(), *value);
            }
        }
        pending.retain(|candidate| !explained(candidate, &timeline_state));
    }

    if pending.is_empty() {
        Ok(())
    } else {
        Err(Error::Irreconcilable {
            read: read.clone(),
            unexplained: pending.into_iter().cloned().collect(),
            changes: window,
        })
    }
}

/// Rebuild the store restricted to `keys` as of `at` (inclusive), walking
/// the change history backwards and falling through to the initial state.
/// A key found in neither is unresolvable -- the fatal lookup error.
fn reconstruct_state(
    keys: &BTreeSet<String>,
    at: Timestamp,
    change_history: &ChangeRecord,
    initial_state: &State,
) -> Result<State, String> {
    let mut state = State::new();
    let mut missing: BTreeSet<&String> = keys.iter().collect();

    for (_, delta) in change_history.range(..=at).rev() {
        if missing.is_empty() {
            break;
        }
        missing.retain(|key| match delta.get(*key) {
            Some(value) => {
                state.insert((*key).clone(), *value);
                false
            }
            None => true,
        });
    }

    for key in missing {
        let value = initial_state.get(key).ok_or_else(|| key.clone())?;
        state.insert(key.clone(), *value);
    }

    Ok(state)
}

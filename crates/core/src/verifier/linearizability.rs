//! Wing–Gong linearizability search.
//!
//! Decides whether a history of invoke/complete events over a read/write
//! register store is linearizable: whether some total order of operations,
//! consistent with real-time and per-process order, explains every observed
//! read. Implements the optimized form of the Wing–Gong algorithm described
//! by Lowe ("Testing for linearizability"), the same shape Knossos uses.
//!
//! # How it works
//!
//! A [`SearchState`] is one node of a depth-first search over hypothesized
//! executions: the store contents so far, the operations invoked but not yet
//! linearized (`calls`), the operations linearized but whose completion has
//! not yet been consumed (`rets`), and a cursor into the history.
//!
//! Expanding a state looks at the record under the cursor:
//!
//! - an `Invoke` joins `calls` and the cursor advances;
//! - a completion whose process is already in `rets` retires it;
//! - any other completion triggers [`linearize`]: every permutation of the
//!   outstanding processes (plus the completer) is replayed against a
//!   scratch copy of the store, keeping only permutations under which each
//!   completed read observed the value the store held. Each surviving
//!   permutation yields one successor with the whole batch moved to `rets`
//!   and the completer retired.
//!
//! Batching every outstanding operation once any of them completes is the
//! established bound on the search: the relative order of concurrent pending
//! operations only becomes observable when one of them returns.
//!
//! # Memoization
//!
//! Successors are deduplicated against a run-scoped visited set before being
//! pushed. State identity covers the store contents, both pending sets, and
//! the cursor; leaving the cursor out would conflate states reached through
//! different history prefixes and corrupt the deepest-index signal the
//! verdict rests on.
//!
//! The history is linearizable iff some explored path consumes every record.
//! On failure the record at the deepest cursor any path reached is reported
//! as the first unexplainable point.
//!
//! [`linearize`]: SearchState::linearize

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::history::{self, Event, EventKind, State};
use crate::verifier::error::Error;
use crate::verifier::witness::Witness;
use crate::verifier::{reject_aborted, Check};

/// One node in the linearizability search.
///
/// `calls` and `rets` map a process to the history index of its invoke
/// record; the two never share a process. States are immutable once built --
/// every transition copies, so no two nodes alias mutable storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SearchState {
    database: State,
    calls: BTreeMap<u64, usize>,
    rets: BTreeMap<u64, usize>,
    record_index: usize,
}

impl SearchState {
    fn root(initial_state: &State) -> Self {
        Self {
            database: initial_state.clone(),
            calls: BTreeMap::new(),
            rets: BTreeMap::new(),
            record_index: 0,
        }
    }

    /// Successors of this state, given the record under the cursor.
    fn transition(&self, history: &[Event]) -> Vec<Self> {
        let Some(event) = history.get(self.record_index) else {
            // End of history: this path is complete.
            return Vec::new();
        };
        match event.kind {
            EventKind::Invoke => vec![self.call(event)],
            _ if self.rets.contains_key(&event.process_id) => vec![self.retire(event)],
            _ => self.linearize(event, history),
        }
    }

    /// Record an invoke: the operation is now outstanding.
    fn call(&self, event: &Event) -> Self {
        let mut next = self.clone();
        next.calls.insert(event.process_id, self.record_index);
        next.record_index += 1;
        next
    }

    /// Consume the completion of an operation linearized in an earlier batch.
    fn retire(&self, event: &Event) -> Self {
        let mut next = self.clone();
        next.rets.remove(&event.process_id);
        next.record_index += 1;
        next
    }

    /// First sighting of a completion: try to linearize the whole batch of
    /// outstanding operations, in every order. One successor per order that
    /// contradicts no completed read.
    fn linearize(&self, completion: &Event, history: &[Event]) -> Vec<Self> {
        let mut processes: Vec<u64> = self.calls.keys().copied().collect();
        if !processes.contains(&completion.process_id) {
            processes.push(completion.process_id);
        }

        let mut successors = Vec::new();
        self.permute(
            &mut processes,
            0,
            &State::new(),
            completion,
            history,
            &mut successors,
        );
        successors
    }

    /// Replay every permutation of `processes[at..]` on top of `delta`,
    /// collecting a successor for each complete, contradiction-free order.
    ///
    /// `delta` holds only the keys changed so far along this permutation, so
    /// untouched keys cost nothing until the batch commits.
    fn permute(
        &self,
        processes: &mut [u64],
        at: usize,
        delta: &State,
        completion: &Event,
        history: &[Event],
        successors: &mut Vec<Self>,
    ) {
        if at >= processes.len() {
            successors.push(self.commit_batch(delta, completion));
            return;
        }

        for swap in at..processes.len() {
            processes.swap(swap, at);
            let process = processes[at];

            let event = if process == completion.process_id {
                completion
            } else {
                &history[self.calls[&process]]
            };

            // Only a completed operation has observed reads to hold the
            // hypothesis to; a still-pending invoke contributes its writes
            // and nothing else.
            let consistent = event.kind != EventKind::Ok
                || event.read_observation().iter().all(|(key, value)| {
                    delta.get(key).or_else(|| self.database.get(key)) == Some(value)
                });

            if consistent {
                let mut next_delta = delta.clone();
                next_delta.extend(event.write_delta());
                self.permute(processes, at + 1, &next_delta, completion, history, successors);
            }

            processes.swap(swap, at);
        }
    }

    /// Build the successor for one valid permutation: fold the batch delta
    /// into the store, retire the completer, and park everything else in
    /// `rets` to await its own completion record.
    fn commit_batch(&self, delta: &State, completion: &Event) -> Self {
        let mut next = self.clone();
        next.database.extend(delta.iter().map(|(k, v)| (k.clone(), *v)));
        next.calls.remove(&completion.process_id);
        next.rets.extend(core::mem::take(&mut next.calls));
        next.record_index += 1;
        next
    }
}

/// Run-scoped search bookkeeping. Constructed fresh for every verification
/// call and dropped at its end; nothing leaks across runs.
struct SearchContext {
    visited: HashSet<SearchState>,
    max_index_seen: usize,
    explored: usize,
}

impl SearchContext {
    fn new() -> Self {
        Self {
            visited: HashSet::default(),
            max_index_seen: 0,
            explored: 0,
        }
    }

    /// Admit a state if it has not been seen on any path, tracking the
    /// deepest cursor reached across the whole run.
    fn admit(&mut self, state: &SearchState) -> bool {
        if state.record_index > self.max_index_seen {
            self.max_index_seen = state.record_index;
        }
        let fresh = self.visited.insert(state.clone());
        if fresh {
            self.explored += 1;
        }
        fresh
    }
}

/// Linearizability checker over read/write register histories.
///
/// `max_states` bounds the number of distinct search states admitted before
/// the run aborts with [`Error::StateLimitExceeded`]; the exponential search
/// is otherwise limited only by memoization. An aborted run never claims the
/// history valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearizabilityChecker {
    pub max_states: Option<usize>,
}

impl LinearizabilityChecker {
    #[must_use]
    pub const fn new() -> Self {
        Self { max_states: None }
    }

    #[must_use]
    pub const fn with_max_states(max_states: usize) -> Self {
        Self {
            max_states: Some(max_states),
        }
    }
}

impl Check for LinearizabilityChecker {
    fn name(&self) -> &'static str {
        "linearizability"
    }

    /// Decide whether `history` is linearizable from `initial_state`.
    ///
    /// # Errors
    ///
    /// [`Error::Malformed`] for nesting violations, [`Error::Aborted`] on any
    /// `Fail`/`Info` record, [`Error::UnknownKey`] for a key with no origin,
    /// [`Error::Unexplainable`] when the search exhausts without consuming
    /// the full history, [`Error::StateLimitExceeded`] on budget abort.
    fn check(&self, history: &[Event], initial_state: &State) -> Result<Witness, Error> {
        history::validate(history)?;
        reject_aborted(history)?;
        resolve_keys(history, initial_state)?;

        let mut ordered: Vec<Event> = history.to_vec();
        ordered.sort_by_key(|event| event.commit_timestamp);

        tracing::debug!(records = ordered.len(), "searching for a linearization");

        let mut context = SearchContext::new();
        let root = SearchState::root(initial_state);
        context.admit(&root);

        let mut stack = vec![root];
        while let Some(state) = stack.pop() {
            if let Some(budget) = self.max_states {
                if context.explored > budget {
                    tracing::debug!(explored = context.explored, "state budget exhausted");
                    return Err(Error::StateLimitExceeded {
                        explored: context.explored,
                    });
                }
            }
            tracing::trace!(?state, "expanding");
            for successor in state.transition(&ordered) {
                if context.admit(&successor) {
                    stack.push(successor);
                }
            }
        }

        tracing::debug!(
            states = context.explored,
            deepest = context.max_index_seen,
            "search exhausted"
        );

        if context.max_index_seen >= ordered.len() {
            Ok(Witness::Linearized {
                records: ordered.len(),
                states_explored: context.explored,
            })
        } else {
            Err(Error::Unexplainable {
                index: context.max_index_seen,
                event: ordered[context.max_index_seen].clone(),
                states_explored: context.explored,
            })
        }
    }
}

/// Every key any action touches must originate somewhere: the initial state
/// or some write in the history. A key with no origin can never be
/// reconstructed and is a fatal input error, not a value mismatch.
fn resolve_keys(history: &[Event], initial_state: &State) -> Result<(), Error> {
    let mut written: HashSet<&str> = HashSet::default();
    for event in history {
        for action in &event.actions {
            if action.verb == history::ActionVerb::Write {
                written.insert(action.key.as_str());
            }
        }
    }
    for event in history {
        for action in &event.actions {
            if !initial_state.contains_key(&action.key) && !written.contains(action.key.as_str()) {
                return Err(Error::UnknownKey {
                    key: action.key.clone(),
                    event: event.clone(),
                });
            }
        }
    }
    Ok(())
}

//! The verifier façade: a common contract over the checking engines and a
//! composite that runs several of them as one.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::history::{Event, EventKind, State};

pub mod error;
pub mod external_consistency;
pub mod linearizability;
pub mod witness;

pub use error::Error;
pub use external_consistency::ExternalConsistencyChecker;
pub use linearizability::LinearizabilityChecker;
pub use witness::Witness;

/// A consistency check over a materialized history.
///
/// Implementations are deterministic batch decision procedures: same
/// history, same initial state, same verdict. All run-scoped bookkeeping is
/// owned by the call, so a checker value can be reused across runs.
pub trait Check {
    /// Short machine-friendly name, used in logs and reports.
    fn name(&self) -> &'static str;

    /// Decide whether `history` is admissible from `initial_state`.
    ///
    /// # Errors
    ///
    /// An [`Error`] describing the violation; every variant is a normal
    /// negative verdict carrying its diagnostics.
    fn check(&self, history: &[Event], initial_state: &State) -> Result<Witness, Error>;
}

/// Runs its constituent checks in order and combines verdicts with logical
/// AND. Never short-circuits: a failing run still executes the remaining
/// constituents, because diagnostics from all of them are useful together.
pub struct CompositeCheck {
    checks: Vec<Box<dyn Check>>,
}

impl CompositeCheck {
    #[must_use]
    pub fn new(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    /// The full battery: linearizability plus external consistency.
    #[must_use]
    pub fn full() -> Self {
        Self::new(vec![
            Box::new(LinearizabilityChecker::new()),
            Box::new(ExternalConsistencyChecker::new()),
        ])
    }
}

impl Check for CompositeCheck {
    fn name(&self) -> &'static str {
        "composite"
    }

    /// Run every constituent and AND the verdicts.
    ///
    /// # Errors
    ///
    /// [`Error::Composite`] with one entry per failing constituent, in run
    /// order, when any constituent rejects the history.
    fn check(&self, history: &[Event], initial_state: &State) -> Result<Witness, Error> {
        let mut witnesses = Vec::new();
        let mut failures = Vec::new();

        for check in &self.checks {
            tracing::debug!(check = check.name(), "running constituent");
            match check.check(history, initial_state) {
                Ok(witness) => witnesses.push(witness),
                Err(error) => failures.push(error),
            }
        }

        if failures.is_empty() {
            Ok(Witness::Composite(witnesses))
        } else {
            Err(Error::Composite(failures))
        }
    }
}

/// Any `Fail` or `Info` record invalidates the whole history up front: the
/// workloads under test are assumed crash-free under every model.
pub(crate) fn reject_aborted(history: &[Event]) -> Result<(), Error> {
    for (index, event) in history.iter().enumerate() {
        if matches!(event.kind, EventKind::Fail | EventKind::Info) {
            return Err(Error::Aborted {
                index,
                event: event.clone(),
            });
        }
    }
    Ok(())
}

use alloc::vec::Vec;

/// Evidence that a history passed a check, with enough detail to read the
/// run's shape from the verdict.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Witness {
    /// Some search path consumed every record in the history.
    Linearized {
        records: usize,
        states_explored: usize,
    },
    /// Every abnormal read was reconciled with the reads around it.
    TimeConsistent {
        abnormal_reads: usize,
        changes_tracked: usize,
    },
    /// One witness per constituent of a composite run, in order.
    Composite(Vec<Witness>),
}

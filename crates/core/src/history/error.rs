use crate::history::types::Event;

/// Structural defect in an event sequence, detected before any checking.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A process invoked a second operation while one was outstanding.
    OverlappingInvoke { index: usize, event: Event },
    /// A completion with no matching outstanding invoke on its process.
    DanglingCompletion { index: usize, event: Event },
}

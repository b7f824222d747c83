//! Consistency checking for transactional key-value histories.
//!
//! `histcop_core` is an offline checker in the Jepsen/Knossos style: given a
//! captured log of invoke/complete events against a transactional store and
//! the store's initial state, it decides whether the history could have
//! arisen from a correct execution under a consistency model. Two models are
//! supported:
//!
//! 1. **Linearizability** -- a general read/write register model, decided by
//!    exhaustive depth-first search with memoization (Wing--Gong, with the
//!    batching optimization Knossos uses).
//! 2. **External consistency** -- real-time ordering for stale/bounded-stale
//!    reads racing concurrent writes, decided by an incremental scan over
//!    two time-ordered indices.
//!
//! The analysis is static: the whole history is materialized before checking
//! starts, the checkers run single-threaded and deterministically, and the
//! verdict is boolean plus diagnostics. Capturing histories, driving load,
//! and parsing raw log text are other components' jobs; this crate consumes
//! a `&[Event]` (see the `histcop_parser` crate) and an initial state.
//!
//! # Entry points
//!
//! Each engine implements the [`Check`] trait. Run one directly, or compose
//! several with [`CompositeCheck`]:
//!
//! ```rust,ignore
//! use histcop_core::{Check, CompositeCheck};
//!
//! let verdict = CompositeCheck::full().check(&history, &initial_state);
//! match verdict {
//!     Ok(witness) => println!("valid: {witness:?}"),
//!     Err(err) => println!("violation: {err:?}"),
//! }
//! ```
//!
//! # Crate features
//!
//! - **`serde`** -- enables `Serialize`/`Deserialize` derives on the history
//!   and verdict types (`Event`, `Action`, `Witness`, `Error`).
//!
//! This crate is `no_std` compatible (requires `alloc`).

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod history;
pub mod verifier;

pub use verifier::{
    Check, CompositeCheck, Error, ExternalConsistencyChecker, LinearizabilityChecker, Witness,
};

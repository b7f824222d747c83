//! Parser for recorded history logs.
//!
//! Turns the EDN-style record list the recorder emits into the
//! `Vec<Event>` the checkers consume. Raw values pass through the closed
//! [`Literal`] type first; the event builder then does typed extraction, so
//! a malformed entry fails here, before any checking starts, never inside
//! an engine.

pub mod literal;
pub mod parser;

pub use literal::Literal;
pub use parser::{parse_history, ParseError};

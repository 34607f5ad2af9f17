//! Shared foundational types used across the holdfix crates.
//!
//! Currently this is the error raised when a routing-model invariant the
//! repair core relies on does not hold, such as a committed route that is
//! not a tree.

#![warn(missing_docs)]

pub mod result;

pub use result::InternalError;

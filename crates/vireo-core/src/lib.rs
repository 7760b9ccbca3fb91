//! Core data structures shared by the Vireo grammar toolkit.
//!
//! This crate is the leaf of the workspace: source positions and byte
//! ranges, the file registry that hands out stable [`FileId`]s, and the
//! [`Charset`] bitmap consulted by the matching machine.

pub mod charset;
pub mod span;

pub use charset::{Charset, Expected};
pub use span::{FileId, FileRegistry, LineIndex, Location, Range, SourceLocation, Span};

//! The Vireo parsing machine.
//!
//! Executes an encoded [`vireo_bytecode::Module`] against a byte input
//! with backtracking, predicate lookahead, labelled throws with
//! recovery, furthest-failure-position error reporting, and streaming
//! capture into a borrowed parse tree.

pub mod error;
pub mod input;
pub mod machine;
pub mod trace;
pub mod tree;


pub use error::ParseError;
pub use input::Input;
pub use machine::{Machine, MachineConfig, Match};
pub use trace::{CollectingTracer, NoopTracer, Tracer};
pub use tree::{OwnedNode, ParseTree, TreeArena, TreeNode};

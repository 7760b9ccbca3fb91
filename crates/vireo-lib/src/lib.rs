//! Vireo: a PEG parser toolkit with labelled failures, lexification
//! and cross-file imports.
//!
//! # Example
//!
//! ```
//! use vireo_lib::{Config, Matcher};
//!
//! let mut matcher = Matcher::from_source(
//!     "Ordinal <- [0-9]+ #('st' / 'nd' / 'rd' / 'th')",
//!     Config::default(),
//! )
//! .expect("valid grammar");
//!
//! let result = matcher.parse(b"42nd").expect("matches");
//! assert_eq!(result.consumed, 4);
//! ```

pub mod config;
pub mod matcher;


pub use config::{Config, VmConfig};
pub use matcher::{Error, Matcher};

pub use vireo_compiler::{CompilerConfig, GrammarConfig, InlineConfig};
pub use vireo_core::{Charset, Expected, Location, Range, SourceLocation, Span};
pub use vireo_vm::{Match, OwnedNode, ParseError, ParseTree};

//! Source positions, spans, and the file registry.
//!
//! A [`Location`] is a human-facing position (1-based line and column,
//! columns counted in codepoints) paired with a 0-based byte cursor.
//! A [`Range`] is a plain byte interval into the matched input.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A position in a source text.
///
/// `line` and `column` are 1-based; `column` counts codepoints, not bytes.
/// `cursor` is the 0-based byte offset.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
    pub cursor: usize,
}

impl Location {
    /// The start of a text: line 1, column 1, cursor 0.
    pub fn start() -> Self {
        Self {
            line: 1,
            column: 1,
            cursor: 0,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A pair of locations with `start.cursor <= end.cursor`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Span {
    pub start: Location,
    pub end: Location,
}

impl Span {
    /// # Panics
    /// Panics if `start.cursor > end.cursor`.
    pub fn new(start: Location, end: Location) -> Self {
        assert!(
            start.cursor <= end.cursor,
            "inverted span: {} > {}",
            start.cursor,
            end.cursor
        );
        Self { start, end }
    }

    /// Zero-width span at a single location.
    pub fn point(at: Location) -> Self {
        Self { start: at, end: at }
    }

    /// The byte range covered by this span.
    pub fn range(&self) -> Range {
        Range::new(self.start.cursor, self.end.cursor)
    }
}

/// A span plus the file it came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: FileId,
    pub span: Span,
}

impl SourceLocation {
    pub fn new(file: FileId, span: Span) -> Self {
        Self { file, span }
    }

    /// A location for nodes the transforms synthesise out of thin air.
    pub fn synthetic() -> Self {
        Self {
            file: FileId::SYNTHETIC,
            span: Span::point(Location::start()),
        }
    }
}

/// A half-open byte interval `[start, end)` into the input.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "inverted range: {start} > {end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely within this range.
    pub fn contains(&self, other: Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Identifies a registered source file.
///
/// Two values are reserved: [`FileId::SYNTHETIC`] for nodes created by
/// transforms and [`FileId::BUILTIN`] for the embedded built-in grammar.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    /// No file: the node was synthesised by a transform.
    pub const SYNTHETIC: FileId = FileId(u32::MAX);
    /// The embedded built-in grammar (`Spacing`, `EOF`, ...).
    pub const BUILTIN: FileId = FileId(u32::MAX - 1);

    pub fn is_real(self) -> bool {
        self != Self::SYNTHETIC && self != Self::BUILTIN
    }
}

/// Assigns stable small integers to file paths, in registration order.
#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    paths: IndexSet<PathBuf>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path, returning its id. Registering the same path twice
    /// returns the same id.
    pub fn register(&mut self, path: impl Into<PathBuf>) -> FileId {
        let (index, _) = self.paths.insert_full(path.into());
        FileId(index as u32)
    }

    /// Look up an already-registered path.
    pub fn get(&self, path: &Path) -> Option<FileId> {
        self.paths.get_index_of(path).map(|i| FileId(i as u32))
    }

    /// Resolve an id back to its path. Reserved ids resolve to `None`.
    pub fn path(&self, id: FileId) -> Option<&Path> {
        self.paths.get_index(id.0 as usize).map(PathBuf::as_path)
    }

    /// Display name for diagnostics; reserved ids get angle-bracket names.
    pub fn name(&self, id: FileId) -> String {
        match id {
            FileId::SYNTHETIC => "<synthetic>".to_string(),
            FileId::BUILTIN => "<builtins>".to_string(),
            _ => self
                .path(id)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| format!("<file {}>", id.0)),
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate over registered paths in id order.
    pub fn iter(&self) -> impl Iterator<Item = (FileId, &Path)> {
        self.paths
            .iter()
            .enumerate()
            .map(|(i, p)| (FileId(i as u32), p.as_path()))
    }
}

/// Precomputed line starts for O(log n) offset-to-location conversion.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset into a [`Location`].
    ///
    /// Offsets past the end of `source` clamp to the end. Columns count
    /// codepoints since the start of the line.
    pub fn location(&self, source: &str, offset: usize) -> Location {
        let cursor = offset.min(source.len());
        let line = self
            .line_starts
            .partition_point(|&start| start <= cursor)
            .saturating_sub(1);
        let line_start = self.line_starts[line];
        let column = source[line_start..cursor].chars().count() + 1;
        Location {
            line: line as u32 + 1,
            column: column as u32,
            cursor,
        }
    }

    /// Convert a byte interval into a [`Span`].
    pub fn span(&self, source: &str, start: usize, end: usize) -> Span {
        Span::new(
            self.location(source, start),
            self.location(source, end),
        )
    }
}

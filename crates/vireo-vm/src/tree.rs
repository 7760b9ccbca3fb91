//! Parse trees.
//!
//! The machine streams captures into a [`TreeArena`] it owns and
//! reuses across matches. A successful match hands back a
//! [`ParseTree`]: a view that borrows the arena, the module string
//! table and the input, and is invalidated by the next match.
//! [`ParseTree::to_owned`] deep-copies into a self-contained
//! [`OwnedNode`].

use serde::Serialize;

use vireo_core::Range;

/// One arena node. `name` and `label` index the module string table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeNode {
    /// Leaf: a slice of the input.
    Str { range: Range },
    /// Ordered children spanning `range`.
    Seq { children: Vec<usize>, range: Range },
    /// Named node (rule or user capture) with exactly one child.
    Node { name: u16, child: usize, range: Range },
    /// A recovered labelled failure embedded in the tree.
    Error {
        label: u16,
        message: Option<String>,
        child: Option<usize>,
        range: Range,
    },
}

impl TreeNode {
    pub fn range(&self) -> Range {
        match self {
            TreeNode::Str { range }
            | TreeNode::Seq { range, .. }
            | TreeNode::Node { range, .. }
            | TreeNode::Error { range, .. } => *range,
        }
    }
}

/// Node storage owned by the machine; cleared before every match.
#[derive(Debug, Default)]
pub struct TreeArena {
    nodes: Vec<TreeNode>,
}

impl TreeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn push(&mut self, node: TreeNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    #[inline]
    pub fn get(&self, id: usize) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Borrowed view over a match result.
///
/// Shares the input buffer and the module string table; valid until the
/// machine that produced it starts its next match.
#[derive(Clone, Copy, Debug)]
pub struct ParseTree<'a> {
    pub(crate) arena: &'a TreeArena,
    pub(crate) strs: &'a [String],
    pub(crate) input: &'a [u8],
    pub(crate) root: Option<usize>,
}

impl<'a> ParseTree<'a> {
    pub fn new(
        arena: &'a TreeArena,
        strs: &'a [String],
        input: &'a [u8],
        root: Option<usize>,
    ) -> Self {
        Self { arena, strs, input, root }
    }

    /// Root node id, if the match captured anything.
    pub fn root(&self) -> Option<usize> {
        self.root
    }

    pub fn node(&self, id: usize) -> &'a TreeNode {
        self.arena.get(id)
    }

    /// Resolve a string-table id (rule name or error label).
    pub fn name(&self, id: u16) -> &'a str {
        &self.strs[id as usize]
    }

    /// Input text covered by a range, lossily decoded.
    pub fn text(&self, range: Range) -> std::borrow::Cow<'a, str> {
        String::from_utf8_lossy(&self.input[range.start..range.end])
    }

    /// Deep-copy into a tree that no longer references the machine or
    /// the input buffer.
    pub fn to_owned(&self) -> Option<OwnedNode> {
        self.root.map(|id| self.copy_node(id))
    }

    fn copy_node(&self, id: usize) -> OwnedNode {
        match self.node(id) {
            TreeNode::Str { range } => OwnedNode::Str {
                text: self.text(*range).into_owned(),
                range: *range,
            },
            TreeNode::Seq { children, range } => OwnedNode::Seq {
                children: children.iter().map(|&c| self.copy_node(c)).collect(),
                range: *range,
            },
            TreeNode::Node { name, child, range } => OwnedNode::Node {
                name: self.name(*name).to_string(),
                child: Box::new(self.copy_node(*child)),
                range: *range,
            },
            TreeNode::Error {
                label,
                message,
                child,
                range,
            } => OwnedNode::Error {
                label: self.name(*label).to_string(),
                message: message.clone(),
                child: child.map(|c| Box::new(self.copy_node(c))),
                range: *range,
            },
        }
    }

    fn write_node(&self, f: &mut std::fmt::Formatter<'_>, id: usize) -> std::fmt::Result {
        match self.node(id) {
            TreeNode::Str { range } => write!(f, "{:?}", self.text(*range)),
            TreeNode::Seq { children, .. } => {
                write!(f, "Seq(")?;
                for (i, &c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    self.write_node(f, c)?;
                }
                write!(f, ")")
            }
            TreeNode::Node { name, child, .. } => {
                write!(f, "{}(", self.name(*name))?;
                self.write_node(f, *child)?;
                write!(f, ")")
            }
            TreeNode::Error { label, child, .. } => {
                write!(f, "Error[{}]", self.name(*label))?;
                if let Some(c) = child {
                    write!(f, "(")?;
                    self.write_node(f, *c)?;
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

impl std::fmt::Display for ParseTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.root {
            Some(id) => self.write_node(f, id),
            None => write!(f, "<empty>"),
        }
    }
}

/// A self-contained deep copy of a parse tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OwnedNode {
    Str {
        text: String,
        range: Range,
    },
    Seq {
        children: Vec<OwnedNode>,
        range: Range,
    },
    Node {
        name: String,
        child: Box<OwnedNode>,
        range: Range,
    },
    Error {
        label: String,
        message: Option<String>,
        child: Option<Box<OwnedNode>>,
        range: Range,
    },
}

impl OwnedNode {
    pub fn range(&self) -> Range {
        match self {
            OwnedNode::Str { range, .. }
            | OwnedNode::Seq { range, .. }
            | OwnedNode::Node { range, .. }
            | OwnedNode::Error { range, .. } => *range,
        }
    }
}

//! Stack trace model
//!
//! A root exception and all of its causes live in one arena. Index 0 is the
//! root; every other node points at its parent by index.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_EXCEPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one discovered root exception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExceptionId(u64);

impl ExceptionId {
    pub fn next() -> Self {
        Self(NEXT_EXCEPTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where a stack frame's code lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameLocation {
    /// `(Main.java:12)`
    Source { file: String, line: usize },
    /// `(Native Method)`
    Native,
    /// `(Unknown Source)` or anything we could not parse
    Unknown,
}

/// A single `at pkg.Class.method(...)` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub class_name: String,
    pub method: String,
    pub location: FrameLocation,
}

impl StackFrame {
    pub fn new(
        class_name: impl Into<String>,
        method: impl Into<String>,
        location: FrameLocation,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method: method.into(),
            location,
        }
    }

    /// Package portion of the class name, empty for the default package
    pub fn package(&self) -> &str {
        self.class_name
            .rsplit_once('.')
            .map_or("", |(package, _)| package)
    }

    /// Source file name and 1-indexed line, if the frame has one
    pub fn source(&self) -> Option<(&str, usize)> {
        match &self.location {
            FrameLocation::Source { file, line } => Some((file.as_str(), *line)),
            FrameLocation::Native | FrameLocation::Unknown => None,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.class_name, self.method)?;
        match &self.location {
            FrameLocation::Source { file, line } => write!(f, "{file}:{line})"),
            FrameLocation::Native => write!(f, "Native Method)"),
            FrameLocation::Unknown => write!(f, "Unknown Source)"),
        }
    }
}

/// One exception in a cause chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceNode {
    pub class_name: String,
    pub message: Option<String>,
    pub frames: Vec<StackFrame>,
    /// Arena index of the exception this one was the cause of
    pub parent: Option<usize>,
}

impl TraceNode {
    pub fn new(class_name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message,
            frames: Vec::new(),
            parent: None,
        }
    }

    /// Class name without its package
    pub fn simple_name(&self) -> &str {
        self.class_name
            .rsplit_once('.')
            .map_or(self.class_name.as_str(), |(_, name)| name)
    }
}

/// A root exception together with every transitive cause
#[derive(Debug, Clone)]
pub struct RootStackTrace {
    id: ExceptionId,
    nodes: Vec<TraceNode>,
}

impl RootStackTrace {
    pub fn new(root: TraceNode) -> Self {
        Self {
            id: ExceptionId::next(),
            nodes: vec![TraceNode { parent: None, ..root }],
        }
    }

    /// Attach `child` as a cause of the node at `parent`; returns the new index
    pub fn push_child(&mut self, parent: usize, child: TraceNode) -> usize {
        debug_assert!(parent < self.nodes.len());
        self.nodes.push(TraceNode {
            parent: Some(parent),
            ..child
        });
        self.nodes.len() - 1
    }

    pub fn id(&self) -> ExceptionId {
        self.id
    }

    pub fn root(&self) -> &TraceNode {
        &self.nodes[0]
    }

    pub fn node(&self, index: usize) -> Option<&TraceNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[TraceNode] {
        &self.nodes
    }

    /// Mutable access to the most recently added node (used while parsing)
    pub(crate) fn last_mut(&mut self) -> &mut TraceNode {
        let last = self.nodes.len() - 1;
        &mut self.nodes[last]
    }

    /// Parent of the node at `child`, `None` for the root or an unknown index
    #[allow(dead_code)] // API completeness
    pub fn find_parent_of(&self, child: usize) -> Option<usize> {
        self.nodes.get(child).and_then(|node| node.parent)
    }

    /// Indices of every transitive child in discovery order, root excluded
    pub fn children(&self) -> impl Iterator<Item = usize> + '_ {
        1..self.nodes.len()
    }

    /// Selection order: every child first, the root last
    pub fn candidates(&self) -> impl Iterator<Item = usize> + '_ {
        self.children().chain(std::iter::once(0))
    }

    /// Structural equality, ignoring identity
    pub fn same_trace(&self, other: &RootStackTrace) -> bool {
        self.nodes == other.nodes
    }
}

/// A reference to one node inside a shared root trace
#[derive(Debug, Clone)]
pub struct TraceRef {
    pub root: Arc<RootStackTrace>,
    pub index: usize,
}

impl TraceRef {
    pub fn new(root: Arc<RootStackTrace>, index: usize) -> Self {
        Self { root, index }
    }

    pub fn node(&self) -> &TraceNode {
        &self.root.nodes()[self.index]
    }

    /// Identity of the underlying exception object
    pub fn identity(&self) -> (ExceptionId, usize) {
        (self.root.id(), self.index)
    }
}

impl PartialEq for TraceRef {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for TraceRef {}

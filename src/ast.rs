//! # AST model
//!
//! This module defines the wrapped syntax tree that the rest of the crate
//! works with: a flat arena of nodes with stable ids, parent back-links, and
//! the traversals required by the tree diff and by template matching.
//!
//! Nodes come in a closed set of kinds covering the supported subset of the
//! target language. Equality has two levels: *identity* (same id within a
//! tree) and *similarity* (same kind, and same value for concrete nodes).

use serde::{Deserialize, Serialize};

/// The syntactic categories of the supported language subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Module,
    FunctionDef,
    Parameter,
    Arg,
    Suite,
    If,
    IfTest,
    While,
    For,
    Return,
    Assign,
    AugAssign,
    ExpressionStatement,
    Call,
    BinaryOp,
    UnaryOp,
    Tuple,
    Parenthesis,
    Conditional,
    Name,
    Constant,
}

impl NodeKind {
    pub fn is_leaf(self) -> bool {
        matches!(self, NodeKind::Name | NodeKind::Constant | NodeKind::Parameter)
    }
}

/// A node's position in its tree's arena. Ids are assigned in construction
/// order and are unique per tree; they are not meaningful across trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub value: Option<String>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub is_abstract: bool,
    pub edit_id: u32,
}

/// Whether two nodes are interchangeable for diffing and matching purposes.
///
/// An abstract node stands for any node of its kind; concrete nodes must
/// agree on kind and value.
pub fn similar(a: &Node, b: &Node) -> bool {
    if a.kind != b.kind {
        return false;
    }
    if a.is_abstract || b.is_abstract {
        return true;
    }
    a.value == b.value
}

/// A parser-side tree, prior to wrapping. The parser produces these; [`Ast::wrap`]
/// turns them into arena trees with ids and parent links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parsed {
    pub kind: NodeKind,
    pub value: Option<String>,
    pub children: Vec<Parsed>,
}

impl Parsed {
    pub fn leaf(kind: NodeKind, value: impl Into<String>) -> Parsed {
        Parsed {
            kind,
            value: Some(value.into()),
            children: vec![],
        }
    }

    pub fn node(kind: NodeKind, children: Vec<Parsed>) -> Parsed {
        Parsed {
            kind,
            value: None,
            children,
        }
    }

    pub fn valued(kind: NodeKind, value: impl Into<String>, children: Vec<Parsed>) -> Parsed {
        Parsed {
            kind,
            value: Some(value.into()),
            children,
        }
    }
}

impl std::fmt::Display for Parsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(v) = &self.value {
            write!(f, ":{}", v)?;
        }
        if !self.children.is_empty() {
            write!(f, "(")?;
            for (i, c) in self.children.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", c)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Signal returned by walk visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Stop,
}

/// An immutable syntax tree. Rewrites go through [`Ast::to_parsed`] and
/// [`Ast::wrap`], producing a fresh tree rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Ast {
    /// Recursively wrap a parser-produced tree, assigning fresh ids and
    /// parent links.
    pub fn wrap(parsed: &Parsed) -> Ast {
        fn build(p: &Parsed, parent: Option<NodeId>, nodes: &mut Vec<Node>) -> NodeId {
            let id = NodeId(nodes.len());
            nodes.push(Node {
                kind: p.kind,
                value: p.value.clone(),
                children: vec![],
                parent,
                is_abstract: false,
                edit_id: 0,
            });
            let children: Vec<NodeId> =
                p.children.iter().map(|c| build(c, Some(id), nodes)).collect();
            nodes[id.0].children = children;
            id
        }

        let mut nodes = vec![];
        let root = build(parsed, None, &mut nodes);
        Ast { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].value.as_deref()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn mark(&mut self, id: NodeId, edit_id: u32) {
        self.nodes[id.0].edit_id = edit_id;
    }

    pub fn find_marked(&self, edit_id: u32) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.edit_id == edit_id)
            .map(NodeId)
    }

    /// Pre-order traversal. Returning [`Visit::Stop`] aborts the walk.
    pub fn walk(&self, id: NodeId, f: &mut dyn FnMut(&Ast, NodeId) -> Visit) {
        self.walk_inner(id, f);
    }

    fn walk_inner(&self, id: NodeId, f: &mut dyn FnMut(&Ast, NodeId) -> Visit) -> bool {
        if f(self, id) == Visit::Stop {
            return false;
        }
        for &c in self.children(id) {
            if !self.walk_inner(c, f) {
                return false;
            }
        }
        true
    }

    /// Post-order traversal. Returning [`Visit::Stop`] aborts the walk.
    pub fn post_walk(&self, id: NodeId, f: &mut dyn FnMut(&Ast, NodeId) -> Visit) {
        self.post_walk_inner(id, f);
    }

    fn post_walk_inner(&self, id: NodeId, f: &mut dyn FnMut(&Ast, NodeId) -> Visit) -> bool {
        for &c in self.children(id) {
            if !self.post_walk_inner(c, f) {
                return false;
            }
        }
        f(self, id) != Visit::Stop
    }

    /// Left-to-right post-order enumeration of the subtree at `id`.
    pub fn postorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![];
        self.post_walk(id, &mut |_, n| {
            out.push(n);
            Visit::Continue
        });
        out
    }

    /// The leaf reached by always descending into the first child.
    pub fn leftmost_descendant(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(&first) = self.children(cur).first() {
            cur = first;
        }
        cur
    }

    /// Convert the subtree at `id` back into a parser-side tree. Abstractness
    /// and edit marks are dropped; rewrites only ever run on concrete trees.
    pub fn to_parsed(&self, id: NodeId) -> Parsed {
        let n = self.node(id);
        Parsed {
            kind: n.kind,
            value: n.value.clone(),
            children: n.children.iter().map(|&c| self.to_parsed(c)).collect(),
        }
    }

    /// A structurally isomorphic copy of the subtree at `id`, as its own
    /// tree. Abstract flags and edit marks are preserved.
    pub fn subtree(&self, id: NodeId) -> Ast {
        fn copy(src: &Ast, id: NodeId, parent: Option<NodeId>, nodes: &mut Vec<Node>) -> NodeId {
            let n = src.node(id);
            let new_id = NodeId(nodes.len());
            nodes.push(Node {
                kind: n.kind,
                value: n.value.clone(),
                children: vec![],
                parent,
                is_abstract: n.is_abstract,
                edit_id: n.edit_id,
            });
            let children: Vec<NodeId> = n
                .children
                .iter()
                .map(|&c| copy(src, c, Some(new_id), nodes))
                .collect();
            nodes[new_id.0].children = children;
            new_id
        }

        let mut nodes = vec![];
        let root = copy(self, id, None, &mut nodes);
        Ast { nodes, root }
    }

    /// Copy of the subtree at `id` with the concrete value cleared on the
    /// copied root; children remain as they were.
    pub fn abstract_copy(&self, id: NodeId) -> Ast {
        let mut t = self.subtree(id);
        let root = t.root;
        t.nodes[root.0].value = None;
        t.nodes[root.0].is_abstract = true;
        t
    }

    /// Child indices leading from the root down to `id`.
    pub fn path_to(&self, id: NodeId) -> Vec<usize> {
        let mut path = vec![];
        let mut cur = id;
        while let Some(p) = self.parent(cur) {
            let idx = self
                .children(p)
                .iter()
                .position(|&c| c == cur)
                .unwrap_or(0);
            path.push(idx);
            cur = p;
        }
        path.reverse();
        path
    }
}

//! # Templates
//!
//! A template is an AST fragment used as a structural pattern. Exactly one of
//! its nodes carries the edit mark; when the template matches somewhere in a
//! target tree, the node corresponding to the marked one is the locus where
//! an edit applies.

use crate::ast::{Ast, NodeId, Visit};

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Template {
    ast: Ast,
    marked: NodeId,
}

impl Template {
    /// Template consisting of the subtree at `node`, with the edit locus at
    /// its root.
    pub fn from_node(src: &Ast, node: NodeId) -> Template {
        let mut ast = src.subtree(node);
        let root = ast.root();
        ast.mark(root, 1);
        Template { ast, marked: root }
    }

    /// Template consisting of the subtree at `node`'s parent, with the edit
    /// locus at `node`. `None` if `node` is the root.
    pub fn from_parent(src: &Ast, node: NodeId) -> Option<Template> {
        let parent = src.parent(node)?;
        let index = src.children(parent).iter().position(|&c| c == node)?;
        let mut ast = src.subtree(parent);
        let marked = ast.children(ast.root())[index];
        ast.mark(marked, 1);
        Some(Template { ast, marked })
    }

    /// The same template with its root made abstract.
    pub fn abstracted(&self) -> Template {
        let ast = self.ast.abstract_copy(self.ast.root());
        let marked = ast.find_marked(1).unwrap_or(ast.root());
        Template { ast, marked }
    }

    /// Whether the edit locus sits below the template root, i.e. the
    /// template constrains the locus's surroundings too.
    pub fn has_parent_context(&self) -> bool {
        self.marked != self.ast.root()
    }

    pub fn size(&self) -> usize {
        self.ast.len()
    }

    pub fn abstract_count(&self) -> usize {
        self.ast
            .postorder(self.ast.root())
            .iter()
            .filter(|&&n| self.ast.node(n).is_abstract)
            .count()
    }

    fn node_matches(&self, t: NodeId, target: &Ast, n: NodeId) -> bool {
        let tn = self.ast.node(t);
        let mn = target.node(n);
        if tn.kind != mn.kind {
            return false;
        }
        // An abstract node stands for any node of its kind; its children are
        // not examined.
        if tn.is_abstract {
            return true;
        }
        if tn.value != mn.value {
            return false;
        }
        if tn.children.len() != mn.children.len() {
            return false;
        }
        tn.children
            .iter()
            .zip(mn.children.iter())
            .all(|(&tc, &nc)| self.node_matches(tc, target, nc))
    }

    /// Match the template root against `node`. On success, returns the edit
    /// locus in the target: the node reached by replaying the root-to-mark
    /// path of the template inside the matched subtree.
    pub fn matches_at(&self, target: &Ast, node: NodeId) -> Option<NodeId> {
        if !self.node_matches(self.ast.root(), target, node) {
            return None;
        }
        let mut cur = node;
        for idx in self.ast.path_to(self.marked) {
            cur = *target.children(cur).get(idx)?;
        }
        Some(cur)
    }

    /// All edit loci where the template matches in `target`, in pre-order of
    /// the matched positions.
    pub fn matches(&self, target: &Ast) -> Vec<NodeId> {
        let mut out = vec![];
        target.walk(target.root(), &mut |a, id| {
            if let Some(locus) = self.matches_at(a, id) {
                out.push(locus);
            }
            Visit::Continue
        });
        out
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn go(
            t: &Template,
            id: NodeId,
            f: &mut std::fmt::Formatter<'_>,
        ) -> std::fmt::Result {
            let n = t.ast.node(id);
            write!(f, "{:?}", n.kind)?;
            if n.is_abstract {
                write!(f, "?")?;
            }
            if let Some(v) = &n.value {
                write!(f, ":{}", v)?;
            }
            if id == t.marked {
                write!(f, "*")?;
            }
            if !n.children.is_empty() {
                write!(f, "(")?;
                for (i, &c) in n.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    go(t, c, f)?;
                }
                write!(f, ")")?;
            }
            Ok(())
        }
        go(self, self.ast.root(), f)
    }
}

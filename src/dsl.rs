//! # Transformation DSL
//!
//! The learned programs live in a small fixed grammar:
//!
//! ```text
//! program  := Apply(ast, edit, context)
//! edit     := Patch(op, target)
//! context  := Match(ast, template)
//! ```
//!
//! A program, invoked on an input tree, rewrites it once per context match
//! and yields the rewritten trees in match order.

use crate::ast::{Ast, NodeId, NodeKind, Parsed};
use crate::template::Template;

use serde::Serialize;

/// A bound edit, ready to run at a locus. Payloads are concrete fragments
/// copied out of the example's after tree at learning time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Edit {
    Update {
        kind: NodeKind,
        value: Option<String>,
    },
    Insert {
        fragment: Parsed,
        index: usize,
    },
    Delete,
}

impl Edit {
    /// Apply the edit at `locus`, producing a fresh tree. `None` when the
    /// edit cannot apply there (e.g. deleting the root); callers treat that
    /// as a failed candidate, not an error.
    pub fn run(&self, ast: &Ast, locus: NodeId) -> Option<Ast> {
        let mut tree = ast.to_parsed(ast.root());
        let path = ast.path_to(locus);
        match self {
            Edit::Update { kind, value } => {
                let node = node_at_mut(&mut tree, &path)?;
                node.kind = *kind;
                node.value = value.clone();
            }
            Edit::Insert { fragment, index } => {
                let node = node_at_mut(&mut tree, &path)?;
                let index = (*index).min(node.children.len());
                node.children.insert(index, fragment.clone());
            }
            Edit::Delete => {
                let (&last, init) = path.split_last()?;
                let parent = node_at_mut(&mut tree, init)?;
                if last >= parent.children.len() {
                    return None;
                }
                parent.children.remove(last);
            }
        }
        Some(Ast::wrap(&tree))
    }
}

fn node_at_mut<'a>(tree: &'a mut Parsed, path: &[usize]) -> Option<&'a mut Parsed> {
    let mut cur = tree;
    for &idx in path {
        cur = cur.children.get_mut(idx)?;
    }
    Some(cur)
}

impl std::fmt::Display for Edit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edit::Update { kind, value } => {
                write!(f, "Update({:?}", kind)?;
                if let Some(v) = value {
                    write!(f, ":{}", v)?;
                }
                write!(f, ")")
            }
            Edit::Insert { fragment, index } => {
                write!(f, "Insert@{}({})", index, fragment)
            }
            Edit::Delete => write!(f, "Delete"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Patch {
    pub edit: Edit,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchRule {
    pub template: Template,
}

/// A complete learned transformation.
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub patch: Patch,
    pub context: MatchRule,
}

impl Program {
    pub fn new(edit: Edit, template: Template) -> Program {
        Program {
            patch: Patch { edit },
            context: MatchRule { template },
        }
    }

    /// Run the transformation: one rewritten tree per context match, in the
    /// deterministic order produced by matching.
    pub fn run(&self, ast: &Ast) -> Vec<Ast> {
        self.context
            .template
            .matches(ast)
            .into_iter()
            .filter_map(|locus| self.patch.edit.run(ast, locus))
            .collect()
    }

    /// Stable string form, used as the usage-histogram key.
    pub fn describe(&self) -> String {
        format!(
            "Apply(Patch({}), Match({}))",
            self.patch.edit, self.context.template
        )
    }
}

//! # Tree diff
//!
//! Zhang–Shasha tree edit distance between two wrapped trees. Beyond the
//! distance itself, every DP entry carries the edit script and the
//! after-to-before node mapping that produced it, so the final entry is a
//! complete description of the minimal transformation.
//!
//! Entries are copied pervasively while the table fills, so the script and
//! mapping use persistent collections: extending an entry by one operation
//! shares the predecessor's tail instead of cloning it.

use crate::ast::{similar, Ast, NodeId};

use im::HashMap;
use im::Vector;

/// A single edit script entry. `Insert` ids refer to the after tree,
/// `Delete` ids to the before tree, and `Update` spans both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Insert {
        node: NodeId,
        parent: Option<NodeId>,
        index: usize,
    },
    Delete {
        node: NodeId,
        parent: Option<NodeId>,
    },
    Update {
        new: NodeId,
        old: NodeId,
    },
}

impl Operation {
    /// The locus of this operation in the before tree: the old node for
    /// updates and deletes, and the mapped parent for inserts. An insert
    /// whose after-parent never got mapped has no locus.
    pub fn target(&self, mapping: &HashMap<NodeId, NodeId>) -> Option<NodeId> {
        match self {
            Operation::Update { old, .. } => Some(*old),
            Operation::Delete { node, .. } => Some(*node),
            Operation::Insert { parent, .. } => {
                parent.and_then(|p| mapping.get(&p).copied())
            }
        }
    }
}

/// An accumulated edit distance: total cost, the operations that realize it,
/// and a partial bijection from after-tree nodes to before-tree nodes.
#[derive(Debug, Clone, Default)]
pub struct EditDistance {
    pub cost: usize,
    pub edits: Vector<Operation>,
    pub mapping: HashMap<NodeId, NodeId>,
}

impl EditDistance {
    fn push(&self, cost: usize, op: Operation) -> EditDistance {
        let mut edits = self.edits.clone();
        edits.push_back(op);
        EditDistance {
            cost: self.cost + cost,
            edits,
            mapping: self.mapping.clone(),
        }
    }

    fn update(&self, new: NodeId, old: NodeId) -> EditDistance {
        let mut edits = self.edits.clone();
        edits.push_back(Operation::Update { new, old });
        EditDistance {
            cost: self.cost + 1,
            edits,
            mapping: self.mapping.update(new, old),
        }
    }

    pub fn first_operation(&self) -> Option<&Operation> {
        self.edits.front()
    }
}

// The incoming (inner-subtree) mapping wins: evict the entry with the same
// key and any entry with the same value, keeping the merge a partial
// bijection.
fn merge_mappings(
    outer: &HashMap<NodeId, NodeId>,
    inner: &HashMap<NodeId, NodeId>,
) -> HashMap<NodeId, NodeId> {
    let mut out = outer.clone();
    for (k, v) in inner {
        out.retain(|_, existing| existing != v);
        out.insert(*k, *v);
    }
    out
}

fn insert_op(after: &Ast, node: NodeId) -> Operation {
    let parent = after.parent(node);
    let index = parent
        .and_then(|p| after.children(p).iter().position(|&c| c == node))
        .unwrap_or(0);
    Operation::Insert {
        node,
        parent,
        index,
    }
}

fn delete_op(before: &Ast, node: NodeId) -> Operation {
    Operation::Delete {
        node,
        parent: before.parent(node),
    }
}

/// Minimal-cost edit script and mapping transforming `before` into `after`.
pub fn diff(before: &Ast, after: &Ast) -> EditDistance {
    let a = before.postorder(before.root());
    let b = after.postorder(after.root());
    let n = a.len();
    let m = b.len();

    // 1-based postorder numbers, then l[i] = postorder number of the
    // leftmost descendant of the i-th node.
    let mut num1 = vec![0usize; before.len()];
    for (i, id) in a.iter().enumerate() {
        num1[id.0] = i + 1;
    }
    let mut num2 = vec![0usize; after.len()];
    for (j, id) in b.iter().enumerate() {
        num2[id.0] = j + 1;
    }

    let mut l1 = vec![0usize; n + 1];
    for i in 1..=n {
        l1[i] = num1[before.leftmost_descendant(a[i - 1]).0];
    }
    let mut l2 = vec![0usize; m + 1];
    for j in 1..=m {
        l2[j] = num2[after.leftmost_descendant(b[j - 1]).0];
    }

    let keyroots1 = keyroots(&l1);
    let keyroots2 = keyroots(&l2);

    let mut treedists = vec![vec![EditDistance::default(); m + 1]; n + 1];

    for &i in &keyroots1 {
        for &j in &keyroots2 {
            forest_dist(before, after, &a, &b, &l1, &l2, i, j, &mut treedists);
        }
    }

    treedists[n][m].clone()
}

// Nodes with no proper ancestor sharing their leftmost leaf, ascending.
fn keyroots(l: &[usize]) -> Vec<usize> {
    let n = l.len() - 1;
    let mut out = vec![];
    for i in 1..=n {
        if (i + 1..=n).all(|j| l[j] != l[i]) {
            out.push(i);
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn forest_dist(
    before: &Ast,
    after: &Ast,
    a: &[NodeId],
    b: &[NodeId],
    l1: &[usize],
    l2: &[usize],
    i: usize,
    j: usize,
    treedists: &mut [Vec<EditDistance>],
) {
    let ioff = l1[i] - 1;
    let joff = l2[j] - 1;
    let rows = i - l1[i] + 2;
    let cols = j - l2[j] + 2;

    let mut fd = vec![vec![EditDistance::default(); cols]; rows];

    for x in 1..rows {
        fd[x][0] = fd[x - 1][0].push(1, delete_op(before, a[x + ioff - 1]));
    }
    for y in 1..cols {
        fd[0][y] = fd[0][y - 1].push(1, insert_op(after, b[y + joff - 1]));
    }

    for x in 1..rows {
        for y in 1..cols {
            let an = a[x + ioff - 1];
            let bn = b[y + joff - 1];

            if l1[x + ioff] == l1[i] && l2[y + joff] == l2[j] {
                // Both forests are whole subtrees rooted at the current
                // nodes; the diagonal move is a genuine update.
                let update_cost = if similar(before.node(an), after.node(bn)) {
                    0
                } else {
                    1
                };
                let c_delete = fd[x - 1][y].cost + 1;
                let c_insert = fd[x][y - 1].cost + 1;
                let c_update = fd[x - 1][y - 1].cost + update_cost;

                let entry = if c_update <= c_delete && c_update <= c_insert {
                    if update_cost == 0 {
                        fd[x - 1][y - 1].clone()
                    } else {
                        fd[x - 1][y - 1].update(bn, an)
                    }
                } else if c_delete <= c_insert {
                    fd[x - 1][y].push(1, delete_op(before, an))
                } else {
                    fd[x][y - 1].push(1, insert_op(after, bn))
                };

                treedists[x + ioff][y + joff] = entry.clone();
                fd[x][y] = entry;
            } else {
                let p = l1[x + ioff] - 1 - ioff;
                let q = l2[y + joff] - 1 - joff;
                let sub = &treedists[x + ioff][y + joff];

                let c_sub = fd[p][q].cost + sub.cost;
                let c_delete = fd[x - 1][y].cost + 1;
                let c_insert = fd[x][y - 1].cost + 1;

                fd[x][y] = if c_sub <= c_delete && c_sub <= c_insert {
                    let mut edits = fd[p][q].edits.clone();
                    edits.append(sub.edits.clone());
                    EditDistance {
                        cost: c_sub,
                        edits,
                        mapping: merge_mappings(&fd[p][q].mapping, &sub.mapping),
                    }
                } else if c_delete <= c_insert {
                    fd[x - 1][y].push(1, delete_op(before, an))
                } else {
                    fd[x][y - 1].push(1, insert_op(after, bn))
                };
            }
        }
    }
}

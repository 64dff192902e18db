//! # Unparsing
//!
//! Renders a wrapped tree back to source text. The output normalizes
//! whitespace (4-space indents, single spaces around operators) but
//! preserves structure: re-parsing the result yields a similar tree.
//!
//! Rendering is total: rewritten candidates can carry arity-broken nodes,
//! which degrade to a best-effort rendering instead of failing, and then die
//! in the oracle like any other bad candidate.

use crate::ast::{Ast, NodeId, NodeKind};

/// Render a whole module.
pub fn unparse(ast: &Ast) -> String {
    let mut out = String::new();
    for &stmt in ast.children(ast.root()) {
        statement(ast, stmt, 0, &mut out);
    }
    out
}

fn statement(ast: &Ast, id: NodeId, indent: usize, out: &mut String) {
    let pad = "    ".repeat(indent);
    let children = ast.children(id);
    match ast.kind(id) {
        NodeKind::FunctionDef => {
            let params: Vec<&str> = children
                .iter()
                .filter(|&&c| ast.kind(c) == NodeKind::Parameter)
                .filter_map(|&c| ast.value(c))
                .collect();
            out.push_str(&format!(
                "{}def {}({}):\n",
                pad,
                ast.value(id).unwrap_or(""),
                params.join(", ")
            ));
            for &c in children {
                if ast.kind(c) == NodeKind::Suite {
                    suite(ast, c, indent + 1, out);
                }
            }
        }
        NodeKind::If => {
            if let (Some(&test), Some(&then)) = (children.first(), children.get(1)) {
                out.push_str(&format!("{}if {}:\n", pad, expression(ast, test)));
                suite(ast, then, indent + 1, out);
                if let Some(&orelse) = children.get(2) {
                    out.push_str(&format!("{}else:\n", pad));
                    suite(ast, orelse, indent + 1, out);
                }
            }
        }
        NodeKind::While => {
            if let (Some(&test), Some(&body)) = (children.first(), children.get(1)) {
                out.push_str(&format!("{}while {}:\n", pad, expression(ast, test)));
                suite(ast, body, indent + 1, out);
            }
        }
        NodeKind::For => {
            if let (Some(&target), Some(&iter), Some(&body)) =
                (children.first(), children.get(1), children.get(2))
            {
                out.push_str(&format!(
                    "{}for {} in {}:\n",
                    pad,
                    expression(ast, target),
                    expression(ast, iter)
                ));
                suite(ast, body, indent + 1, out);
            }
        }
        NodeKind::Return => match children.first() {
            Some(&value) => {
                out.push_str(&format!("{}return {}\n", pad, expression(ast, value)))
            }
            None => out.push_str(&format!("{}return\n", pad)),
        },
        NodeKind::Assign => {
            if let (Some(&target), Some(&value)) = (children.first(), children.get(1)) {
                out.push_str(&format!(
                    "{}{} = {}\n",
                    pad,
                    expression(ast, target),
                    expression(ast, value)
                ));
            }
        }
        NodeKind::AugAssign => {
            if let (Some(&target), Some(&value)) = (children.first(), children.get(1)) {
                out.push_str(&format!(
                    "{}{} {} {}\n",
                    pad,
                    expression(ast, target),
                    ast.value(id).unwrap_or("+="),
                    expression(ast, value)
                ));
            }
        }
        NodeKind::ExpressionStatement => {
            if let Some(&e) = children.first() {
                out.push_str(&format!("{}{}\n", pad, expression(ast, e)));
            }
        }
        NodeKind::Suite => suite(ast, id, indent, out),
        // An expression in statement position; render it as one.
        _ => out.push_str(&format!("{}{}\n", pad, expression(ast, id))),
    }
}

fn suite(ast: &Ast, id: NodeId, indent: usize, out: &mut String) {
    for &c in ast.children(id) {
        statement(ast, c, indent, out);
    }
}

fn expression(ast: &Ast, id: NodeId) -> String {
    let parts: Vec<String> = ast
        .children(id)
        .iter()
        .map(|&c| expression(ast, c))
        .collect();
    match ast.kind(id) {
        NodeKind::Name | NodeKind::Constant | NodeKind::Parameter => {
            ast.value(id).unwrap_or("").to_owned()
        }
        NodeKind::BinaryOp if parts.len() == 2 => format!(
            "{} {} {}",
            parts[0],
            ast.value(id).unwrap_or("+"),
            parts[1]
        ),
        NodeKind::UnaryOp if parts.len() == 1 => match ast.value(id) {
            Some("not") => format!("not {}", parts[0]),
            other => format!("{}{}", other.unwrap_or("-"), parts[0]),
        },
        NodeKind::Parenthesis => format!("({})", parts.join(", ")),
        NodeKind::Conditional if parts.len() == 3 => {
            format!("{} if {} else {}", parts[0], parts[1], parts[2])
        }
        NodeKind::Call if !parts.is_empty() => {
            format!("{}({})", parts[0], parts[1..].join(", "))
        }
        _ => parts.join(", "),
    }
}

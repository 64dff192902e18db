//! # Fix loop
//!
//! Drives learned programs against a broken submission: run each program in
//! ranked order, filter its candidate rewrites through the static tests, and
//! accept the first candidate the test oracle passes. The loop is total — it
//! reports "no fix" rather than failing.

use crate::ast::{Ast, NodeId, NodeKind, Visit};
use crate::dsl::Program;
use crate::oracle::Oracle;
use crate::parse;
use crate::synthesis::{self, Example, RankingConfig};
use crate::unparse;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Syntactic features a candidate is not allowed to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Forbidden {
    #[serde(rename = "recursion")]
    Recursion,
    #[serde(rename = "for")]
    For,
    #[serde(rename = "while")]
    While,
    Assign,
    AugAssign,
}

/// A function name plus the features forbidden inside its body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticTests {
    pub function_name: String,
    pub forbidden: Vec<Forbidden>,
}

/// Whether the candidate defines the named function and its body avoids
/// every forbidden feature. A missing function fails the filter.
pub fn passes_static_tests(ast: &Ast, tests: &StaticTests) -> bool {
    let mut def = None;
    ast.walk(ast.root(), &mut |a, id| {
        let n = a.node(id);
        if n.kind == NodeKind::FunctionDef
            && n.value.as_deref() == Some(tests.function_name.as_str())
        {
            def = Some(id);
            Visit::Stop
        } else {
            Visit::Continue
        }
    });
    let def = match def {
        Some(def) => def,
        None => return false,
    };
    tests
        .forbidden
        .iter()
        .all(|f| !body_contains(ast, def, &tests.function_name, *f))
}

fn body_contains(ast: &Ast, def: NodeId, function_name: &str, feature: Forbidden) -> bool {
    let mut found = false;
    for &child in ast.children(def) {
        if ast.kind(child) != NodeKind::Suite {
            continue;
        }
        ast.walk(child, &mut |a, id| {
            let n = a.node(id);
            let hit = match feature {
                Forbidden::Recursion => {
                    n.kind == NodeKind::Call
                        && n.children.first().map_or(false, |&callee| {
                            a.kind(callee) == NodeKind::Name
                                && a.value(callee) == Some(function_name)
                        })
                }
                Forbidden::For => n.kind == NodeKind::For,
                Forbidden::While => n.kind == NodeKind::While,
                Forbidden::Assign => n.kind == NodeKind::Assign,
                Forbidden::AugAssign => n.kind == NodeKind::AugAssign,
            };
            if hit {
                found = true;
                Visit::Stop
            } else {
                Visit::Continue
            }
        });
        if found {
            return true;
        }
    }
    false
}

/// The candidate rewrites a program produces for `ast`, bounded: when the
/// sequence exceeds 100 entries only the first 200 are kept.
pub fn bounded_candidates(program: &Program, ast: &Ast) -> Vec<Ast> {
    let mut candidates = program.run(ast);
    if candidates.len() > 100 {
        candidates.truncate(200);
    }
    candidates
}

/// A named group of examples that witnessed the same mistake.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: String,
    pub examples: Vec<Example>,
}

/// Repairs broken submissions with programs learned per cluster.
pub struct Fixer {
    clusters: Vec<Cluster>,
    queue: Vec<(usize, Program)>,
    config: RankingConfig,
    top_k: usize,
    oracle: Oracle,
    /// When set, a program learned from a cluster containing the current
    /// mistake is re-learned without it before being tried.
    pub leave_one_out: bool,
    /// Success count per program string, updated only on accepted fixes.
    pub used_programs: IndexMap<String, usize>,
}

impl Fixer {
    /// Learn up to `top_k` programs from every cluster. Clusters that yield
    /// nothing are logged and skipped; an empty queue just means every fix
    /// attempt will report "no fix".
    pub fn new(clusters: Vec<Cluster>, config: RankingConfig, top_k: usize, oracle: Oracle) -> Fixer {
        let mut queue = vec![];
        for (ci, cluster) in clusters.iter().enumerate() {
            match synthesis::learn(&cluster.examples, config, top_k) {
                Ok(programs) => {
                    queue.extend(programs.into_iter().map(|p| (ci, p)));
                }
                Err(e) => log::warn!("cluster '{}': {}", cluster.id, e),
            }
        }
        Fixer {
            clusters,
            queue,
            config,
            top_k,
            oracle,
            leave_one_out: false,
            used_programs: IndexMap::new(),
        }
    }

    /// Try every learned program against `broken`, in ranked order. Returns
    /// the first repaired source accepted by the oracle, or `None`. Only a
    /// broken source that fails to parse is an error.
    pub fn fix(
        &mut self,
        broken: &str,
        tests: &IndexMap<String, i32>,
        static_tests: Option<&StaticTests>,
    ) -> Result<Option<String>, String> {
        let ast = parse::parse(broken)?;
        let queue = self.queue.clone();
        for (ci, program) in &queue {
            if self.leave_one_out {
                if let Some(rest) = self.cluster_without(*ci, &ast) {
                    if rest.is_empty() {
                        continue;
                    }
                    let relearned = match synthesis::learn(&rest, self.config, self.top_k) {
                        Ok(programs) => programs,
                        Err(_) => continue,
                    };
                    for p in &relearned {
                        if let Some(fix) = self.try_program(p, &ast, tests, static_tests) {
                            return Ok(Some(fix));
                        }
                    }
                    continue;
                }
            }
            if let Some(fix) = self.try_program(program, &ast, tests, static_tests) {
                return Ok(Some(fix));
            }
        }
        Ok(None)
    }

    // Some(remaining examples) iff the cluster contains the current mistake.
    fn cluster_without(&self, ci: usize, broken: &Ast) -> Option<Vec<Example>> {
        let cluster = &self.clusters[ci];
        let contains = cluster
            .examples
            .iter()
            .any(|e| crate::diff::diff(&e.before, broken).cost == 0);
        if !contains {
            return None;
        }
        Some(
            cluster
                .examples
                .iter()
                .filter(|e| crate::diff::diff(&e.before, broken).cost != 0)
                .cloned()
                .collect(),
        )
    }

    fn try_program(
        &mut self,
        program: &Program,
        ast: &Ast,
        tests: &IndexMap<String, i32>,
        static_tests: Option<&StaticTests>,
    ) -> Option<String> {
        for candidate in bounded_candidates(program, ast) {
            if let Some(st) = static_tests {
                if !passes_static_tests(&candidate, st) {
                    log::debug!("candidate rejected by static tests");
                    continue;
                }
            }
            let source = unparse::unparse(&candidate);
            if self.oracle.run_tests(&source, tests) {
                *self
                    .used_programs
                    .entry(program.describe())
                    .or_insert(0) += 1;
                return Some(source);
            }
        }
        None
    }
}

//! # Synthesis
//!
//! Witness-driven learning of transformation programs from before/after
//! example pairs. Each grammar operator has a witness function that inverts
//! it against the examples: `Apply` is witnessed by diffing the pair and
//! taking the first operation of the minimal script, `Patch` by resolving
//! that operation's before-tree locus, and `Match` by proposing template
//! candidates around the locus. Surviving candidates are scored and the
//! top-k returned as complete programs.

use crate::ast::Ast;
use crate::diff::{diff, EditDistance, Operation};
use crate::dsl::{Edit, Program};
use crate::parse;
use crate::template::Template;

use indexmap::IndexSet;

/// One before/after pair.
#[derive(Debug, Clone)]
pub struct Example {
    pub before: Ast,
    pub after: Ast,
}

impl Example {
    pub fn parse(before: &str, after: &str) -> Result<Example, String> {
        Ok(Example {
            before: parse::parse(before)?,
            after: parse::parse(after)?,
        })
    }
}

/// Ranking knob: positive biases toward templates that carry parent context
/// (more specific), negative toward templates that do not (more general).
#[derive(Debug, Clone, Copy)]
pub struct RankingConfig {
    pub score_for_context: i64,
}

impl RankingConfig {
    pub fn specific() -> RankingConfig {
        RankingConfig {
            score_for_context: 100,
        }
    }

    pub fn general() -> RankingConfig {
        RankingConfig {
            score_for_context: -100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnError {
    /// Every example's before and after trees are already similar; there is
    /// nothing to learn from the batch.
    DiffEmpty,
    /// No candidate program is consistent with every example.
    NoProgramLearned,
}

impl std::fmt::Display for LearnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearnError::DiffEmpty => {
                write!(f, "before and after programs are already equivalent")
            }
            LearnError::NoProgramLearned => {
                write!(f, "no program consistent with all examples")
            }
        }
    }
}

impl std::error::Error for LearnError {}

struct Witnessed<'a> {
    example: &'a Example,
    edit: Edit,
    target: crate::ast::NodeId,
}

// Witness for Apply/Patch: the first operation of the minimal script, bound
// into a runnable edit, plus its before-tree locus.
fn witness_edit<'a>(example: &'a Example, distance: &EditDistance) -> Option<Witnessed<'a>> {
    let op = distance.first_operation()?.clone();
    let target = match op.target(&distance.mapping) {
        Some(t) => t,
        // An insert below a never-mapped parent has no locus in the before
        // tree; this example cannot contribute.
        None => return None,
    };
    let edit = match &op {
        Operation::Update { new, .. } => Edit::Update {
            kind: example.after.kind(*new),
            value: example.after.value(*new).map(|v| v.to_owned()),
        },
        Operation::Insert { node, index, .. } => Edit::Insert {
            fragment: example.after.to_parsed(*node),
            index: *index,
        },
        Operation::Delete { .. } => Edit::Delete,
    };
    Some(Witnessed {
        example,
        edit,
        target,
    })
}

// Witness for Match: four template candidates around the locus — parent,
// abstract parent, node, abstract node.
fn witness_templates(w: &Witnessed) -> Vec<Template> {
    let mut out = vec![];
    if let Some(parent) = Template::from_parent(&w.example.before, w.target) {
        let abstracted = parent.abstracted();
        out.push(parent);
        out.push(abstracted);
    }
    let node = Template::from_node(&w.example.before, w.target);
    let abstracted = node.abstracted();
    out.push(node);
    out.push(abstracted);
    out
}

fn score(template: &Template, config: RankingConfig) -> i64 {
    let context = if template.has_parent_context() {
        config.score_for_context
    } else {
        0
    };
    context - template.size() as i64 - 3 * template.abstract_count() as i64
}

/// Learn the top-`k` programs consistent with every example.
pub fn learn(
    examples: &[Example],
    config: RankingConfig,
    k: usize,
) -> Result<Vec<Program>, LearnError> {
    let mut witnessed = vec![];
    let mut informative = 0;
    for example in examples {
        let distance = diff(&example.before, &example.after);
        if distance.cost == 0 {
            // An example whose before and after already agree teaches
            // nothing; skip it rather than spoiling the batch.
            log::debug!("skipping example with an empty diff");
            continue;
        }
        informative += 1;
        if let Some(w) = witness_edit(example, &distance) {
            witnessed.push(w);
        }
    }
    let first = match witnessed.first() {
        Some(w) => w,
        None if informative == 0 && !examples.is_empty() => {
            return Err(LearnError::DiffEmpty)
        }
        None => return Err(LearnError::NoProgramLearned),
    };

    // The examples must all witness the same edit.
    if witnessed.iter().any(|w| w.edit != first.edit) {
        log::debug!("examples disagree on the witnessed edit");
        return Err(LearnError::NoProgramLearned);
    }

    let mut seen = IndexSet::new();
    let mut candidates = vec![];
    for w in &witnessed {
        for template in witness_templates(w) {
            if seen.insert(template.to_string()) {
                candidates.push(template);
            }
        }
    }

    // A template survives only if it picks out the witnessed locus in every
    // example.
    candidates.retain(|t| {
        witnessed
            .iter()
            .all(|w| t.matches(&w.example.before).contains(&w.target))
    });

    let mut scored: Vec<(i64, Template)> = candidates
        .into_iter()
        .map(|t| (score(&t, config), t))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    for (s, t) in &scored {
        log::debug!("candidate template (score {}): {}", s, t);
    }

    let programs: Vec<Program> = scored
        .into_iter()
        .take(k)
        .map(|(_, template)| Program::new(first.edit.clone(), template))
        .collect();

    if programs.is_empty() {
        Err(LearnError::NoProgramLearned)
    } else {
        Ok(programs)
    }
}

use mender::ast::Ast;
use mender::dsl::Program;
use mender::parse::parse;
use mender::synthesis::{learn, Example, LearnError, RankingConfig};
use mender::unparse::unparse;

fn example(before: &str, after: &str) -> Example {
    Example::parse(before, after).unwrap()
}

// Apply programs in ranked order and keep the first one that produces any
// candidates, the way the fix loop walks its queue.
fn first_candidates(programs: &[Program], ast: &Ast) -> Vec<String> {
    for p in programs {
        let candidates = p.run(ast);
        if !candidates.is_empty() {
            return candidates.iter().map(unparse).collect();
        }
    }
    vec![]
}

#[test]
fn constant_rewrite_generalizes_to_other_names() {
    let programs = learn(
        &[example("x = 0\n", "x = 1\n")],
        RankingConfig::general(),
        4,
    )
    .unwrap();

    let broken = parse("y = 0\n").unwrap();
    let fixed = first_candidates(&programs, &broken);
    assert_eq!(fixed, vec!["y = 1\n".to_owned()]);
}

#[test]
fn specific_mode_requires_matching_context() {
    let programs = learn(
        &[example("x = 0\n", "x = 1\n")],
        RankingConfig::specific(),
        1,
    )
    .unwrap();

    // The top-ranked template carries the full assignment context, so a
    // different right-hand side does not match.
    let other = parse("x = 5\n").unwrap();
    assert!(programs[0].run(&other).is_empty());

    // The original mistake still gets repaired.
    let broken = parse("x = 0\n").unwrap();
    let fixed = first_candidates(&programs, &broken);
    assert_eq!(fixed, vec!["x = 1\n".to_owned()]);
}

#[test]
fn operator_fix_generalizes_with_abstract_operands() {
    let programs = learn(
        &[example("return a - b\n", "return a + b\n")],
        RankingConfig::general(),
        4,
    )
    .unwrap();

    // Concretely-matching templates rank first but fail on fresh operand
    // names; the abstract one picks up the slack.
    let broken = parse("return x - y\n").unwrap();
    let fixed = first_candidates(&programs, &broken);
    assert_eq!(fixed, vec!["return x + y\n".to_owned()]);
}

#[test]
fn learning_is_idempotent_on_its_own_example() {
    let pairs = [
        ("x = 0\n", "x = 1\n"),
        ("return a - b\n", "return a + b\n"),
        (
            "def double(n):\n    return n + n\n",
            "def double(n):\n    return n * n\n",
        ),
    ];
    for (before, after) in pairs {
        for config in [RankingConfig::specific(), RankingConfig::general()] {
            let ex = example(before, after);
            let programs = learn(std::slice::from_ref(&ex), config, 4).unwrap();
            let goal = unparse(&ex.after);
            let reproduced = programs
                .iter()
                .flat_map(|p| p.run(&ex.before))
                .any(|c| unparse(&c) == goal);
            assert!(reproduced, "not reproduced: {} -> {}", before, after);
        }
    }
}

#[test]
fn multiple_examples_narrow_the_template_set() {
    let examples = [
        example("x = 0\n", "x = 1\n"),
        example("y = 0\n", "y = 1\n"),
    ];
    let programs = learn(&examples, RankingConfig::general(), 4).unwrap();

    // Every surviving template must cover both examples, so the concrete
    // parent template from either example alone is gone.
    for p in &programs {
        for ex in &examples {
            assert!(!p.run(&ex.before).is_empty());
        }
    }

    let broken = parse("z = 0\n").unwrap();
    let fixed = first_candidates(&programs, &broken);
    assert_eq!(fixed, vec!["z = 1\n".to_owned()]);
}

#[test]
fn leave_one_out_still_fixes_the_removed_example() {
    let all = [
        example("x = 0\n", "x = 1\n"),
        example("y = 0\n", "y = 1\n"),
        example("z = 0\n", "z = 1\n"),
    ];
    for removed in 0..all.len() {
        let rest: Vec<Example> = all
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != removed)
            .map(|(_, e)| e.clone())
            .collect();
        let programs = learn(&rest, RankingConfig::general(), 4).unwrap();
        let goal = unparse(&all[removed].after);
        let fixed = first_candidates(&programs, &all[removed].before);
        assert_eq!(fixed, vec![goal], "failed for removed example {}", removed);
    }
}

#[test]
fn equivalent_pair_is_reported_as_empty_diff() {
    let result = learn(
        &[example("x = 0\n", "x = 0\n")],
        RankingConfig::general(),
        4,
    );
    assert_eq!(result.unwrap_err(), LearnError::DiffEmpty);
}

#[test]
fn uninformative_examples_are_skipped_not_fatal() {
    // A no-op pair in the batch must not spoil the informative one.
    let programs = learn(
        &[
            example("x = 0\n", "x = 0\n"),
            example("y = 0\n", "y = 1\n"),
        ],
        RankingConfig::general(),
        4,
    )
    .unwrap();

    let broken = parse("z = 0\n").unwrap();
    let fixed = first_candidates(&programs, &broken);
    assert_eq!(fixed, vec!["z = 1\n".to_owned()]);
}

#[test]
fn disagreeing_examples_learn_nothing() {
    let result = learn(
        &[
            example("x = 0\n", "x = 1\n"),
            example("y = 0\n", "y = 2\n"),
        ],
        RankingConfig::general(),
        4,
    );
    assert_eq!(result.unwrap_err(), LearnError::NoProgramLearned);
}

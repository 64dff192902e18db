use mender::fix::{bounded_candidates, passes_static_tests, Cluster, Fixer, Forbidden, StaticTests};
use mender::oracle::Oracle;
use mender::parse::parse;
use mender::synthesis::{learn, Example, RankingConfig};

use indexmap::IndexMap;
use std::time::{Duration, Instant};

fn sh_oracle() -> Oracle {
    // The suite must run without a Python installation; a shell makes an
    // equally good exit-status oracle.
    Oracle::with_interpreter("sh")
}

fn tests(entries: &[(&str, i32)]) -> IndexMap<String, i32> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect()
}

fn static_tests(function_name: &str, forbidden: Vec<Forbidden>) -> StaticTests {
    StaticTests {
        function_name: function_name.to_owned(),
        forbidden,
    }
}

#[test]
fn recursion_filter_rejects_self_calls() {
    let candidate =
        parse("def factorial(n):\n    return n * factorial(n - 1)\n").unwrap();
    assert!(!passes_static_tests(
        &candidate,
        &static_tests("factorial", vec![Forbidden::Recursion])
    ));

    let closed_form = parse("def factorial(n):\n    return 1\n").unwrap();
    assert!(passes_static_tests(
        &closed_form,
        &static_tests("factorial", vec![Forbidden::Recursion])
    ));
}

#[test]
fn loop_filters_reject_only_their_feature() {
    let candidate = parse(
        "def total(n):\n    result = 0\n    for i in range(n):\n        result += i\n    return result\n",
    )
    .unwrap();
    assert!(!passes_static_tests(
        &candidate,
        &static_tests("total", vec![Forbidden::For])
    ));
    assert!(passes_static_tests(
        &candidate,
        &static_tests("total", vec![Forbidden::While, Forbidden::Recursion])
    ));
    assert!(!passes_static_tests(
        &candidate,
        &static_tests("total", vec![Forbidden::Assign])
    ));
    assert!(!passes_static_tests(
        &candidate,
        &static_tests("total", vec![Forbidden::AugAssign])
    ));
}

#[test]
fn missing_function_fails_the_filter() {
    let candidate = parse("x = 1\n").unwrap();
    assert!(!passes_static_tests(
        &candidate,
        &static_tests("factorial", vec![])
    ));
}

#[test]
fn candidate_enumeration_is_bounded() {
    let programs = learn(
        &[Example::parse("x = 0\n", "x = 1\n").unwrap()],
        RankingConfig::general(),
        4,
    )
    .unwrap();
    // The abstract-constant program matches every constant in the input.
    let abstract_program = &programs[1];

    let big = "a = 0\n".repeat(250);
    let broken = parse(&big).unwrap();
    let candidates = bounded_candidates(abstract_program, &broken);
    assert_eq!(candidates.len(), 200);

    let small = "a = 0\n".repeat(50);
    let broken = parse(&small).unwrap();
    assert_eq!(bounded_candidates(abstract_program, &broken).len(), 50);
}

#[test]
fn oracle_pass_and_fail_follow_exit_status() {
    let oracle = sh_oracle();
    assert!(oracle.run_tests("", &tests(&[("exit 0", 0)])));
    assert!(!oracle.run_tests("", &tests(&[("exit 3", 0)])));
}

#[test]
fn oracle_spawn_failure_is_a_plain_failure() {
    let oracle = Oracle::with_interpreter("definitely-not-an-interpreter");
    assert!(!oracle.run_tests("", &tests(&[("exit 0", 0)])));
}

#[test]
fn oracle_kills_overrunning_tests() {
    let oracle = Oracle {
        timeout: Duration::from_millis(200),
        ..sh_oracle()
    };
    let start = Instant::now();
    assert!(!oracle.run_tests("", &tests(&[("sleep 30", 0)])));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn fix_loop_repairs_a_structurally_similar_mistake() {
    let cluster = Cluster {
        id: "off-by-one-constant".to_owned(),
        examples: vec![Example::parse("x = 0\n", "x = 1\n").unwrap()],
    };
    let mut fixer = Fixer::new(vec![cluster], RankingConfig::general(), 4, sh_oracle());

    let fixed = fixer
        .fix("y = 0\n", &tests(&[("exit 0", 0)]), None)
        .unwrap();
    assert_eq!(fixed, Some("y = 1\n".to_owned()));

    assert_eq!(fixer.used_programs.len(), 1);
    assert_eq!(fixer.used_programs.values().sum::<usize>(), 1);
}

#[test]
fn fix_loop_reports_no_fix_when_tests_never_pass() {
    let cluster = Cluster {
        id: "off-by-one-constant".to_owned(),
        examples: vec![Example::parse("x = 0\n", "x = 1\n").unwrap()],
    };
    let mut fixer = Fixer::new(vec![cluster], RankingConfig::general(), 4, sh_oracle());

    let fixed = fixer
        .fix("y = 0\n", &tests(&[("exit 1", 0)]), None)
        .unwrap();
    assert_eq!(fixed, None);
    assert!(fixer.used_programs.is_empty());
}

#[test]
fn fix_loop_surfaces_parse_errors() {
    let cluster = Cluster {
        id: "off-by-one-constant".to_owned(),
        examples: vec![Example::parse("x = 0\n", "x = 1\n").unwrap()],
    };
    let mut fixer = Fixer::new(vec![cluster], RankingConfig::general(), 4, sh_oracle());
    assert!(fixer.fix("x = 0 +\n", &tests(&[("exit 0", 0)]), None).is_err());
}

#[test]
fn leave_one_out_relearns_without_the_current_mistake() {
    let cluster = Cluster {
        id: "zero-to-one".to_owned(),
        examples: vec![
            Example::parse("x = 0\n", "x = 1\n").unwrap(),
            Example::parse("y = 0\n", "y = 1\n").unwrap(),
            Example::parse("z = 0\n", "z = 1\n").unwrap(),
        ],
    };
    let mut fixer = Fixer::new(vec![cluster], RankingConfig::general(), 4, sh_oracle());
    fixer.leave_one_out = true;

    let fixed = fixer
        .fix("y = 0\n", &tests(&[("exit 0", 0)]), None)
        .unwrap();
    assert_eq!(fixed, Some("y = 1\n".to_owned()));
}

#[test]
fn static_filter_runs_before_the_oracle() {
    // The learned rewrite renames the callee to the enclosing function, so
    // every candidate introduces a self-call.
    let cluster = Cluster {
        id: "wrong-callee".to_owned(),
        examples: vec![Example::parse(
            "def factorial(n):\n    return g(n - 1)\n",
            "def factorial(n):\n    return factorial(n - 1)\n",
        )
        .unwrap()],
    };
    // `true` ignores its arguments and exits 0, so every candidate that
    // reaches the oracle is accepted; only the static filter can say no.
    let oracle = Oracle::with_interpreter("true");
    let mut fixer = Fixer::new(vec![cluster], RankingConfig::general(), 1, oracle);
    let broken = "def factorial(n):\n    return g(n - 1)\n";

    // Without static tests the oracle accepts the recursive candidate.
    let fixed = fixer.fix(broken, &tests(&[]), None).unwrap();
    assert_eq!(
        fixed,
        Some("def factorial(n):\n    return factorial(n - 1)\n".to_owned())
    );

    // With recursion forbidden the same candidate never reaches the oracle.
    let fixed = fixer
        .fix(
            broken,
            &tests(&[]),
            Some(&static_tests("factorial", vec![Forbidden::Recursion])),
        )
        .unwrap();
    assert_eq!(fixed, None);
}

use mender::ast::{similar, Ast, NodeKind, Parsed};
use mender::diff::{diff, Operation};
use mender::parse::parse;
use mender::unparse::unparse;

#[test]
fn identical_trees_have_empty_script_and_mapping() {
    let a = parse("x = 0\n").unwrap();
    let b = parse("x = 0\n").unwrap();
    let d = diff(&a, &b);
    assert_eq!(d.cost, 0);
    assert!(d.edits.is_empty());
    assert!(d.mapping.is_empty());
}

#[test]
fn zero_cost_iff_postorders_pointwise_similar() {
    let a = parse("x = 0\n").unwrap();
    let b = parse("x   =   0\n").unwrap();
    assert_eq!(diff(&a, &b).cost, 0);

    let c = parse("x = 1\n").unwrap();
    let d = diff(&a, &c);
    assert!(d.cost > 0);

    let pa = a.postorder(a.root());
    let pc = c.postorder(c.root());
    assert_eq!(pa.len(), pc.len());
    assert!(!pa
        .iter()
        .zip(pc.iter())
        .all(|(&x, &y)| similar(a.node(x), c.node(y))));
}

#[test]
fn constant_rewrite_is_exactly_one_update() {
    let before = parse("f(1)\n").unwrap();
    let after = parse("f(2)\n").unwrap();
    let d = diff(&before, &after);
    assert_eq!(d.cost, 1);
    assert_eq!(d.edits.len(), 1);
    match d.edits.front().unwrap() {
        Operation::Update { new, old } => {
            assert_eq!(after.kind(*new), NodeKind::Constant);
            assert_eq!(after.value(*new), Some("2"));
            assert_eq!(before.kind(*old), NodeKind::Constant);
            assert_eq!(before.value(*old), Some("1"));
        }
        other => panic!("expected an update, got {:?}", other),
    }
}

#[test]
fn operator_rewrite_is_exactly_one_update() {
    let before = parse("return a - b\n").unwrap();
    let after = parse("return a + b\n").unwrap();
    let d = diff(&before, &after);
    assert_eq!(d.cost, 1);
    assert_eq!(d.edits.len(), 1);
    match d.edits.front().unwrap() {
        Operation::Update { new, old } => {
            assert_eq!(after.kind(*new), NodeKind::BinaryOp);
            assert_eq!(after.value(*new), Some("+"));
            assert_eq!(before.value(*old), Some("-"));
        }
        other => panic!("expected an update, got {:?}", other),
    }
}

#[test]
fn empty_before_yields_inserts_only() {
    let before = parse("").unwrap();
    let after = parse("x = 1\ny = 2\n").unwrap();
    let d = diff(&before, &after);
    assert!(d.cost > 0);
    assert!(d
        .edits
        .iter()
        .all(|op| matches!(op, Operation::Insert { .. })));
}

#[test]
fn update_target_is_the_old_node() {
    let before = parse("x = 0\n").unwrap();
    let after = parse("x = 1\n").unwrap();
    let d = diff(&before, &after);
    let op = d.first_operation().unwrap();
    let target = op.target(&d.mapping).unwrap();
    assert_eq!(before.kind(target), NodeKind::Constant);
    assert_eq!(before.value(target), Some("0"));
}

#[test]
fn unparse_then_parse_roundtrip_has_zero_cost() {
    let sources = [
        "x = 0\n",
        "def fib(n):\n    if n < 2:\n        return n\n    return fib(n - 1) + fib(n - 2)\n",
        "while x > 0:\n    x -= 1\n    total += x\n",
        "for i in range(10):\n    print(i, i * i)\n",
        "y = a if a > b else b\n",
    ];
    for src in sources {
        let t = parse(src).unwrap();
        let back = parse(&unparse(&t)).unwrap();
        assert_eq!(diff(&back, &t).cost, 0, "round-trip changed: {}", src);
    }
}

#[test]
fn empty_trees_have_zero_distance() {
    let a = Ast::wrap(&Parsed::node(NodeKind::Module, vec![]));
    let b = Ast::wrap(&Parsed::node(NodeKind::Module, vec![]));
    let d = diff(&a, &b);
    assert_eq!(d.cost, 0);
    assert!(d.edits.is_empty());
}

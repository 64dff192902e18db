//! # Parsing
//!
//! A parser for the supported subset of Python: enough of the statement and
//! expression grammar to cover introductory-course submissions. Indentation
//! is resolved by a line-structure pass; the statement headers and
//! expressions on each logical line are then parsed with combinators, and
//! parse errors are rendered as readable reports.

use crate::ast::{Ast, NodeKind, Parsed};

use chumsky::prelude::*;

// Shorthand

trait P<T>: Parser<char, T, Error = Simple<char>> {}
impl<S, T> P<T> for S where S: Parser<char, T, Error = Simple<char>> {}

// Errors

fn render_error(src: &str, line_number: usize, err: &Simple<char>) -> String {
    use ariadne::*;

    let err_span = err.span();
    let err_expected = err
        .expected()
        .filter_map(|mtok| mtok.map(|tok| format!("`{}`", tok)))
        .collect::<Vec<_>>();

    let error_color = Color::Red;

    let mut report = Report::build(ReportKind::Error, "input", err_span.start)
        .with_code(1)
        .with_message(format!("Syntax error on line {}", line_number + 1))
        .with_label(
            Label::new(("input", err_span))
                .with_message(format!("{}", "Unexpected token".fg(error_color)))
                .with_color(error_color),
        );

    if !err_expected.is_empty() {
        report = report.with_note(format!(
            "{}{}",
            if err_expected.len() == 1 {
                format!("Expected {}", err_expected[0])
            } else {
                format!("Expected one of {}", err_expected.join(", "))
            },
            match err.found() {
                Some(tok) => format!(", but found `{}`", tok),
                None => "".to_owned(),
            }
        ));
    }

    let mut buf: Vec<u8> = vec![];
    report
        .finish()
        .write(sources(vec![("input", src)]), &mut buf)
        .unwrap();
    String::from_utf8(buf).unwrap()
}

// Helpers

const RESERVED: [&str; 14] = [
    "def", "if", "elif", "else", "while", "for", "in", "return", "not", "and", "or", "True",
    "False", "None",
];

fn ident() -> impl P<String> {
    text::ident().try_map(|s: String, span| {
        if RESERVED.contains(&s.as_str()) {
            Err(Simple::custom(span, "reserved word"))
        } else {
            Ok(s)
        }
    })
}

// Expressions

fn expression() -> impl P<Parsed> {
    recursive(|expr| {
        let number = text::int(10)
            .then(just('.').ignore_then(text::digits(10)).or_not())
            .map(|(whole, frac): (String, Option<String>)| match frac {
                Some(frac) => Parsed::leaf(NodeKind::Constant, format!("{}.{}", whole, frac)),
                None => Parsed::leaf(NodeKind::Constant, whole),
            });

        let single_quoted = none_of("'")
            .repeated()
            .collect::<String>()
            .delimited_by(just('\''), just('\''))
            .map(|s| Parsed::leaf(NodeKind::Constant, format!("'{}'", s)));

        let double_quoted = none_of("\"")
            .repeated()
            .collect::<String>()
            .delimited_by(just('"'), just('"'))
            .map(|s| Parsed::leaf(NodeKind::Constant, format!("\"{}\"", s)));

        let literal = choice((
            text::keyword("True").to(Parsed::leaf(NodeKind::Constant, "True")),
            text::keyword("False").to(Parsed::leaf(NodeKind::Constant, "False")),
            text::keyword("None").to(Parsed::leaf(NodeKind::Constant, "None")),
        ));

        let paren_inner = expr
            .clone()
            .separated_by(just(',').padded())
            .at_least(1)
            .map(|mut es: Vec<Parsed>| {
                if es.len() == 1 {
                    es.remove(0)
                } else {
                    Parsed::node(NodeKind::Tuple, es)
                }
            });

        let atom = choice((
            number,
            single_quoted,
            double_quoted,
            literal,
            ident().map(|s| Parsed::leaf(NodeKind::Name, s)),
            paren_inner
                .delimited_by(just('('), just(')'))
                .map(|e| Parsed::node(NodeKind::Parenthesis, vec![e])),
        ))
        .padded();

        let call_args = expr
            .clone()
            .separated_by(just(',').padded())
            .allow_trailing()
            .delimited_by(just('('), just(')'));

        let call = atom.then(call_args.repeated()).map(|(head, calls)| {
            calls.into_iter().fold(head, |callee, args: Vec<Parsed>| {
                let mut children = vec![callee];
                children.extend(
                    args.into_iter()
                        .map(|a| Parsed::node(NodeKind::Arg, vec![a])),
                );
                Parsed::node(NodeKind::Call, children)
            })
        });

        let unary_op = choice((
            just('-').padded().to("-"),
            text::keyword("not").padded().to("not"),
        ));
        let unary = unary_op
            .repeated()
            .then(call)
            .map(|(ops, e)| {
                ops.into_iter()
                    .rev()
                    .fold(e, |e, op| Parsed::valued(NodeKind::UnaryOp, op, vec![e]))
            })
            .boxed();

        fn binary(
            first: Parsed,
            rest: Vec<(&'static str, Parsed)>,
        ) -> Parsed {
            rest.into_iter().fold(first, |l, (op, r)| {
                Parsed::valued(NodeKind::BinaryOp, op, vec![l, r])
            })
        }

        let product_op = choice((
            just("**").to("**"),
            just("//").to("//"),
            just("*").to("*"),
            just("/").to("/"),
            just("%").to("%"),
        ))
        .padded();
        let product = unary
            .clone()
            .then(product_op.then(unary).repeated())
            .map(|(first, rest)| binary(first, rest));

        let sum_op = choice((just('+').to("+"), just('-').to("-"))).padded();
        let sum = product
            .clone()
            .then(sum_op.then(product).repeated())
            .map(|(first, rest)| binary(first, rest));

        let cmp_op = choice((
            just("==").to("=="),
            just("!=").to("!="),
            just("<=").to("<="),
            just(">=").to(">="),
            just("<").to("<"),
            just(">").to(">"),
            text::keyword("in").to("in"),
        ))
        .padded();
        let comparison = sum
            .clone()
            .then(cmp_op.then(sum).repeated())
            .map(|(first, rest)| binary(first, rest));

        let and_op = text::keyword("and").to("and").padded();
        let and_expr = comparison
            .clone()
            .then(and_op.then(comparison).repeated())
            .map(|(first, rest)| binary(first, rest));

        let or_op = text::keyword("or").to("or").padded();
        let or_expr = and_expr
            .clone()
            .then(or_op.then(and_expr).repeated())
            .map(|(first, rest)| binary(first, rest));

        or_expr
            .clone()
            .then(
                text::keyword("if")
                    .padded()
                    .ignore_then(or_expr)
                    .then(text::keyword("else").padded().ignore_then(expr))
                    .or_not(),
            )
            .map(|(body, tail)| match tail {
                None => body,
                Some((cond, orelse)) => {
                    Parsed::node(NodeKind::Conditional, vec![body, cond, orelse])
                }
            })
    })
}

fn expression_list() -> impl P<Parsed> {
    expression()
        .separated_by(just(',').padded())
        .at_least(1)
        .map(|mut es| {
            if es.len() == 1 {
                es.remove(0)
            } else {
                Parsed::node(NodeKind::Tuple, es)
            }
        })
}

// Statement lines

fn simple_statement() -> impl P<Parsed> {
    let ret = text::keyword("return")
        .ignore_then(expression_list().or_not())
        .map(|v| Parsed::node(NodeKind::Return, v.into_iter().collect()));

    let aug_op = choice((
        just("+=").to("+="),
        just("-=").to("-="),
        just("*=").to("*="),
        just("//=").to("//="),
        just("/=").to("/="),
        just("%=").to("%="),
    ))
    .padded();
    let aug = expression()
        .then(aug_op)
        .then(expression_list())
        .map(|((target, op), value)| Parsed::valued(NodeKind::AugAssign, op, vec![target, value]));

    let assign = expression_list()
        .then_ignore(just('=').padded())
        .then(expression_list())
        .map(|(target, value)| Parsed::node(NodeKind::Assign, vec![target, value]));

    let expr_stmt =
        expression_list().map(|e| Parsed::node(NodeKind::ExpressionStatement, vec![e]));

    choice((ret, aug, assign, expr_stmt))
}

fn def_header() -> impl P<(String, Vec<String>)> {
    text::keyword("def")
        .ignore_then(ident().padded())
        .then(
            ident()
                .padded()
                .separated_by(just(','))
                .delimited_by(just('('), just(')')),
        )
        .then_ignore(just(':').padded())
}

fn condition_header(keyword: &'static str) -> impl P<Parsed> {
    text::keyword(keyword)
        .ignore_then(expression())
        .then_ignore(just(':').padded())
}

fn for_header() -> impl P<(Parsed, Parsed)> {
    let target = ident()
        .padded()
        .map(|s| Parsed::leaf(NodeKind::Name, s))
        .separated_by(just(','))
        .at_least(1)
        .map(|mut ts| {
            if ts.len() == 1 {
                ts.remove(0)
            } else {
                Parsed::node(NodeKind::Tuple, ts)
            }
        });
    text::keyword("for")
        .ignore_then(target)
        .then(text::keyword("in").ignore_then(expression()))
        .then_ignore(just(':').padded())
}

fn else_header() -> impl P<()> {
    text::keyword("else").padded().then_ignore(just(':').padded())
}

// Layout

#[derive(Debug, Clone)]
struct Line {
    indent: usize,
    text: String,
    number: usize,
}

fn layout(source: &str) -> Vec<Line> {
    let mut out = vec![];
    for (number, raw) in source.lines().enumerate() {
        let text = raw.trim_end();
        let trimmed = text.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut indent = 0;
        for ch in text[..text.len() - trimmed.len()].chars() {
            indent += if ch == '\t' { 4 } else { 1 };
        }
        out.push(Line {
            indent,
            text: trimmed.to_owned(),
            number,
        });
    }
    out
}

fn run_line<T>(parser: impl P<T>, line: &Line) -> Result<T, String> {
    parser
        .then_ignore(end())
        .parse(line.text.as_str())
        .map_err(|errs| render_error(&line.text, line.number, &errs[0]))
}

fn head_word(text: &str) -> &str {
    let end = text
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(text.len());
    &text[..end]
}

fn parse_suite(lines: &[Line], pos: &mut usize, parent_indent: usize) -> Result<Parsed, String> {
    match lines.get(*pos) {
        Some(next) if next.indent > parent_indent => {
            let indent = next.indent;
            let body = parse_block(lines, pos, indent)?;
            Ok(Parsed::node(NodeKind::Suite, body))
        }
        Some(next) => Err(format!(
            "line {}: expected an indented block",
            next.number + 1
        )),
        None => Err("unexpected end of input: expected an indented block".to_owned()),
    }
}

fn parse_if(lines: &[Line], pos: &mut usize, keyword: &'static str) -> Result<Parsed, String> {
    let line = lines[*pos].clone();
    let indent = line.indent;
    let cond = run_line(condition_header(keyword), &line)?;
    *pos += 1;
    let then = parse_suite(lines, pos, indent)?;

    let mut children = vec![Parsed::node(NodeKind::IfTest, vec![cond]), then];
    if let Some(next) = lines.get(*pos) {
        if next.indent == indent {
            match head_word(&next.text) {
                "elif" => {
                    let nested = parse_if(lines, pos, "elif")?;
                    children.push(Parsed::node(NodeKind::Suite, vec![nested]));
                }
                "else" => {
                    run_line(else_header(), next)?;
                    *pos += 1;
                    children.push(parse_suite(lines, pos, indent)?);
                }
                _ => (),
            }
        }
    }
    Ok(Parsed::node(NodeKind::If, children))
}

fn parse_statement(lines: &[Line], pos: &mut usize) -> Result<Parsed, String> {
    let line = lines[*pos].clone();
    let indent = line.indent;
    match head_word(&line.text) {
        "def" => {
            let (name, params) = run_line(def_header(), &line)?;
            *pos += 1;
            let suite = parse_suite(lines, pos, indent)?;
            let mut children: Vec<Parsed> = params
                .into_iter()
                .map(|p| Parsed::leaf(NodeKind::Parameter, p))
                .collect();
            children.push(suite);
            Ok(Parsed::valued(NodeKind::FunctionDef, name, children))
        }
        "if" => parse_if(lines, pos, "if"),
        "while" => {
            let cond = run_line(condition_header("while"), &line)?;
            *pos += 1;
            let suite = parse_suite(lines, pos, indent)?;
            Ok(Parsed::node(
                NodeKind::While,
                vec![Parsed::node(NodeKind::IfTest, vec![cond]), suite],
            ))
        }
        "for" => {
            let (target, iter) = run_line(for_header(), &line)?;
            *pos += 1;
            let suite = parse_suite(lines, pos, indent)?;
            Ok(Parsed::node(NodeKind::For, vec![target, iter, suite]))
        }
        "elif" | "else" => Err(format!(
            "line {}: '{}' without a matching 'if'",
            line.number + 1,
            head_word(&line.text)
        )),
        _ => {
            let stmt = run_line(simple_statement(), &line)?;
            *pos += 1;
            Ok(stmt)
        }
    }
}

fn parse_block(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Vec<Parsed>, String> {
    let mut stmts = vec![];
    while let Some(line) = lines.get(*pos) {
        if line.indent < indent {
            break;
        }
        if line.indent > indent {
            return Err(format!("line {}: unexpected indent", line.number + 1));
        }
        stmts.push(parse_statement(lines, pos)?);
    }
    Ok(stmts)
}

// Top-level functions

/// Parse a source string into a wrapped tree.
pub fn parse(source: &str) -> Result<Ast, String> {
    let lines = layout(source);
    let mut pos = 0;
    let statements = parse_block(&lines, &mut pos, 0)?;
    if let Some(line) = lines.get(pos) {
        return Err(format!("line {}: unexpected indent", line.number + 1));
    }
    Ok(Ast::wrap(&Parsed::node(NodeKind::Module, statements)))
}

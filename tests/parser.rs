use protolex::{
    ast::{BinaryOp, Block, CatchBinding, ElseBranch, Literal, Node, NodeKind, UnaryOp},
    diagnostics::DiagnosticKind,
    parser::parse_program,
};

fn parse(source: &str) -> Block {
    parse_program(source).expect("parse should succeed")
}

fn single(source: &str) -> Node {
    let mut program = parse(source);
    assert_eq!(program.statements.len(), 1, "expected one statement in {source}");
    program.statements.remove(0)
}

fn parse_error(source: &str) -> (String, u32, u32) {
    let err = parse_program(source).expect_err("parse should fail");
    let pos = err.pos.expect("parse errors carry a position");
    (err.message, pos.line, pos.col)
}

/// Renders a node as an s-expression for compact structural assertions.
fn sexpr(node: &Node) -> String {
    match &node.kind {
        NodeKind::Literal(Literal::Int(n)) => n.to_string(),
        NodeKind::Literal(Literal::Float(n)) => format!("{n:?}"),
        NodeKind::Literal(Literal::Bool(b)) => b.to_string(),
        NodeKind::Literal(Literal::String(s)) => format!("{s:?}"),
        NodeKind::Literal(Literal::Null) => "null".into(),
        NodeKind::Variable(name) => name.clone(),
        NodeKind::Assign { target, value } => format!("(= {} {})", sexpr(target), sexpr(value)),
        NodeKind::Binary { op, left, right } => {
            format!("({} {} {})", op.symbol(), sexpr(left), sexpr(right))
        }
        NodeKind::Unary { op, expr } => {
            let symbol = match op {
                UnaryOp::Negate => "neg",
                UnaryOp::Not => "!",
            };
            format!("({symbol} {})", sexpr(expr))
        }
        NodeKind::Call { callee, args } => {
            let args: Vec<String> = args.iter().map(sexpr).collect();
            format!("(call {} [{}])", sexpr(callee), args.join(" "))
        }
        NodeKind::Dot { object, name } => format!("(. {} {name})", sexpr(object)),
        NodeKind::Index { object, index } => format!("([] {} {})", sexpr(object), sexpr(index)),
        other => format!("<{other:?}>"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(sexpr(&single("1 + 2 * 3")), "(+ 1 (* 2 3))");
    assert_eq!(sexpr(&single("(1 + 2) * 3")), "(* (+ 1 2) 3)");
    assert_eq!(sexpr(&single("8 - 4 - 2")), "(- (- 8 4) 2)");
}

#[test]
fn logical_and_comparison_precedence() {
    assert_eq!(
        sexpr(&single("a || b && c == d < e + 1")),
        "(|| a (&& b (== c (< d (+ e 1)))))"
    );
    assert_eq!(sexpr(&single("!a == -b")), "(== (! a) (neg b))");
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(sexpr(&single("a = b = 1")), "(= a (= b 1))");
    assert_eq!(sexpr(&single("t.x[1] = 2")), "(= ([] (. t x) 1) 2)");
}

#[test]
fn postfix_chains_and_calls() {
    assert_eq!(
        sexpr(&single("io.write(io.stdout, s)")),
        "(call (. io write) [(. io stdout) s])"
    );
    assert_eq!(sexpr(&single("f()(1)")), "(call (call f []) [1])");
}

#[test]
fn binary_nodes_are_positioned_at_the_operator() {
    let node = single("alpha + beta");
    assert_eq!((node.pos.line, node.pos.col), (1, 7));
    let NodeKind::Binary { op, .. } = node.kind else {
        panic!("expected binary node");
    };
    assert_eq!(op, BinaryOp::Add);
}

#[test]
fn else_if_chains_nest() {
    let node = single("if a { 1 } else if b { 2 } else { 3 }");
    let NodeKind::If {
        else_branch: Some(ElseBranch::If(nested)),
        ..
    } = node.kind
    else {
        panic!("expected else-if");
    };
    let NodeKind::If {
        else_branch: Some(ElseBranch::Block(block)),
        ..
    } = nested.kind
    else {
        panic!("expected trailing else block");
    };
    assert_eq!(block.statements.len(), 1);
}

#[test]
fn catch_and_finally_may_follow_newlines() {
    let node = single("try {\n  throw 1\n}\ncatch err {\n  err\n}\nfinally {\n  2\n}");
    let NodeKind::Try {
        catch: Some(clause),
        finally: Some(finally),
        ..
    } = node.kind
    else {
        panic!("expected try with catch and finally");
    };
    assert!(matches!(clause.binding, CatchBinding::Named(ref name) if name == "err"));
    assert_eq!(finally.statements.len(), 1);
}

#[test]
fn catch_star_discards_the_exception() {
    let node = single("try { x } catch * { 0 }");
    let NodeKind::Try { catch: Some(clause), finally: None, .. } = node.kind else {
        panic!("expected try/catch");
    };
    assert!(matches!(clause.binding, CatchBinding::Any));
}

#[test]
fn table_literals_accept_identifier_and_string_keys() {
    let node = single("[a = 1,\n \"b c\" = 2\n]");
    let NodeKind::Table(fields) = node.kind else {
        panic!("expected table literal");
    };
    let keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, ["a", "b c"]);
    assert!(matches!(single("[]").kind, NodeKind::Table(ref fields) if fields.is_empty()));
}

#[test]
fn table_literal_errors() {
    assert_eq!(parse_error("[1 = 2]").0, "expected table key");
    assert_eq!(parse_error("[a 1]").0, "expected '=' in table literal");
    assert_eq!(parse_error("[a = 1 b = 2]").0, "expected ',' or ']'");
}

#[test]
fn import_statement_shape() {
    let node = single("import util from \"lib/util.plx\"");
    let NodeKind::Import { name, path } = node.kind else {
        panic!("expected import");
    };
    assert_eq!(name, "util");
    assert_eq!(path, "lib/util.plx");
    assert_eq!(parse_error("import util \"x\"").0, "expected 'from'");
    assert_eq!(parse_error("import util from x").0, "expected module path");
}

#[test]
fn statements_split_on_newlines_and_semicolons() {
    let program = parse("a = 1\n\n b = 2; c = 3\n");
    assert_eq!(program.statements.len(), 3);
}

#[test]
fn function_literal_params() {
    let node = single("fn(a, b) { a + b }");
    let NodeKind::Function { params, body } = node.kind else {
        panic!("expected function literal");
    };
    assert_eq!(params.to_vec(), vec!["a", "b"]);
    assert_eq!(body.statements.len(), 1);
    assert_eq!(parse_error("fn(1) {}").0, "expected parameter name");
}

#[test]
fn unexpected_tokens_report_their_position() {
    assert_eq!(parse_error("x = )"), ("unexpected token".to_string(), 1, 5));
    assert_eq!(parse_error("\n  + 1").0, "unexpected token");
    assert_eq!(parse_error("if x { 1").0, "expected '}'");
    assert_eq!(parse_error("f(1, 2").0, "expected ')'");
}

#[test]
fn lexer_failures_surface_through_parse_program() {
    let err = parse_program("a = 0b").expect_err("bad literal");
    assert_eq!(err.kind, DiagnosticKind::Lexer);
}

use protolex::{
    table::{self, Table, TableError},
    Interpreter, Outcome, Value,
};

fn eval(source: &str) -> Value {
    match Interpreter::new().eval_source(source).expect("evaluation should succeed") {
        Outcome::Normal(value) => value,
        Outcome::Thrown(value) => panic!("unexpected exception: {value}"),
    }
}

fn eval_thrown(source: &str) -> String {
    match Interpreter::new().eval_source(source).expect("evaluation should succeed") {
        Outcome::Thrown(value) => value.to_string(),
        Outcome::Normal(value) => panic!("expected an exception, got {value}"),
    }
}

fn expect_int(value: Value, expected: i64) {
    match value {
        Value::Int(actual) => assert_eq!(actual, expected),
        other => panic!("expected int {expected}, got {other:?}"),
    }
}

#[test]
fn clone_delegates_lookups_to_the_prototype() {
    let source = r#"
base = [greeting = "hi", n = 1]
child = clone(base)
before = child.greeting
base.greeting = "hello"
[before = before, after = child.greeting, own = has(child, "greeting")]
"#;
    let Value::Table(result) = eval(source) else {
        panic!("expected table");
    };
    let result = result.borrow();
    assert_eq!(result.get_local(&Value::from("before")), Some(Value::from("hi")));
    assert_eq!(result.get_local(&Value::from("after")), Some(Value::from("hello")));
    assert_eq!(result.get_local(&Value::from("own")), Some(Value::Bool(false)));
}

#[test]
fn own_slots_shadow_the_prototype() {
    let source = r#"
base = [n = 1]
child = clone(base)
child.n = 2
base.n * 10 + child.n
"#;
    expect_int(eval(source), 12);
}

#[test]
fn methods_resolve_through_the_chain() {
    let source = r#"
Animal = [speak = fn(self) { self.sound }]
dog = clone(Animal)
dog.sound = "woof"
dog.speak(dog)
"#;
    assert_eq!(eval(source), Value::from("woof"));
}

#[test]
fn proto_can_be_set_in_literal_and_reassigned() {
    let source = r#"
a = [x = 1]
b = [x = 2]
t = [proto = a]
first = t.x
t.proto = b
second = t.x
t.proto = null
third = isAbsent(t.x)
[first = first, second = second, third = third]
"#;
    let Value::Table(result) = eval(source) else {
        panic!("expected table");
    };
    let result = result.borrow();
    assert_eq!(result.get_local(&Value::from("first")), Some(Value::Int(1)));
    assert_eq!(result.get_local(&Value::from("second")), Some(Value::Int(2)));
    assert_eq!(result.get_local(&Value::from("third")), Some(Value::Bool(true)));
}

#[test]
fn non_table_proto_throws() {
    assert_eq!(eval_thrown("t = []\nt.proto = 5"), "invalid proto");
    assert_eq!(eval_thrown("clone(3)"), "clone expects (table)");
}

#[test]
fn prototype_cycles_are_fatal() {
    let err = Interpreter::new()
        .eval_source("a = []\nb = clone(a)\na.proto = b")
        .err()
        .expect("cycle must be fatal");
    let diag = err.diagnostic().expect("runtime diagnostic");
    assert_eq!(diag.message, "prototype cycle");

    let err = Interpreter::new()
        .eval_source("a = []\ntry { a.proto = a } catch e { 0 }")
        .err()
        .expect("self cycle must be fatal even inside try");
    assert_eq!(err.diagnostic().map(|d| d.message.as_str()), Some("prototype cycle"));
}

#[test]
fn frozen_tables_reject_writes() {
    assert_eq!(eval_thrown("t = [a = 1]\nfreeze(t)\nt.a = 2"), "object is frozen");
    let unchanged = eval("t = [a = 1]\nfreeze(t)\ntry { t.a = 2 } catch * { 0 }\nt.a");
    expect_int(unchanged, 1);
    assert_eq!(eval_thrown("t = [a = 1]\nfreeze(t)\nundefine t.a"), "object is frozen");
}

#[test]
fn mutate_thaws_for_the_duration_of_the_block() {
    let source = r#"
t = [a = 1]
freeze(t)
mutate t { t.a = 2 }
"#;
    assert_eq!(
        eval_thrown(&format!("{source}\nt.a = 3")),
        "object is frozen",
        "thaw must not outlive the mutate block"
    );
    let value = eval("t = [a = 1]\nfreeze(t)\nmutate t { t.a = 2 }\nt.a");
    expect_int(value, 2);
}

#[test]
fn mutate_thaws_reachable_tables() {
    let source = r#"
inner = [v = 1]
outer = [inner = inner]
freeze(inner)
freeze(outer)
mutate outer { outer.inner.v = 5 }
inner.v
"#;
    expect_int(eval(source), 5);
}

#[test]
fn nested_mutate_restores_thaw_depth_after_inner_throw() {
    let mut interpreter = Interpreter::new();
    let source = r#"
t = [a = 1]
freeze(t)
mutate t {
  try {
    mutate t { throw "inner" }
  } catch e { t.a = 2 }
}
t
"#;
    let value = interpreter
        .eval_source(source)
        .expect("evaluation should succeed")
        .into_value();
    let table = value.as_table().expect("table result");
    let table = table.borrow();
    assert_eq!(table.thaw_depth(), 0);
    assert!(table.is_frozen());
    assert_eq!(table.get_local(&Value::from("a")), Some(Value::Int(2)));
}

#[test]
fn frozen_tables_still_accept_a_new_prototype() {
    let source = r#"
base = [x = 7]
t = [y = 1]
freeze(t)
t.proto = base
t.x
"#;
    expect_int(eval(source), 7);
    let cleared = eval("t = [proto = [x = 1]]\nfreeze(t)\nt.proto = null\nisAbsent(t.x)");
    assert_eq!(cleared, Value::Bool(true));
}

#[test]
fn table_unlinked_inside_mutate_is_refrozen() {
    let source = r#"
child = [v = 1]
freeze(child)
t = [c = child]
freeze(t)
mutate t { undefine t.c }
child.v = 2
"#;
    assert_eq!(eval_thrown(source), "object is frozen");
}

#[test]
fn linking_inside_nested_mutate_keeps_the_outer_thaw() {
    let source = r#"
o = [v = 1]
freeze(o)
t = [x = 0]
freeze(t)
mutate o {
  mutate t { t.c = o }
  o.v = 2
}
[o = o, t = t]
"#;
    let Value::Table(result) = eval(source) else {
        panic!("expected table");
    };
    let result = result.borrow();
    for name in ["o", "t"] {
        let table = result
            .get_local(&Value::from(name))
            .and_then(|value| value.as_table().cloned())
            .expect("table slot");
        let table = table.borrow();
        assert_eq!(table.thaw_depth(), 0, "{name} must be refrozen");
        assert!(!table.can_mutate());
    }
    let o = result
        .get_local(&Value::from("o"))
        .and_then(|value| value.as_table().cloned())
        .expect("o slot");
    assert_eq!(o.borrow().get_local(&Value::from("v")), Some(Value::Int(2)));
}

#[test]
fn mutate_on_non_table_throws() {
    assert_eq!(eval_thrown("mutate 3 { 1 }"), "mutate on non-table");
}

#[test]
fn undefine_removes_own_slots_only() {
    let source = r#"
base = [x = 1]
t = clone(base)
t.x = 2
undefine t.x
a = t.x
undefine t["missing"]
a
"#;
    expect_int(eval(source), 1);
}

#[test]
fn undefine_proto_is_rejected() {
    assert_eq!(eval_thrown("t = []\nundefine t.proto"), "cannot undefine proto");
    assert_eq!(eval_thrown("x = 1\nundefine x"), "undefine target must be slot");
}

#[test]
fn has_checks_own_keys() {
    let source = r#"
base = [x = 1]
t = clone(base)
t[2] = "two"
[own = has(t, 2.0), inherited = has(t, "x"), other = has(5, "x")]
"#;
    let Value::Table(result) = eval(source) else {
        panic!("expected table");
    };
    let result = result.borrow();
    assert_eq!(result.get_local(&Value::from("own")), Some(Value::Bool(true)));
    assert_eq!(result.get_local(&Value::from("inherited")), Some(Value::Bool(false)));
    assert_eq!(result.get_local(&Value::from("other")), Some(Value::Bool(false)));
}

#[test]
fn index_and_dot_share_string_slots() {
    expect_int(eval("t = []\nt[\"k\"] = 4\nt.k"), 4);
    expect_int(eval("t = []\nkey = [id = 1]\nt[key] = 9\nt[key]"), 9);
}

#[test]
fn lookup_on_non_table_throws() {
    assert_eq!(eval_thrown("x = 1\nx.y"), "lookup on non-table");
    assert_eq!(eval_thrown("x = 1\nx[0]"), "index on non-table");
    assert_eq!(eval_thrown("x = 1\nx.y = 2"), "assignment on non-table");
}

#[test]
fn table_api_guards_writes() {
    let t = Table::new_ref();
    t.borrow_mut()
        .set(&Value::from("a"), Value::Int(1))
        .expect("unfrozen write");
    assert_eq!(
        t.borrow_mut().set(&Value::Undefined, Value::Int(1)),
        Err(TableError::InvalidKey)
    );
    t.borrow_mut().freeze();
    assert_eq!(
        t.borrow_mut().set(&Value::from("a"), Value::Int(2)),
        Err(TableError::Frozen)
    );
    let thawed = table::thaw(&t);
    assert!(t.borrow().can_mutate());
    table::refreeze(&thawed);
    assert!(!t.borrow().can_mutate());
}

#[test]
fn table_api_rejects_cycles_before_mutating() {
    let a = Table::new_ref();
    let b = Table::new_ref();
    table::set_proto(&b, &Value::Table(a.clone())).expect("acyclic");
    assert_eq!(
        table::set_proto(&a, &Value::Table(b.clone())),
        Err(TableError::PrototypeCycle)
    );
    assert!(a.borrow().proto().is_none());
    assert_eq!(table::lookup(&b, &Value::from("missing")), Value::Undefined);
}

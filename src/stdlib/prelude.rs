use crate::{
    environment::EnvironmentRef,
    table::{self, Table},
    value::{NativeError, NativeResult, Value},
};

/// Defines the global natives in the root scope.
pub fn install(env: &EnvironmentRef) {
    let mut scope = env.borrow_mut();
    scope.define("clone", Value::native("clone", clone));
    scope.define("has", Value::native("has", has));
    scope.define("freeze", Value::native("freeze", freeze));
    scope.define(
        "isAbsent",
        predicate("isAbsent", |v| matches!(v, Value::Undefined)),
    );
    scope.define("isInt", predicate("isInt", |v| matches!(v, Value::Int(_))));
    scope.define(
        "isFloat",
        predicate("isFloat", |v| matches!(v, Value::Float(_))),
    );
    scope.define(
        "isString",
        predicate("isString", |v| matches!(v, Value::String(_))),
    );
    scope.define("isBool", predicate("isBool", |v| matches!(v, Value::Bool(_))));
    scope.define(
        "isTable",
        predicate("isTable", |v| matches!(v, Value::Table(_))),
    );
    scope.define(
        "isFunction",
        predicate("isFunction", |v| matches!(v, Value::Function(_))),
    );
}

/// `clone(proto)`: a fresh table delegating to `proto`.
fn clone(args: &[Value]) -> NativeResult {
    let [proto] = args else {
        return Ok(Value::Null);
    };
    let table = Table::new_ref();
    table::set_proto(&table, proto).map_err(|_| super::expects("clone", "table"))?;
    Ok(Value::Table(table))
}

fn has(args: &[Value]) -> NativeResult {
    Ok(Value::Bool(match args {
        [Value::Table(table), key] => table.borrow().has_local(key),
        _ => false,
    }))
}

fn freeze(args: &[Value]) -> NativeResult {
    if let [Value::Table(table)] = args {
        table.borrow_mut().freeze();
    }
    Ok(Value::Null)
}

fn predicate(name: &'static str, test: fn(&Value) -> bool) -> Value {
    Value::native(name, move |args| match args {
        [value] => Ok(Value::Bool(test(value))),
        _ => Err(NativeError::message(format!("{name} expects (value)"))),
    })
}

use super::{expects, format::general, ModuleBuilder};
use crate::{
    table::TableRef,
    value::{NativeError, NativeResult, Value},
};

pub(super) fn build() -> TableRef {
    ModuleBuilder::new()
        .function("abs", unary("float.abs", f64::abs))
        .function("min", binary("float.min", |a, b| if a < b { a } else { b }))
        .function("max", binary("float.max", |a, b| if a > b { a } else { b }))
        .function("round", unary("float.round", f64::round))
        .function("floor", unary("float.floor", f64::floor))
        .function("ceil", unary("float.ceil", f64::ceil))
        .function("pow", binary("float.pow", f64::powf))
        .function("sqrt", unary("float.sqrt", f64::sqrt))
        .function("parse", |args| {
            let [Value::String(s)] = args else {
                return Err(expects("float.parse", "string"));
            };
            s.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| NativeError::message("float.parse invalid"))
        })
        .function("toString", to_string)
        .finish()
}

/// Lifts `op` into a native taking exactly one float.
pub(super) fn unary(
    name: &'static str,
    op: fn(f64) -> f64,
) -> impl Fn(&[Value]) -> NativeResult + 'static {
    move |args| match args {
        [Value::Float(x)] => Ok(Value::Float(op(*x))),
        _ => Err(expects(name, "float")),
    }
}

fn binary(
    name: &'static str,
    op: fn(f64, f64) -> f64,
) -> impl Fn(&[Value]) -> NativeResult + 'static {
    move |args| match args {
        [Value::Float(a), Value::Float(b)] => Ok(Value::Float(op(*a, *b))),
        _ => Err(expects(name, "float, float")),
    }
}

/// Round-trippable rendering with 17 significant digits.
fn to_string(args: &[Value]) -> NativeResult {
    let [Value::Float(x)] = args else {
        return Err(expects("float.toString", "float"));
    };
    let text = if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        let text = if *x > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else {
        let sign = if x.is_sign_negative() { "-" } else { "" };
        format!("{sign}{}", general(x.abs(), 17, false, false))
    };
    Ok(Value::string(text))
}

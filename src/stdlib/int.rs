use super::{expects, ModuleBuilder};
use crate::{
    table::TableRef,
    value::{NativeError, NativeResult, Value},
};

pub(super) fn build() -> TableRef {
    ModuleBuilder::new()
        .function("abs", |args| {
            let [Value::Int(n)] = args else {
                return Err(expects("int.abs", "int"));
            };
            n.checked_abs()
                .map(Value::Int)
                .ok_or_else(|| NativeError::message("int.abs overflow"))
        })
        .function("min", |args| match args {
            [Value::Int(a), Value::Int(b)] => Ok(Value::Int(*a.min(b))),
            _ => Err(expects("int.min", "int, int")),
        })
        .function("max", |args| match args {
            [Value::Int(a), Value::Int(b)] => Ok(Value::Int(*a.max(b))),
            _ => Err(expects("int.max", "int, int")),
        })
        .function("clamp", clamp)
        .function("pow", pow)
        .function("parse", |args| {
            let [Value::String(s)] = args else {
                return Err(expects("int.parse", "string"));
            };
            s.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| NativeError::message("int.parse invalid"))
        })
        .function("toString", |args| {
            let [Value::Int(n)] = args else {
                return Err(expects("int.toString", "int"));
            };
            Ok(Value::string(n.to_string()))
        })
        .finish()
}

fn clamp(args: &[Value]) -> NativeResult {
    let [Value::Int(x), Value::Int(min), Value::Int(max)] = args else {
        return Err(expects("int.clamp", "int, int, int"));
    };
    if min > max {
        return Err(NativeError::message("int.clamp invalid range"));
    }
    Ok(Value::Int(*x.clamp(min, max)))
}

fn pow(args: &[Value]) -> NativeResult {
    let [Value::Int(base), Value::Int(exp)] = args else {
        return Err(expects("int.pow", "int, int"));
    };
    if *exp < 0 {
        return Err(NativeError::message("int.pow expects non-negative exponent"));
    }
    let result = match base {
        0 => Some(if *exp == 0 { 1 } else { 0 }),
        1 => Some(1),
        -1 => Some(if exp % 2 == 0 { 1 } else { -1 }),
        _ => u32::try_from(*exp).ok().and_then(|exp| base.checked_pow(exp)),
    };
    result
        .map(Value::Int)
        .ok_or_else(|| NativeError::message("int.pow overflow"))
}

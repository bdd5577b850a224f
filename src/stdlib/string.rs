use super::{cons_list, expects, format::sprintf, ModuleBuilder};
use crate::{
    table::TableRef,
    value::{NativeError, NativeResult, Value},
};

/// String natives. Lengths and offsets count bytes.
pub(super) fn build() -> TableRef {
    ModuleBuilder::new()
        .function("length", length)
        .function("concat", concat)
        .function("slice", slice)
        .function("split", split)
        .function("indexOf", index_of)
        .function("startsWith", |args| match args {
            [Value::String(s), Value::String(prefix)] => Ok(Value::Bool(s.starts_with(&**prefix))),
            _ => Err(expects("string.startsWith", "string, string")),
        })
        .function("endsWith", |args| match args {
            [Value::String(s), Value::String(suffix)] => Ok(Value::Bool(s.ends_with(&**suffix))),
            _ => Err(expects("string.endsWith", "string, string")),
        })
        .function("toInt", |args| {
            let [Value::String(s)] = args else {
                return Err(expects("string.toInt", "string"));
            };
            s.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| NativeError::message("string.toInt invalid"))
        })
        .function("toFloat", |args| {
            let [Value::String(s)] = args else {
                return Err(expects("string.toFloat", "string"));
            };
            s.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| NativeError::message("string.toFloat invalid"))
        })
        .function("format", format)
        .finish()
}

fn length(args: &[Value]) -> NativeResult {
    let [Value::String(s)] = args else {
        return Err(expects("string.length", "string"));
    };
    Ok(Value::Int(s.len() as i64))
}

fn concat(args: &[Value]) -> NativeResult {
    let [Value::String(left), Value::String(right)] = args else {
        return Err(expects("string.concat", "string, string"));
    };
    Ok(Value::string(format!("{left}{right}")))
}

/// `slice(s, start, end)`: offsets past the end clamp to it.
fn slice(args: &[Value]) -> NativeResult {
    let [Value::String(s), Value::Int(start), Value::Int(end)] = args else {
        return Err(expects("string.slice", "string, int, int"));
    };
    if *start < 0 || *end < 0 || start > end {
        return Err(NativeError::message("string.slice invalid range"));
    }
    let bytes = s.as_bytes();
    let start = (*start as usize).min(bytes.len());
    let end = (*end as usize).min(bytes.len());
    Ok(Value::string(String::from_utf8_lossy(&bytes[start..end])))
}

fn split(args: &[Value]) -> NativeResult {
    let [Value::String(s), Value::String(separator)] = args else {
        return Err(expects("string.split", "string, string"));
    };
    if separator.is_empty() {
        return Err(NativeError::message("string.split empty separator"));
    }
    let parts: Vec<Value> = s.split(&**separator).map(Value::string).collect();
    Ok(cons_list(parts))
}

fn index_of(args: &[Value]) -> NativeResult {
    let [Value::String(s), Value::String(needle)] = args else {
        return Err(expects("string.indexOf", "string, string"));
    };
    Ok(Value::Int(s.find(&**needle).map_or(-1, |idx| idx as i64)))
}

fn format(args: &[Value]) -> NativeResult {
    let [Value::String(fmt), rest @ ..] = args else {
        return Err(expects("string.format", "string, ..."));
    };
    Ok(Value::string(sprintf(fmt, rest)?))
}

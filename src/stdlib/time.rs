use std::{
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use super::{expects, ModuleBuilder};
use crate::{
    table::TableRef,
    value::{NativeError, NativeResult, Value},
};

pub(super) fn build(started: Instant) -> TableRef {
    ModuleBuilder::new()
        .function("now", now)
        .function("monotonic", move |args| monotonic(started, args))
        .function("sleep", sleep)
        .finish()
}

/// Wall-clock milliseconds since the Unix epoch.
fn now(args: &[Value]) -> NativeResult {
    if !args.is_empty() {
        return Err(expects("time.now", ""));
    }
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| NativeError::message("time.now failed"))?;
    Ok(Value::Int(elapsed.as_millis() as i64))
}

/// Milliseconds since the interpreter started.
fn monotonic(started: Instant, args: &[Value]) -> NativeResult {
    if !args.is_empty() {
        return Err(expects("time.monotonic", ""));
    }
    Ok(Value::Int(started.elapsed().as_millis() as i64))
}

fn sleep(args: &[Value]) -> NativeResult {
    let [Value::Int(ms)] = args else {
        return Err(expects("time.sleep", "int"));
    };
    let ms = u64::try_from(*ms).map_err(|_| NativeError::message("time.sleep expects non-negative"))?;
    thread::sleep(Duration::from_millis(ms));
    Ok(Value::Null)
}

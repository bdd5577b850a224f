use std::env;

use super::{cons_list, expects, ModuleBuilder};
use crate::{
    diagnostics::ProtolexError,
    table::{Table, TableRef},
    value::{NativeError, NativeResult, Value},
};

pub(super) fn build(args: &[String]) -> TableRef {
    ModuleBuilder::new()
        .value("args", cons_list(args.iter().map(Value::string)))
        .value("env", environment())
        .function("cwd", cwd)
        .function("platform", platform)
        .function("exit", exit)
        .finish()
}

fn environment() -> Value {
    let mut table = Table::new();
    for (key, value) in env::vars_os() {
        table.insert_field(&key.to_string_lossy(), Value::string(value.to_string_lossy()));
    }
    table.freeze();
    Value::table(table)
}

fn cwd(args: &[Value]) -> NativeResult {
    if !args.is_empty() {
        return Err(expects("sys.cwd", ""));
    }
    let dir = env::current_dir().map_err(|_| NativeError::message("sys.cwd failed"))?;
    Ok(Value::string(dir.display().to_string()))
}

fn platform(args: &[Value]) -> NativeResult {
    if !args.is_empty() {
        return Err(expects("sys.platform", ""));
    }
    let name = if cfg!(target_os = "macos") {
        "darwin"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    };
    Ok(Value::string(name))
}

/// Ends the program through the fatal channel so the host picks the status.
fn exit(args: &[Value]) -> NativeResult {
    let Some(code) = exit_status(args) else {
        return Err(expects("sys.exit", "int"));
    };
    Err(NativeError::Fatal(ProtolexError::Exit(i32::from(code))))
}

/// Process statuses are a single byte; anything else is rejected.
fn exit_status(args: &[Value]) -> Option<u8> {
    match args {
        [Value::Int(code)] => u8::try_from(*code).ok(),
        _ => None,
    }
}

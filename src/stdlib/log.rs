use super::{expects, ModuleBuilder};
use crate::{
    table::TableRef,
    value::{NativeResult, Value},
};

/// `log.info` prints to stdout, `log.warn` and `log.error` to stderr.
pub(super) fn build() -> TableRef {
    ModuleBuilder::new()
        .function("info", |args| {
            let [value] = args else {
                return Err(expects("log.info", "value"));
            };
            println!("{value}");
            Ok(Value::Null)
        })
        .function("warn", |args| to_stderr("log.warn", args))
        .function("error", |args| to_stderr("log.error", args))
        .finish()
}

fn to_stderr(name: &str, args: &[Value]) -> NativeResult {
    let [value] = args else {
        return Err(expects(name, "value"));
    };
    eprintln!("{value}");
    Ok(Value::Null)
}

//! Native prelude and the built-in `runtime/*` modules.

use std::{collections::HashMap, rc::Rc, time::Instant};

use crate::{
    config::ExecutionContext,
    table::{Table, TableRef},
    value::{NativeError, NativeResult, Value},
};

mod float;
mod format;
mod int;
mod io;
mod log;
mod math;
mod prelude;
mod string;
mod sys;
mod time;

pub use prelude::install as install_prelude;

const BUILTIN_MODULES: [&str; 8] = [
    "io", "time", "sys", "log", "string", "int", "float", "math",
];

/// Built-in modules of one interpreter. Each is built on first import and
/// the same frozen table is handed out afterwards.
pub struct ModuleRegistry {
    started: Instant,
    args: Vec<String>,
    loaded: HashMap<&'static str, TableRef>,
}

impl ModuleRegistry {
    pub fn new(context: &ExecutionContext) -> Self {
        let args = context
            .script_path
            .iter()
            .map(|path| path.display().to_string())
            .chain(context.args.iter().cloned())
            .collect();
        Self {
            started: Instant::now(),
            args,
            loaded: HashMap::new(),
        }
    }

    /// Looks up `runtime/<name>` (optionally suffixed `.plx`).
    pub fn resolve(&mut self, path: &str) -> Option<TableRef> {
        let name = builtin_name(path)?;
        if let Some(module) = self.loaded.get(name) {
            return Some(Rc::clone(module));
        }
        let module = match name {
            "io" => io::build(),
            "time" => time::build(self.started),
            "sys" => sys::build(&self.args),
            "log" => log::build(),
            "string" => string::build(),
            "int" => int::build(),
            "float" => float::build(),
            _ => math::build(),
        };
        self.loaded.insert(name, Rc::clone(&module));
        Some(module)
    }
}

fn builtin_name(path: &str) -> Option<&'static str> {
    let name = path.strip_prefix("runtime/")?;
    let name = name.strip_suffix(".plx").unwrap_or(name);
    BUILTIN_MODULES.iter().copied().find(|builtin| *builtin == name)
}

/// Assembles a module table; `finish` freezes it.
struct ModuleBuilder {
    table: Table,
}

impl ModuleBuilder {
    fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }

    fn function(
        self,
        name: &'static str,
        callback: impl Fn(&[Value]) -> NativeResult + 'static,
    ) -> Self {
        self.value(name, Value::native(name, callback))
    }

    fn value(mut self, name: &str, value: Value) -> Self {
        self.table.insert_field(name, value);
        self
    }

    fn finish(mut self) -> TableRef {
        self.table.freeze();
        self.table.into_ref()
    }
}

/// Argument validation failure, rendered as `<name> expects (<signature>)`.
fn expects(name: &str, signature: &str) -> NativeError {
    NativeError::message(format!("{name} expects ({signature})"))
}

/// Builds a frozen cons list `{isNil, head, tail}` ending in `{isNil = true}`.
fn cons_list<I>(items: I) -> Value
where
    I: IntoIterator<Item = Value>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut nil = Table::new();
    nil.insert_field("isNil", Value::Bool(true));
    nil.freeze();
    items.into_iter().rev().fold(Value::table(nil), |tail, head| {
        let mut node = Table::new();
        node.insert_field("isNil", Value::Bool(false));
        node.insert_field("head", head);
        node.insert_field("tail", tail);
        node.freeze();
        Value::table(node)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_accept_plx_suffix() {
        assert_eq!(builtin_name("runtime/io"), Some("io"));
        assert_eq!(builtin_name("runtime/math.plx"), Some("math"));
        assert_eq!(builtin_name("runtime/nope"), None);
        assert_eq!(builtin_name("io"), None);
    }

    #[test]
    fn modules_are_cached_by_identity() {
        let mut registry = ModuleRegistry::new(&ExecutionContext::default());
        let first = registry.resolve("runtime/int").unwrap();
        let second = registry.resolve("runtime/int.plx").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert!(first.borrow().is_frozen());
    }
}

//! Prototype tables: the language's only composite value.
//!
//! A table is a key/value map with an optional single prototype consulted on
//! lookup misses. Frozen tables reject writes unless a surrounding `mutate`
//! has raised their thaw depth.

use std::{cell::RefCell, collections::HashSet, rc::Rc};

use indexmap::IndexMap;
use thiserror::Error;

use crate::value::{TableKey, Value};

pub type TableRef = Rc<RefCell<Table>>;

/// Key that is routed to prototype reassignment instead of being stored.
pub const PROTO_KEY: &str = "proto";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("object is frozen")]
    Frozen,
    #[error("invalid proto")]
    InvalidProto,
    #[error("prototype cycle")]
    PrototypeCycle,
    #[error("invalid key")]
    InvalidKey,
    #[error("cannot undefine proto")]
    ProtectedKey,
}

#[derive(Default)]
pub struct Table {
    entries: IndexMap<TableKey, Value>,
    proto: Option<TableRef>,
    frozen: bool,
    thaw_depth: u32,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_ref(self) -> TableRef {
        Rc::new(RefCell::new(self))
    }

    pub fn new_ref() -> TableRef {
        Self::new().into_ref()
    }

    pub fn proto(&self) -> Option<TableRef> {
        self.proto.clone()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn thaw_depth(&self) -> u32 {
        self.thaw_depth
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn can_mutate(&self) -> bool {
        !self.frozen || self.thaw_depth > 0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_local(&self, key: &Value) -> Option<Value> {
        let key = TableKey::from_value(key)?;
        self.entries.get(&key).cloned()
    }

    pub fn has_local(&self, key: &Value) -> bool {
        TableKey::from_value(key).is_some_and(|key| self.entries.contains_key(&key))
    }

    /// Guarded write. `Undefined` is neither a valid key nor a storable value.
    pub fn set(&mut self, key: &Value, value: Value) -> Result<(), TableError> {
        if !self.can_mutate() {
            return Err(TableError::Frozen);
        }
        let key = TableKey::from_value(key).ok_or(TableError::InvalidKey)?;
        if matches!(value, Value::Undefined) {
            return Err(TableError::InvalidKey);
        }
        self.entries.insert(key, value);
        Ok(())
    }

    /// Unguarded string-keyed write used while the host assembles a table.
    pub(crate) fn insert_field(&mut self, key: &str, value: Value) {
        self.entries.insert(TableKey::from(key), value);
    }

    /// Guarded removal. Removing an absent key succeeds.
    pub fn delete(&mut self, key: &Value) -> Result<(), TableError> {
        if key.as_str() == Some(PROTO_KEY) {
            return Err(TableError::ProtectedKey);
        }
        if !self.can_mutate() {
            return Err(TableError::Frozen);
        }
        if let Some(key) = TableKey::from_value(key) {
            self.entries.shift_remove(&key);
        }
        Ok(())
    }

    /// Insertion-ordered snapshot of the local entries.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.to_value(), value.clone()))
            .collect()
    }

    fn table_values(&self) -> impl Iterator<Item = &TableRef> {
        self.entries.values().filter_map(Value::as_table)
    }
}

/// Looks `key` up on `table`, then along its prototype chain.
pub fn lookup(table: &TableRef, key: &Value) -> Value {
    let Some(key) = TableKey::from_value(key) else {
        return Value::Undefined;
    };
    let mut current = Some(Rc::clone(table));
    while let Some(level) = current {
        let level = level.borrow();
        if let Some(value) = level.entries.get(&key) {
            return value.clone();
        }
        current = level.proto.clone();
    }
    Value::Undefined
}

/// Replaces the prototype of `table` with `proto` (`null` clears it).
///
/// A candidate whose chain already reaches `table` is rejected with
/// [`TableError::PrototypeCycle`] before anything changes.
pub fn set_proto(table: &TableRef, proto: &Value) -> Result<(), TableError> {
    let candidate = match proto {
        Value::Null => None,
        Value::Table(candidate) => Some(candidate),
        _ => return Err(TableError::InvalidProto),
    };
    if let Some(candidate) = candidate {
        if has_proto_cycle(table, candidate) {
            return Err(TableError::PrototypeCycle);
        }
    }
    table.borrow_mut().proto = candidate.cloned();
    Ok(())
}

fn has_proto_cycle(table: &TableRef, candidate: &TableRef) -> bool {
    let mut current = Some(Rc::clone(candidate));
    while let Some(level) = current {
        if Rc::ptr_eq(&level, table) {
            return true;
        }
        current = level.borrow().proto.clone();
    }
    false
}

/// Raises the thaw depth of `root` and of every table reachable from it
/// through stored values. Each table is visited once.
///
/// Returns the thawed tables. Pass them to [`refreeze`] when the scope ends.
pub fn thaw(root: &TableRef) -> Vec<TableRef> {
    let mut visited: HashSet<*const RefCell<Table>> = HashSet::new();
    let mut thawed = Vec::new();
    let mut worklist = vec![Rc::clone(root)];
    while let Some(table) = worklist.pop() {
        if !visited.insert(Rc::as_ptr(&table)) {
            continue;
        }
        {
            let mut inner = table.borrow_mut();
            inner.thaw_depth += 1;
            worklist.extend(inner.table_values().cloned());
        }
        thawed.push(table);
    }
    thawed
}

/// Lowers the thaw depth of exactly the tables a prior [`thaw`] returned.
pub fn refreeze(thawed: &[TableRef]) {
    for table in thawed {
        let mut table = table.borrow_mut();
        table.thaw_depth = table.thaw_depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_keys_with_integral_values_share_int_slots() {
        let mut table = Table::new();
        table.set(&Value::Int(1), Value::string("one")).unwrap();
        assert_eq!(table.get_local(&Value::Float(1.0)), Some(Value::string("one")));
        assert!(!table.has_local(&Value::Float(1.5)));
    }

    #[test]
    fn thaw_walk_terminates_on_cyclic_values() {
        let a = Table::new_ref();
        let b = Table::new_ref();
        a.borrow_mut().set(&Value::from("b"), Value::Table(Rc::clone(&b))).unwrap();
        b.borrow_mut().set(&Value::from("a"), Value::Table(Rc::clone(&a))).unwrap();
        let thawed = thaw(&a);
        assert_eq!(thawed.len(), 2);
        assert_eq!(a.borrow().thaw_depth(), 1);
        assert_eq!(b.borrow().thaw_depth(), 1);
        refreeze(&thawed);
        assert_eq!(a.borrow().thaw_depth(), 0);
        assert_eq!(b.borrow().thaw_depth(), 0);
    }
}

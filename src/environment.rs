use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::value::Value;

pub type EnvironmentRef = Rc<RefCell<Environment>>;

/// One lexical scope; lookups fall back to the parent chain.
#[derive(Default)]
pub struct Environment {
    parent: Option<EnvironmentRef>,
    bindings: IndexMap<String, Value>,
}

impl Environment {
    pub fn new() -> EnvironmentRef {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn with_parent(parent: EnvironmentRef) -> EnvironmentRef {
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            bindings: IndexMap::new(),
        }))
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Rebinds `name` in the nearest scope that defines it, or defines it in
    /// `env` itself when no scope does.
    pub fn assign(env: &EnvironmentRef, name: &str, value: Value) {
        let mut current = Some(Rc::clone(env));
        while let Some(scope) = current {
            if let Some(slot) = scope.borrow_mut().bindings.get_mut(name) {
                *slot = value;
                return;
            }
            current = scope.borrow().parent.clone();
        }
        env.borrow_mut().define(name, value);
    }

    pub fn get(env: &EnvironmentRef, name: &str) -> Option<Value> {
        let mut current = Some(Rc::clone(env));
        while let Some(scope) = current {
            if let Some(value) = scope.borrow().bindings.get(name) {
                return Some(value.clone());
            }
            current = scope.borrow().parent.clone();
        }
        None
    }
}

//! DICE Environment
//!
//! Lexically scoped name-to-value frames with a parent link. Frames are
//! shared across parallel branches, so the chain is `Arc<Mutex<..>>`
//! rather than `Rc<RefCell<..>>`. Locks are only ever taken child first,
//! parent second, and the chain has no cycles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::ast::Block;
use crate::runtime::value::Value;

/// Shared handle to a scope frame
pub type EnvRef = Arc<Mutex<Env>>;

/// Environment for name bindings
#[derive(Debug)]
pub struct Env {
    /// Current scope bindings
    bindings: HashMap<String, Value>,

    /// Enclosing scope
    parent: Option<EnvRef>,
}

impl Env {
    /// Create a new root environment
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            parent: None,
        }
    }

    /// Create a new scope with parent
    pub fn with_parent(parent: EnvRef) -> Self {
        Self {
            bindings: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Create a shared handle
    pub fn wrap(self) -> EnvRef {
        Arc::new(Mutex::new(self))
    }

    /// Define a binding in the current scope
    pub fn define(&mut self, name: String, value: Value) {
        self.bindings.insert(name, value);
    }

    /// Get a value (searches enclosing scopes)
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.get(name) {
            Some(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.lock().unwrap().get(name)
        } else {
            None
        }
    }

    /// Update a value in the scope where it is bound.
    /// Returns false when the name is bound nowhere in the chain.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        if self.bindings.contains_key(name) {
            self.bindings.insert(name.to_string(), value);
            true
        } else if let Some(parent) = &self.parent {
            parent.lock().unwrap().set(name, value)
        } else {
            false
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

/// User function value: a closure over its defining environment
#[derive(Debug)]
pub struct FuncDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
    pub closure: EnvRef,
    /// Set when the definition was annotated with `@timed`; every
    /// invocation then reports its duration under this label.
    pub timed: Option<String>,
}

impl FuncDef {
    pub fn new(
        name: String,
        params: Vec<String>,
        body: Block,
        closure: EnvRef,
        timed: Option<String>,
    ) -> Self {
        Self {
            name,
            params,
            body,
            closure,
            timed,
        }
    }
}

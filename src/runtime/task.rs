//! DICE Task Units
//!
//! `taskunit` definitions, their instances, and the stepwise-synchronized
//! group produced by `parallelTasks(...)`. Groups are shared handles:
//! clones see the same members and the same cursor.

use std::sync::{Arc, Mutex};

use crate::ast::Block;
use crate::runtime::env::{Env, EnvRef};

/// A `taskunit` definition: an ordered table of zero-arg methods plus
/// the scope it was defined in.
#[derive(Debug)]
pub struct TaskUnit {
    pub name: String,
    methods: Vec<(String, Block)>,
    env: EnvRef,
}

impl TaskUnit {
    pub fn new(name: String, methods: Vec<(String, Block)>, env: EnvRef) -> Self {
        Self { name, methods, env }
    }

    /// Look up a method body by name
    pub fn method(&self, name: &str) -> Option<&Block> {
        self.methods
            .iter()
            .find(|(method, _)| method == name)
            .map(|(_, body)| body)
    }
}

/// A constructed task unit. Each instance carries its own environment,
/// a child of the defining scope.
#[derive(Debug, Clone)]
pub struct TaskInstance {
    pub unit: Arc<TaskUnit>,
    pub env: EnvRef,
}

impl TaskInstance {
    pub fn new(unit: Arc<TaskUnit>) -> Self {
        let env = Env::with_parent(unit.env.clone()).wrap();
        Self { unit, env }
    }

    /// Body of `step<n>`, if this unit defines it
    pub fn step_body(&self, step: usize) -> Option<&Block> {
        self.unit.method(&format!("step{}", step))
    }
}

impl PartialEq for TaskInstance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.env, &other.env)
    }
}

/// The group value returned by `parallelTasks(...)`: a member list and a
/// step cursor starting at 1.
#[derive(Debug, Clone)]
pub struct TaskGroup {
    members: Arc<Vec<TaskInstance>>,
    cursor: Arc<Mutex<usize>>,
}

impl TaskGroup {
    pub fn new(members: Vec<TaskInstance>) -> Self {
        Self {
            members: Arc::new(members),
            cursor: Arc::new(Mutex::new(1)),
        }
    }

    pub fn members(&self) -> &[TaskInstance] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Current step number (1-based)
    pub fn step(&self) -> usize {
        *self.cursor.lock().unwrap()
    }

    /// Move the cursor to the next step
    pub fn advance(&self) {
        *self.cursor.lock().unwrap() += 1;
    }
}

impl PartialEq for TaskGroup {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.members, &other.members)
    }
}

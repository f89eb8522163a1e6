use std::collections::HashMap;

use log::debug;

use crate::value::Value;

/// What a name is bound to: either a finished value or an expression body
/// that is re-parsed and re-evaluated on every lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(Value),
    Expr(String),
}

impl From<Value> for Binding {
    fn from(v: Value) -> Self {
        Binding::Value(v)
    }
}

impl From<&str> for Binding {
    fn from(s: &str) -> Self {
        Binding::Expr(s.to_string())
    }
}

impl From<String> for Binding {
    fn from(s: String) -> Self {
        Binding::Expr(s)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    binding: Binding,
    immutable: bool,
}

/// A flat, case-sensitive name table. Built-in constants are installed as
/// immutable slots; user assignments can neither replace nor remove them.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    slots: HashMap<String, Slot>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`. Returns `false` (and leaves the table untouched) when
    /// the name is already bound immutably.
    pub fn set(&mut self, name: &str, binding: Binding, immutable: bool) -> bool {
        if let Some(slot) = self.slots.get(name) {
            if slot.immutable {
                debug!("refusing to rebind immutable name '{}'", name);
                return false;
            }
        }
        self.slots
            .insert(name.to_string(), Slot { binding, immutable });
        true
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.slots.get(name).map(|s| &s.binding)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn is_immutable(&self, name: &str) -> bool {
        self.slots.get(name).is_some_and(|s| s.immutable)
    }

    /// Remove a mutable binding. Returns `false` for missing or immutable
    /// names.
    pub fn unset(&mut self, name: &str) -> bool {
        match self.slots.get(name) {
            None => false,
            Some(slot) if slot.immutable => {
                debug!("refusing to unset immutable name '{}'", name);
                false
            }
            Some(_) => {
                self.slots.remove(name);
                true
            }
        }
    }

    /// All bound names starting with `prefix`, sorted. An empty prefix
    /// lists everything.
    pub fn names(&self, prefix: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .slots
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        out.sort();
        out
    }
}

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::runtime::value::Value;

/// A lexical scope. Environments form a tree: many children may share one
/// parent (sibling calls closing over the same scope), and each environment
/// keeps a counted reference to its parent while the parent never references
/// children, so the chain cannot cycle.
pub struct Environment {
    parent: Option<Rc<Environment>>,
    values: RefCell<HashMap<String, Value>>,
    depth: usize,
}

impl Environment {
    /// A root scope with no parent. Also used for record instances, whose
    /// field table must never fall through to an enclosing scope.
    pub fn root() -> Rc<Self> {
        Rc::new(Self {
            parent: None,
            values: RefCell::new(HashMap::new()),
            depth: 0,
        })
    }

    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        let depth = parent.depth + 1;
        Rc::new(Self {
            parent: Some(parent),
            values: RefCell::new(HashMap::new()),
            depth,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Binds a new name in this scope. Returns false when the name is
    /// already present here; shadowing belongs in a child scope.
    pub fn declare(&self, name: &str, value: Value) -> bool {
        let mut values = self.values.borrow_mut();
        if values.contains_key(name) {
            return false;
        }
        values.insert(name.to_string(), value);
        true
    }

    /// Rebinds an existing name, searching outward through ancestors.
    /// Returns false if the name is bound nowhere in the chain.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut env = self;
        loop {
            let mut values = env.values.borrow_mut();
            if let Some(slot) = values.get_mut(name) {
                *slot = value;
                return true;
            }
            drop(values);
            match &env.parent {
                Some(parent) => env = parent,
                None => return false,
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut env = self;
        loop {
            if let Some(value) = env.values.borrow().get(name) {
                return Some(value.clone());
            }
            match &env.parent {
                Some(parent) => env = parent,
                None => return None,
            }
        }
    }

    fn ancestor(self: &Rc<Self>, hops: usize) -> Option<Rc<Environment>> {
        let mut env = Rc::clone(self);
        for _ in 0..hops {
            let parent = env.parent.clone()?;
            env = parent;
        }
        Some(env)
    }

    /// Direct read at a resolver-computed hop distance, no chain search.
    pub fn get_at(self: &Rc<Self>, hops: usize, name: &str) -> Option<Value> {
        self.ancestor(hops)?.values.borrow().get(name).cloned()
    }

    /// Direct write at a resolver-computed hop distance.
    pub fn assign_at(self: &Rc<Self>, hops: usize, name: &str, value: Value) -> bool {
        match self.ancestor(hops) {
            Some(env) => {
                let mut values = env.values.borrow_mut();
                match values.get_mut(name) {
                    Some(slot) => { *slot = value; true }
                    None => false,
                }
            }
            None => false,
        }
    }
}

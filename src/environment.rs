use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One scope of bindings plus a link to the scope that encloses it.
///
/// Environments are shared (`Rc<RefCell<_>>`): a closure keeps the scope it
/// was defined in alive and sees later writes to it.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up here, then along the enclosing chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            Some(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            None
        }
    }

    /// Overwrite the nearest existing binding of `name`.  Returns `false`
    /// when no scope on the chain declares it.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            true
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            false
        }
    }

    /// The environment exactly `distance` links up the chain from `env`.
    pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Option<Rc<RefCell<Environment>>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Read `name` from the scope `distance` hops up, without searching further.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
        let scope = Environment::ancestor(env, distance)?;
        let value = scope.borrow().values.get(name).cloned();
        value
    }

    /// Write `name` in the scope `distance` hops up.  Returns `false` if that
    /// scope does not declare it.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) -> bool {
        let Some(scope) = Environment::ancestor(env, distance) else {
            return false;
        };

        let mut scope = scope.borrow_mut();
        let Some(slot) = scope.values.get_mut(name) else {
            return false;
        };

        *slot = value;
        true
    }
}

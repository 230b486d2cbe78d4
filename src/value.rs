//! Runtime values shared by the evaluator and the environment.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::Environment;

/// Name of the method run when a class is called.
pub const INITIALIZER: &str = "init";

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Callable(Callable),
    Instance(Rc<Instance>),
}

impl Value {
    /// `nil` and `false` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl PartialEq for Value {
    /// Same‑kind comparison only; callables and instances compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.same(b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialOrd for Value {
    /// Ordering exists only between two values of the same primitive kind.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Nil, Value::Nil) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => fmt_number(*n, f),

            Value::String(s) => write!(f, "{}", s),

            Value::Callable(c) => write!(f, "{}", c),

            Value::Instance(i) => write!(f, "{} instance", i.class.name),
        }
    }
}

/// Integral numbers print without a fraction (`3`, `-0`), the rest use the
/// shortest round‑trip form.  Magnitudes from 1e21 up or below 1e-6 switch
/// to exponent form (`1e300`, `2.5e-7`).
fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let magnitude = n.abs();
    if n.is_finite() && n != 0.0 && !(1e-6..1e21).contains(&magnitude) {
        return write!(f, "{:e}", n);
    }

    if n.fract() == 0.0 && magnitude < 1e15 {
        if n == 0.0 && n.is_sign_negative() {
            return write!(f, "-0");
        }

        let mut buf = itoa::Buffer::new();
        f.write_str(buf.format(n as i64))
    } else if n.fract() == 0.0 {
        write!(f, "{:.0}", n)
    } else {
        write!(f, "{}", n)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Callables
// ─────────────────────────────────────────────────────────────────────────────

/// Everything that can appear before `(...)`.
#[derive(Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Native(Rc<NativeFunction>),
    BoundMethod(Rc<BoundMethod>),
    Class(Rc<Class>),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(function) => function.arity(),
            Callable::Native(native) => native.arity,
            Callable::BoundMethod(bound) => bound.method.arity(),
            Callable::Class(class) => class.arity(),
        }
    }

    fn same(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            (Callable::BoundMethod(a), Callable::BoundMethod(b)) => {
                Rc::ptr_eq(&a.receiver, &b.receiver) && Rc::ptr_eq(&a.method, &b.method)
            }
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(function) => write!(f, "{}", function),
            Callable::Native(native) => write!(f, "<native fn {}>", native.name),
            Callable::BoundMethod(bound) => write!(f, "{}", bound.method),
            Callable::Class(class) => write!(f, "{}", class.name),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self)
    }
}

/// A user function: declaration plus the environment it closes over.
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
    pub is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.arity()
    }

    pub fn name(&self) -> Option<&str> {
        self.declaration.name()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "<fn {}>", name),
            None => write!(f, "<fn>"),
        }
    }
}

/// Host function callable from scripts.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: Box<dyn Fn(&[Value]) -> Result<Value, String>>,
}

/// A method looked up on an instance, remembering that instance as `this`.
pub struct BoundMethod {
    pub receiver: Rc<Instance>,
    pub method: Rc<Function>,
}

pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<Function>>,
}

impl Class {
    /// Own methods first, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    /// Calling a class takes as many arguments as its initializer.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER)
            .map_or(0, |initializer| initializer.arity())
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    pub fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Field first, then a method bound to this instance.
    pub fn get(self: &Rc<Self>, name: &str) -> Option<Value> {
        if let Some(value) = self.fields.borrow().get(name) {
            return Some(value.clone());
        }

        self.class.find_method(name).map(|method| {
            Value::Callable(Callable::BoundMethod(Rc::new(BoundMethod {
                receiver: Rc::clone(self),
                method,
            })))
        })
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.class.name)
    }
}

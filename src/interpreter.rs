//! Tree‑walking evaluator.
//!
//! Executes resolved statements against a chain of shared environments.
//! A statement either completes, raises a `return` that unwinds to the
//! nearest call, or fails with a runtime error that aborts the run; both of
//! the latter travel as the `Err` side of [`IResult`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error;

use crate::ast::{BinaryOp, ClassDecl, Expr, ExprId, FunctionDecl, Identifier, LiteralValue, LogicalOp, Stmt, UnaryOp};
use crate::config::Config;
use crate::environment::Environment;
use crate::error::LoxError;
use crate::natives::{define_natives, Clock, MonotonicClock};
use crate::output::Transcript;
use crate::resolver::Resolutions;
use crate::stack::ensure_sufficient_stack;
use crate::value::{BoundMethod, Callable, Class, Function, Instance, Value, INITIALIZER};

#[derive(Error, Debug)]
pub enum InterpretError {
    #[error(transparent)]
    RuntimeError(#[from] LoxError),

    #[error("Return signal with value: {0}")]
    ReturnSignal(Value),
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, InterpretError>;

fn runtime<T>(line: usize, message: impl Into<String>) -> IResult<T> {
    Err(InterpretError::RuntimeError(LoxError::runtime(line, message)))
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    output: Transcript,
    clock: Rc<dyn Clock>,
    config: Config,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Config::default(), Transcript::new(), Rc::new(MonotonicClock::new()))
    }
}

impl Interpreter {
    /// Creates a new Interpreter with the native functions defined as globals.
    pub fn new(config: Config, output: Transcript, clock: Rc<dyn Clock>) -> Self {
        info!("Initializing Interpreter");

        let globals = Self::fresh_globals(&clock);

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
            clock,
            config,
            depth: 0,
        }
    }

    fn fresh_globals(clock: &Rc<dyn Clock>) -> Rc<RefCell<Environment>> {
        let mut globals = Environment::new();
        define_natives(&mut globals, Rc::clone(clock));
        Rc::new(RefCell::new(globals))
    }

    /// Drop every global binding and reinstall the natives.  Output and
    /// configuration are kept.
    pub fn reset(&mut self) {
        info!("Resetting global environment");

        self.globals = Self::fresh_globals(&self.clock);
        self.environment = Rc::clone(&self.globals);
        self.locals.clear();
        self.depth = 0;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output(&self) -> &Transcript {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut Transcript {
        &mut self.output
    }

    /// Record the resolver's binding distances for the next run.
    pub fn resolve(&mut self, locals: Resolutions) {
        debug!("Noting {} resolved local(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Value of a global binding, if any.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name)
    }

    /// Interprets a list of statements (a "program"), stopping at the first
    /// runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), LoxError> {
        debug!("Interpreting {} statements", statements.len());

        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));

        // A failure deep inside a call leaves these pointing into the call.
        self.environment = Rc::clone(&self.globals);
        self.depth = 0;

        let flushed = self.output.flush();

        match result {
            Ok(()) => {
                info!("Interpretation completed successfully");
                flushed.map_err(LoxError::from)
            }
            Err(InterpretError::RuntimeError(e)) => Err(e),
            // The resolver rejects top-level `return`.
            Err(InterpretError::ReturnSignal(_)) => Ok(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<()> {
        ensure_sufficient_stack(|| self.execute_kind(stmt))
    }

    fn execute_kind(&mut self, stmt: &Stmt) -> IResult<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                debug!("Printing value: {}", value);

                self.output
                    .write(&format!("{}\n", value))
                    .map_err(|e| LoxError::runtime(expr.line(), format!("Failed to write output: {}", e)))?;
                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.name, value);
                self.environment.borrow_mut().define(&name.name, value);
                Ok(())
            }

            Stmt::Block(statements) => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(scope)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
                Ok(())
            }

            Stmt::Function(decl) => {
                let function = self.make_function(decl, false);
                if let Some(name) = decl.name() {
                    debug!("Defining function '{}'", name);
                    self.environment.borrow_mut().define(name, function);
                }
                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Err(InterpretError::ReturnSignal(value))
            }

            Stmt::Class(class) => self.execute_class(class),
        }
    }

    /// Run `statements` inside `environment`, restoring the current one afterwards
    /// whether they complete, return or fail.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> IResult<()> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));
        self.environment = previous;
        result
    }

    fn execute_class(&mut self, class: &ClassDecl) -> IResult<()> {
        debug!("Defining class '{}'", class.name.name);

        let superclass = match &class.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Callable(Callable::Class(superclass)) => Some(superclass),
                _ => return runtime(expr.line(), "Superclass must be a class."),
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&class.name.name, Value::Nil);

        // Methods of a subclass close over a scope binding `super`.
        let enclosing = superclass.as_ref().map(|superclass| {
            let mut scope = Environment::with_enclosing(Rc::clone(&self.environment));
            scope.define("super", Value::Callable(Callable::Class(Rc::clone(superclass))));
            std::mem::replace(&mut self.environment, Rc::new(RefCell::new(scope)))
        });

        let methods: HashMap<String, Rc<Function>> = class
            .methods
            .iter()
            .filter_map(|method| {
                let name = method.name()?;
                let function = Function::new(
                    Rc::clone(method),
                    Rc::clone(&self.environment),
                    name == INITIALIZER,
                );
                Some((name.to_string(), Rc::new(function)))
            })
            .collect();

        if let Some(enclosing) = enclosing {
            self.environment = enclosing;
        }

        let value = Value::Callable(Callable::Class(Rc::new(Class {
            name: class.name.name.clone(),
            superclass,
            methods,
        })));

        self.environment
            .borrow_mut()
            .assign(&class.name.name, value);

        Ok(())
    }

    fn make_function(&self, decl: &Rc<FunctionDecl>, is_initializer: bool) -> Value {
        Value::Callable(Callable::Function(Rc::new(Function::new(
            Rc::clone(decl),
            Rc::clone(&self.environment),
            is_initializer,
        ))))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        ensure_sufficient_stack(|| self.evaluate_kind(expr))
    }

    fn evaluate_kind(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::from(s.as_str()),
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping { expression, .. } => {
                let mut inner: &Expr = expression;
                while let Expr::Grouping { expression, .. } = inner {
                    inner = expression.as_ref();
                }
                self.evaluate(inner)
            }

            Expr::Unary {
                operator,
                right,
                line,
            } => self.evaluate_unary(*operator, right, *line),

            Expr::Binary {
                left,
                operator,
                right,
                line,
            } => self.evaluate_binary(left, *operator, right, *line),

            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.evaluate(left)?;
                let short_circuit = match operator {
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::And => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                let assigned = match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, &name.name, value.clone())
                    }
                    None => self.globals.borrow_mut().assign(&name.name, value.clone()),
                };

                if !assigned {
                    return runtime(name.line, format!("Undefined variable '{}'.", name.name));
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                arguments,
                line,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                let Value::Callable(callable) = callee else {
                    return runtime(*line, "Can only call functions and classes.");
                };

                if args.len() != callable.arity() {
                    return runtime(
                        *line,
                        format!(
                            "Expected {} arguments but got {}.",
                            callable.arity(),
                            args.len()
                        ),
                    );
                }

                self.call(&callable, args, *line)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(&name.name).map_or_else(
                    || runtime(name.line, format!("Undefined property '{}'.", name.name)),
                    Ok,
                ),
                _ => runtime(name.line, "Only instances have properties."),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return runtime(name.line, "Only instances have fields.");
                };

                let value = self.evaluate(value)?;
                instance.set(&name.name, value.clone());
                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::Function(decl) => Ok(self.make_function(decl, false)),
        }
    }

    fn evaluate_unary(&mut self, operator: UnaryOp, right: &Expr, line: usize) -> IResult<Value> {
        let right = self.evaluate(right)?;

        match (operator, right) {
            (UnaryOp::Not, right) => Ok(Value::Bool(!right.is_truthy())),
            (UnaryOp::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
            (UnaryOp::Negate, _) => runtime(line, "Operand must be a number."),
        }
    }

    /// A chain such as `a + b - c` nests down its left side, so the left
    /// operands are collected in a loop and folded from the innermost out.
    fn evaluate_binary(
        &mut self,
        left: &Expr,
        operator: BinaryOp,
        right: &Expr,
        line: usize,
    ) -> IResult<Value> {
        let mut pending: Vec<(BinaryOp, &Expr, usize)> = Vec::new();
        let mut leftmost = left;
        while let Expr::Binary {
            left,
            operator,
            right,
            line,
        } = leftmost
        {
            pending.push((*operator, right.as_ref(), *line));
            leftmost = left.as_ref();
        }

        let mut value = self.evaluate(leftmost)?;
        for (operator, right, line) in pending.into_iter().rev() {
            let right = self.evaluate(right)?;
            value = binary(operator, &value, &right, line)?;
        }

        let right = self.evaluate(right)?;
        binary(operator, &value, &right, line)
    }

    fn look_up_variable(&self, id: ExprId, name: &Identifier) -> IResult<Value> {
        let value = match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.name),
            None => self.globals.borrow().get(&name.name),
        };

        value.map_or_else(
            || runtime(name.line, format!("Undefined variable '{}'.", name.name)),
            Ok,
        )
    }

    /// `super.method`: look the method up on the superclass of the class whose
    /// body contains the expression, and bind it to the current `this`.
    fn evaluate_super(&self, id: ExprId, keyword: &Identifier, method: &Identifier) -> IResult<Value> {
        let Some(&distance) = self.locals.get(&id) else {
            return runtime(keyword.line, "Can't use 'super' outside of a class.");
        };

        let superclass = Environment::get_at(&self.environment, distance, "super");
        // `this` lives in the scope just inside the one binding `super`.
        let receiver = distance
            .checked_sub(1)
            .and_then(|d| Environment::get_at(&self.environment, d, "this"));

        let (Some(Value::Callable(Callable::Class(superclass))), Some(Value::Instance(receiver))) =
            (superclass, receiver)
        else {
            return runtime(keyword.line, "Can't use 'super' outside of a method.");
        };

        match superclass.find_method(&method.name) {
            Some(method) => Ok(Value::Callable(Callable::BoundMethod(Rc::new(BoundMethod {
                receiver,
                method,
            })))),
            None => runtime(method.line, format!("Undefined property '{}'.", method.name)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Invokes a callable whose arity has already been checked.
    fn call(&mut self, callable: &Callable, args: Vec<Value>, line: usize) -> IResult<Value> {
        match callable {
            Callable::Native(native) => {
                debug!("Calling native function '{}'", native.name);

                (native.func)(&args).or_else(|e| {
                    runtime(line, format!("Native function '{}' failed: {}", native.name, e))
                })
            }

            Callable::Function(function) => {
                self.call_function(function, Rc::clone(&function.closure), args, line)
            }

            Callable::BoundMethod(bound) => self.call_bound(bound, args, line),

            Callable::Class(class) => {
                debug!("Instantiating class '{}'", class.name);

                let instance = Rc::new(Instance::new(Rc::clone(class)));

                if let Some(initializer) = class.find_method(INITIALIZER) {
                    let bound = BoundMethod {
                        receiver: Rc::clone(&instance),
                        method: initializer,
                    };
                    self.call_bound(&bound, args, line)?;
                }

                Ok(Value::Instance(instance))
            }
        }
    }

    fn call_bound(&mut self, bound: &BoundMethod, args: Vec<Value>, line: usize) -> IResult<Value> {
        let mut scope = Environment::with_enclosing(Rc::clone(&bound.method.closure));
        scope.define("this", Value::Instance(Rc::clone(&bound.receiver)));

        self.call_function(&bound.method, Rc::new(RefCell::new(scope)), args, line)
    }

    /// Run a user function body in a fresh scope enclosed by `closure`
    /// (the captured environment, never the caller's).
    fn call_function(
        &mut self,
        function: &Function,
        closure: Rc<RefCell<Environment>>,
        args: Vec<Value>,
        line: usize,
    ) -> IResult<Value> {
        ensure_sufficient_stack(|| self.call_function_body(function, closure, args, line))
    }

    fn call_function_body(
        &mut self,
        function: &Function,
        closure: Rc<RefCell<Environment>>,
        args: Vec<Value>,
        line: usize,
    ) -> IResult<Value> {
        if self.depth >= self.config.max_call_depth {
            return runtime(line, "Stack overflow.");
        }

        debug!("Calling {}", function);

        let mut scope = Environment::with_enclosing(Rc::clone(&closure));
        for (param, arg) in function.declaration.params.iter().zip(args) {
            scope.define(&param.name, arg);
        }

        self.depth += 1;
        let result = self.execute_block(&function.declaration.body, Rc::new(RefCell::new(scope)));
        self.depth -= 1;

        let value = match result {
            Ok(()) => Value::Nil,
            Err(InterpretError::ReturnSignal(value)) => value,
            Err(e) => return Err(e),
        };

        if function.is_initializer {
            // `init` always yields its receiver.
            return Ok(Environment::get_at(&closure, 0, "this").unwrap_or(value));
        }

        Ok(value)
    }
}

/// Apply an arithmetic, comparison or equality operator to two operands.
fn binary(operator: BinaryOp, left: &Value, right: &Value, line: usize) -> IResult<Value> {
    let value = match (operator, left, right) {
        (BinaryOp::Equal, l, r) => Value::Bool(l == r),
        (BinaryOp::NotEqual, l, r) => Value::Bool(l != r),

        (BinaryOp::Add, Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (BinaryOp::Add, Value::String(a), Value::String(b)) => {
            Value::String(format!("{}{}", a, b).into())
        }
        (BinaryOp::Add, _, _) => {
            return runtime(line, "Operands must be two numbers or two strings.")
        }

        (BinaryOp::Subtract, Value::Number(a), Value::Number(b)) => Value::Number(a - b),
        (BinaryOp::Multiply, Value::Number(a), Value::Number(b)) => Value::Number(a * b),
        // IEEE‑754: x / 0 is ±inf or NaN, not an error.
        (BinaryOp::Divide, Value::Number(a), Value::Number(b)) => Value::Number(a / b),
        (BinaryOp::Less, Value::Number(a), Value::Number(b)) => Value::Bool(a < b),
        (BinaryOp::LessEqual, Value::Number(a), Value::Number(b)) => Value::Bool(a <= b),
        (BinaryOp::Greater, Value::Number(a), Value::Number(b)) => Value::Bool(a > b),
        (BinaryOp::GreaterEqual, Value::Number(a), Value::Number(b)) => Value::Bool(a >= b),

        _ => return runtime(line, "Operands must be numbers."),
    };

    Ok(value)
}

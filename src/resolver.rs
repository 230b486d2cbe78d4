//! Static resolver pass.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<&str,bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, forward‑read in initializer, invalid
//!    `return`, misplaced `this`/`super`, inheritance cycles).  Errors are
//!    collected and the walk continues, so one pass reports all of them.
//! 3. Record, for *each* variable occurrence that binds to a local, how many
//!    scopes separate it from its declaration.  Occurrences absent from the
//!    table are globals, looked up by name at run time (which is what lets a
//!    function call another top‑level function declared after it).

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, Identifier, Stmt};
use crate::error::LoxError;
use crate::stack::ensure_sufficient_stack;
use crate::value::INITIALIZER;
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Hop counts for every locally bound variable occurrence.
pub type Resolutions = HashMap<ExprId, usize>;

/// What kind of function body are we in?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// What kind of class body are we in?  Used to validate `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances for locals.
pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    locals: Resolutions,
    errors: Vec<LoxError>,
    current_function: FunctionType,
    current_class: ClassType,
    /// class name → the declaration it currently names
    class_ids: HashMap<&'a str, usize>,
    /// declaration → the declaration its superclass named when it was declared
    superclasses: Vec<Option<usize>>,
}

impl<'a> Default for Resolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        info!("Resolver instantiated");
        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            errors: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            class_ids: HashMap::new(),
            superclasses: Vec::new(),
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(mut self, statements: &'a [Stmt]) -> Result<Resolutions, Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements);

        if self.errors.is_empty() {
            info!("Resolved {} local reference(s)", self.locals.len());
            Ok(self.locals)
        } else {
            info!("Resolve failed with {} error(s)", self.errors.len());
            Err(self.errors)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmts(&mut self, statements: &'a [Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &'a Stmt) {
        ensure_sufficient_stack(|| self.resolve_stmt_kind(stmt))
    }

    fn resolve_stmt_kind(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Class(class) => self.resolve_class(class),

            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // The name is visible *inside* its own body, for recursion.
                if let Some(name) = &decl.name {
                    self.declare(name);
                    self.define(name);
                }
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }
                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
        }
    }

    fn resolve_class(&mut self, class: &'a ClassDecl) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(&class.name);
        self.define(&class.name);

        let superclass_name = match &class.superclass {
            Some(Expr::Variable { name, .. }) => Some(name),
            _ => None,
        };
        self.declare_class(&class.name, superclass_name);

        if let Some(superclass) = &class.superclass {
            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.define_synthetic("super");
        }

        self.begin_scope();
        self.define_synthetic("this");

        for method in &class.methods {
            let kind = if method.name() == Some(INITIALIZER) {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind);
        }

        self.end_scope();

        if class.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    /// Give this class declaration an id, link it to the declaration its
    /// superclass names right now, and reject `class A < A` or any chain
    /// that leads back to it.
    ///
    /// Chains are followed by declaration rather than by name: after
    /// `class A {} class B < A {} class A < B {}` the second `A` descends
    /// from `B`, which descends from the first `A`, and that is not a cycle.
    fn declare_class(&mut self, class: &'a Identifier, superclass: Option<&'a Identifier>) {
        let id = self.superclasses.len();

        let Some(superclass) = superclass else {
            self.superclasses.push(None);
            self.class_ids.insert(class.name.as_str(), id);
            return;
        };

        if class.name == superclass.name {
            self.error(superclass, "A class can't inherit from itself.");
        }

        let parent = self.class_ids.get(superclass.name.as_str()).copied();
        self.superclasses.push(parent);
        self.class_ids.insert(class.name.as_str(), id);

        let mut seen: HashSet<usize> = HashSet::new();
        let mut ancestor = parent;

        while let Some(current) = ancestor {
            if current == id || !seen.insert(current) {
                self.error(
                    superclass,
                    format!("Inheritance cycle: '{}' is its own ancestor.", class.name),
                );
                return;
            }

            ancestor = self.superclasses[current];
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) {
        ensure_sufficient_stack(|| self.resolve_expr_kind(expr))
    }

    fn resolve_expr_kind(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Literal { .. } => {}

            Expr::Grouping { expression, .. } => {
                let mut inner: &Expr = expression;
                while let Expr::Grouping { expression, .. } = inner {
                    inner = expression.as_ref();
                }
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { .. } => {
                // Walk the left-nested chain of `a + b - c` with a loop.
                let mut rights: Vec<&'a Expr> = Vec::new();
                let mut leftmost = expr;
                while let Expr::Binary { left, right, .. } = leftmost {
                    rights.push(right.as_ref());
                    leftmost = left.as_ref();
                }

                self.resolve_expr(leftmost);
                for right in rights.into_iter().rev() {
                    self.resolve_expr(right);
                }
            }

            Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.name.as_str()) == Some(&false) {
                        self.error(name, "Can't read local variable in its own initializer.");
                    }
                }

                self.resolve_local(*id, &name.name);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, &name.name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, "this");
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                        return;
                    }
                    ClassType::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                        return;
                    }
                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, "super");
            }

            Expr::Function(decl) => self.resolve_function(decl, FunctionType::Function),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.
    fn resolve_function(&mut self, decl: &'a FunctionDecl, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&decl.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &'a Identifier) {
        let Some(scope) = self.scopes.last_mut() else {
            return; // globals may be redeclared
        };

        if scope.contains_key(name.name.as_str()) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }

        scope.insert(name.name.as_str(), false);
    }

    fn define(&mut self, name: &'a Identifier) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.name.as_str(), true);
        }
    }

    /// Bind `this` / `super` in the innermost scope.
    fn define_synthetic(&mut self, name: &'static str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, true);
        }
    }

    fn error(&mut self, at: &Identifier, message: impl Into<String>) {
        self.errors
            .push(LoxError::resolve(at.line, at.column, &at.name, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at depth `d`, or leave it out of the
    /// table when no scope declares it (a global).
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        // innermost → outermost
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                debug!("Resolved '{}' at depth {}", name, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name);
    }
}

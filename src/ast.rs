//! Owned abstract syntax tree.
//!
//! Nodes own their names and literals instead of borrowing tokens, so a
//! function declaration can outlive the source text of the run that defined
//! it (a closure stored in a global is still callable from a later run).
//! Function declarations are shared through `Rc` for the same reason.

use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::token::Token;

/// Identity of an expression that reads or writes a binding
/// (`Variable`, `Assign`, `This`, `Super`).  Key of the resolver's side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub usize);

/// A name as written in source, with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub line: usize,
    pub column: usize,
}

impl Identifier {
    pub fn new(name: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            name: name.into(),
            line,
            column,
        }
    }
}

impl<'a> From<&Token<'a>> for Identifier {
    fn from(token: &Token<'a>) -> Self {
        Identifier::new(token.lexeme, token.line, token.column)
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal, stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    Bool(bool),

    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
        })
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        })
    }
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal { value: LiteralValue, line: usize },

    /// Variable access.
    Variable { id: ExprId, name: Identifier },

    /// Assignment expression: `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Identifier,
        value: Box<Expr>,
    },

    /// Infix arithmetic, comparison or equality operator.
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        line: usize,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: LogicalOp,
        right: Box<Expr>,
        line: usize,
    },

    /// Prefix `!` or `-`.
    Unary {
        operator: UnaryOp,
        right: Box<Expr>,
        line: usize,
    },

    /// Function‑, method‑ or class‑call.  `line` is that of the closing `)`.
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        line: usize,
    },

    /// object.property
    Get { object: Box<Expr>, name: Identifier },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Identifier,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: Identifier },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Identifier,
        method: Identifier,
    },

    /// Parenthesised sub‑expression.
    Grouping { expression: Box<Expr>, line: usize },

    /// Anonymous `fun (params) { body }`.
    Function(Rc<FunctionDecl>),
}

impl Expr {
    pub fn nil(line: usize) -> Self {
        Expr::Literal {
            value: LiteralValue::Nil,
            line,
        }
    }

    /// Line an error about this expression should point at.
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal { line, .. }
            | Expr::Binary { line, .. }
            | Expr::Logical { line, .. }
            | Expr::Unary { line, .. }
            | Expr::Call { line, .. }
            | Expr::Grouping { line, .. } => *line,
            Expr::Variable { name, .. }
            | Expr::Assign { name, .. }
            | Expr::Get { name, .. }
            | Expr::Set { name, .. } => name.line,
            Expr::This { keyword, .. } | Expr::Super { keyword, .. } => keyword.line,
            Expr::Function(decl) => decl.line,
        }
    }
}

/// A function or method declaration, or a function expression (`name == None`).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Option<Identifier>,
    pub params: Vec<Identifier>,
    pub body: Vec<Stmt>,
    /// Line of the `fun` keyword or method name.
    pub line: usize,
}

impl FunctionDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(|n| n.name.as_str())
    }
}

/// `class Name < Superclass { methods }`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Identifier,
    /// Always an `Expr::Variable` when present.
    pub superclass: Option<Expr>,
    pub methods: Vec<Rc<FunctionDecl>>,
}

/// **Abstract‑Syntax‑Tree node** for *statements*.  A program is a sequence
/// of these nodes returned by [`Parser::parse`](crate::parser::Parser::parse).
/// `for` loops never appear here: the parser lowers them to `While`.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Identifier,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While { condition: Expr, body: Box<Stmt> },

    /// Named function declaration.
    Function(Rc<FunctionDecl>),

    /// `return` statement; absent value ⇒ `nil`.
    Return {
        keyword: Identifier,
        value: Option<Expr>,
    },

    Class(ClassDecl),
}

// ─────────────────────────────────────────────────────────────────────────────
// Teardown
// ─────────────────────────────────────────────────────────────────────────────
//
// A parsed tree can be as deep as the program is long (`1 + 1 + ... + 1`
// nests once per operator), and the compiler-generated drop glue would
// recurse once per level.  Both node types instead move their children into
// a worklist and drop them one at a time.

/// Subtrees detached from nodes that are being dropped.
#[derive(Default)]
struct Detached {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
}

impl Detached {
    fn drain(&mut self) {
        loop {
            if let Some(mut expr) = self.exprs.pop() {
                expr.detach_children(self);
            } else if let Some(mut stmt) = self.stmts.pop() {
                stmt.detach_children(self);
            } else {
                break;
            }
        }
    }

    fn expr(&mut self, slot: &mut Expr) {
        let line = slot.line();
        self.exprs.push(mem::replace(slot, Expr::nil(line)));
    }

    fn stmt(&mut self, slot: &mut Stmt) {
        self.stmts.push(mem::replace(slot, Stmt::Block(Vec::new())));
    }

    /// Function bodies are shared; only the last owner takes them apart.
    fn body(&mut self, decl: &mut Rc<FunctionDecl>) {
        if let Some(decl) = Rc::get_mut(decl) {
            self.stmts.append(&mut decl.body);
        }
    }
}

impl Expr {
    fn detach_children(&mut self, into: &mut Detached) {
        match self {
            Expr::Literal { .. }
            | Expr::Variable { .. }
            | Expr::This { .. }
            | Expr::Super { .. } => {}

            Expr::Assign { value: child, .. }
            | Expr::Unary { right: child, .. }
            | Expr::Get { object: child, .. }
            | Expr::Grouping {
                expression: child, ..
            } => into.expr(child),

            Expr::Binary { left, right, .. }
            | Expr::Logical { left, right, .. }
            | Expr::Set {
                object: left,
                value: right,
                ..
            } => {
                into.expr(left);
                into.expr(right);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                into.expr(callee);
                into.exprs.append(arguments);
            }

            Expr::Function(decl) => into.body(decl),
        }
    }
}

impl Stmt {
    fn detach_children(&mut self, into: &mut Detached) {
        match self {
            Stmt::Expression(expr) | Stmt::Print(expr) => into.expr(expr),

            Stmt::Var { initializer, .. } | Stmt::Return { value: initializer, .. } => {
                into.exprs.extend(initializer.take());
            }

            Stmt::Block(statements) => into.stmts.append(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                into.expr(condition);
                into.stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    into.stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                into.expr(condition);
                into.stmt(body);
            }

            Stmt::Function(decl) => into.body(decl),

            Stmt::Class(class) => {
                into.exprs.extend(class.superclass.take());
                for method in &mut class.methods {
                    into.body(method);
                }
            }
        }
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut detached = Detached::default();
        self.detach_children(&mut detached);
        detached.drain();
    }
}

impl Drop for Stmt {
    fn drop(&mut self) {
        let mut detached = Detached::default();
        self.detach_children(&mut detached);
        detached.drain();
    }
}

/*!
Recursive‑descent parser.

Pulls tokens lazily from a [`Scanner`] through a two‑token window and builds
the owned AST in [`crate::ast`].  Lexical errors met while pulling tokens are
collected next to syntax errors, so one call to [`Parser::parse`] reports
every problem in the source.

### Error recovery

A failed production returns `Err` up to `declaration`, which records it and
runs `synchronize`: tokens are discarded until just after a `;` or just
before a keyword that starts a statement.  Problems that do not derail the
grammar (too many arguments, invalid assignment target) are recorded without
unwinding.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, `statement`   | `debug`| High‑level descent into grammar branches. |
| `synchronize`                | `debug`| Where recovery resumed.                   |

--------------------------------------------------------------------------------
Grammar (EBNF)
--------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" function* "}" ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | forStmt | ifStmt | printStmt
               | returnStmt | whileStmt | block ;
exprStmt       → expression ";" ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
ifStmt         → "if" "(" expression ")" statement ( "else" statement )? ;
printStmt      → "print" expression ";" ;
returnStmt     → "return" expression? ";" ;
whileStmt      → "while" "(" expression ")" statement ;
block          → "{" declaration* "}" ;
parameters     → IDENT ( "," IDENT )* ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
arguments      → expression ( "," expression )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | IDENT | "(" expression ")" | "super" "." IDENT
               | "fun" "(" parameters? ")" block ;
```
*/

use std::mem;
use std::rc::Rc;

use crate::ast::{
    BinaryOp, ClassDecl, Expr, ExprId, FunctionDecl, Identifier, LiteralValue, LogicalOp, Stmt,
    UnaryOp,
};
use crate::error::{LoxError, Result};
use crate::scanner::Scanner;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Upper bound on parameters and call arguments.
pub const MAX_ARITY: usize = 255;

/// Top‑level parser over a lazily scanned token stream.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    previous: Token<'a>,
    current: Token<'a>,
    next: Token<'a>,
    errors: Vec<LoxError>,
    next_id: usize,
}

impl<'a> Parser<'a> {
    /// Construct a new parser and prime its token window.
    pub fn new(scanner: Scanner<'a>) -> Self {
        info!("Parser created");

        let eof = Token::new(TokenType::EOF, "", 1, 1);
        let mut parser = Self {
            scanner,
            previous: eof.clone(),
            current: eof.clone(),
            next: eof,
            errors: Vec::new(),
            next_id: 0,
        };

        parser.current = parser.pull();
        parser.next = parser.pull();
        parser
    }

    /// Number expression ids from `first` instead of zero.  An embedding that
    /// keeps one evaluator across runs passes the previous run's
    /// [`next_expr_id`](Self::next_expr_id) so ids never collide.
    pub fn starting_at(mut self, first: usize) -> Self {
        self.next_id = first;
        self
    }

    /// First id not handed out yet.
    pub fn next_expr_id(&self) -> usize {
        self.next_id
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.  Returns the statement list, or every lexical
    /// and syntax error found.
    pub fn parse(&mut self) -> std::result::Result<Vec<Stmt>, Vec<LoxError>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        if self.errors.is_empty() {
            info!("Parsed {} statement(s)", statements.len());
            Ok(statements)
        } else {
            info!("Parse failed with {} error(s)", self.errors.len());
            Err(mem::take(&mut self.errors))
        }
    }

    // ──────────────────────── declaration rules ───────────────────

    /// Parse one declaration, recovering at the next statement boundary on error.
    fn declaration(&mut self) -> Option<Stmt> {
        ensure_sufficient_stack(|| self.recovering_declaration())
    }

    fn recovering_declaration(&mut self) -> Option<Stmt> {
        debug!("Entering declaration at line {}", self.current.line);

        let result = if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.check(TokenType::FUN) && self.next.token_type == TokenType::IDENTIFIER {
            self.advance();
            self.function("function").map(Stmt::Function)
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                self.errors.push(e);
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name = Identifier::from(&self.consume(TokenType::IDENTIFIER, "Expected class name.")?);

        let superclass = if self.matches(TokenType::LESS) {
            let token = self.consume(TokenType::IDENTIFIER, "Expected superclass name.")?;
            Some(Expr::Variable {
                id: self.fresh_id(),
                name: Identifier::from(&token),
            })
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after class body.")?;

        Ok(Stmt::Class(ClassDecl {
            name,
            superclass,
            methods,
        }))
    }

    /// `IDENT "(" parameters? ")" block`, used for functions and methods.
    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name = self.consume(TokenType::IDENTIFIER, &format!("Expected {} name.", kind))?;

        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expected '(' after {} name.", kind),
        )?;

        let params = self.parameters()?;

        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expected '{{' before {} body.", kind),
        )?;
        let body = self.block()?;

        Ok(Rc::new(FunctionDecl {
            name: Some(Identifier::from(&name)),
            params,
            body,
            line: name.line,
        }))
    }

    /// Parameter list up to and including the closing `)`.
    fn parameters(&mut self) -> Result<Vec<Identifier>> {
        let mut params: Vec<Identifier> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARITY {
                    let error = self.error_at_current(&format!(
                        "Can't have more than {} parameters.",
                        MAX_ARITY
                    ));
                    self.errors.push(error);
                }

                let param = self.consume(TokenType::IDENTIFIER, "Expected parameter name.")?;
                params.push(Identifier::from(&param));

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters.")?;

        Ok(params)
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = Identifier::from(&self.consume(TokenType::IDENTIFIER, "Expected variable name.")?);

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        ensure_sufficient_stack(|| self.dispatch_statement())
    }

    fn dispatch_statement(&mut self) -> Result<Stmt> {
        debug!("Entering statement at line {}", self.current.line);

        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else {
            self.expression_statement()
        }
    }

    /// Lowers `for (init; cond; incr) body` to
    /// `{ init; while (cond) { body; incr; } }`.
    fn for_statement(&mut self) -> Result<Stmt> {
        let for_line = self.previous.line;

        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'.")?;
        let initializer = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition.")?;

        let increment = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or(Expr::Literal {
            value: LiteralValue::Bool(true),
            line: for_line,
        });
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after value.")?;

        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expected ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after if condition.")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition.")?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword = Identifier::from(&self.previous);
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    /// Declarations up to the closing `}` (the `{` is already consumed).
    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block.")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.assignment_or_target())
    }

    fn assignment_or_target(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_or()?;

        if self.matches(TokenType::EQUAL) {
            let equals: Token<'a> = self.previous.clone();
            let value = Box::new(self.assignment()?);

            // `Expr` tears itself down on drop, so the target's parts are
            // taken out through a mutable borrow rather than moved.
            return match &mut expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    id: self.fresh_id(),
                    name: name.clone(),
                    value,
                }),

                Expr::Get { object, name } => Ok(Expr::Set {
                    object: mem::replace(object, Box::new(Expr::nil(0))),
                    name: name.clone(),
                    value,
                }),

                _ => {
                    // Reported, but the grammar is not derailed.
                    let error = self.error_at(&equals, "Invalid assignment target.");
                    self.errors.push(error);
                    Ok(expr)
                }
            };
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let line = self.previous.line;
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::Or,
                right: Box::new(right),
                line,
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let line = self.previous.line;
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::And,
                right: Box::new(right),
                line,
            };
        }

        Ok(expr)
    }

    /// One left‑associative precedence level: `next ( op next )*`.
    fn binary_level(
        &mut self,
        operators: &[(TokenType, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut expr: Expr = next(self)?;

        while let Some(operator) = operators
            .iter()
            .find(|(tt, _)| self.check(tt.clone()))
            .map(|(_, op)| *op)
        {
            self.advance();
            let line = self.previous.line;
            let right: Expr = next(self)?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                line,
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::BANG_EQUAL, BinaryOp::NotEqual),
                (TokenType::EQUAL_EQUAL, BinaryOp::Equal),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::GREATER, BinaryOp::Greater),
                (TokenType::GREATER_EQUAL, BinaryOp::GreaterEqual),
                (TokenType::LESS, BinaryOp::Less),
                (TokenType::LESS_EQUAL, BinaryOp::LessEqual),
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::MINUS, BinaryOp::Subtract),
                (TokenType::PLUS, BinaryOp::Add),
            ],
            Self::factor,
        )
    }

    fn factor(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                (TokenType::STAR, BinaryOp::Multiply),
                (TokenType::SLASH, BinaryOp::Divide),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.prefixed_unary())
    }

    fn prefixed_unary(&mut self) -> Result<Expr> {
        let operator = if self.matches(TokenType::BANG) {
            Some(UnaryOp::Not)
        } else if self.matches(TokenType::MINUS) {
            Some(UnaryOp::Negate)
        } else {
            None
        };

        if let Some(operator) = operator {
            let line = self.previous.line;
            let right: Expr = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
                line,
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name = self.consume(TokenType::IDENTIFIER, "Expected property name after '.'.")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name: Identifier::from(&name),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();
        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    let error = self.error_at_current(&format!(
                        "Can't have more than {} arguments.",
                        MAX_ARITY
                    ));
                    self.errors.push(error);
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            arguments,
            line: paren.line,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.atom())
    }

    fn atom(&mut self) -> Result<Expr> {
        let line = self.current.line;
        let literal = |value: LiteralValue| -> Result<Expr> { Ok(Expr::Literal { value, line }) };

        if self.matches(TokenType::FALSE) {
            return literal(LiteralValue::Bool(false));
        }
        if self.matches(TokenType::TRUE) {
            return literal(LiteralValue::Bool(true));
        }
        if self.matches(TokenType::NIL) {
            return literal(LiteralValue::Nil);
        }

        if let TokenType::NUMBER(n) = self.current.token_type {
            self.advance();
            return literal(LiteralValue::Number(n));
        }

        if let TokenType::STRING(s) = &self.current.token_type {
            let s = s.clone();
            self.advance();
            return literal(LiteralValue::Str(s));
        }

        if self.matches(TokenType::THIS) {
            return Ok(Expr::This {
                id: self.fresh_id(),
                keyword: Identifier::from(&self.previous),
            });
        }

        if self.matches(TokenType::SUPER) {
            let keyword = Identifier::from(&self.previous);
            self.consume(TokenType::DOT, "Expected '.' after 'super'.")?;
            let method = self.consume(TokenType::IDENTIFIER, "Expected superclass method name.")?;

            return Ok(Expr::Super {
                id: self.fresh_id(),
                keyword,
                method: Identifier::from(&method),
            });
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::Variable {
                id: self.fresh_id(),
                name: Identifier::from(&self.previous),
            });
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression.")?;

            return Ok(Expr::Grouping {
                expression: Box::new(expr),
                line,
            });
        }

        if self.matches(TokenType::FUN) {
            self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'fun'.")?;
            let params = self.parameters()?;
            self.consume(TokenType::LEFT_BRACE, "Expected '{' before function body.")?;
            let body = self.block()?;

            return Ok(Expr::Function(Rc::new(FunctionDecl {
                name: None,
                params,
                body,
                line,
            })));
        }

        Err(self.error_at_current("Expected expression."))
    }

    // ────────────────────── utility helpers ───────────────────────

    fn fresh_id(&mut self) -> ExprId {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Next token from the scanner, collecting lexical errors on the way.
    /// Past the end it keeps producing `EOF`.
    fn pull(&mut self) -> Token<'a> {
        loop {
            match self.scanner.next() {
                Some(Ok(token)) => return token,
                Some(Err(e)) => {
                    debug!("Lexical error while parsing: {}", e);
                    self.errors.push(e);
                }
                None => {
                    return Token::new(
                        TokenType::EOF,
                        "",
                        self.scanner.line(),
                        self.scanner.column(),
                    )
                }
            }
        }
    }

    fn error_at(&self, token: &Token<'a>, message: &str) -> LoxError {
        LoxError::parse(token.line, token.column, token.location(), message)
    }

    fn error_at_current(&self, message: &str) -> LoxError {
        self.error_at(&self.current, message)
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<Token<'a>> {
        if self.check(ttype) {
            self.advance();
            return Ok(self.previous.clone());
        }

        Err(self.error_at_current(message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.current.token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) {
        if !self.is_at_end() {
            let pulled = self.pull();
            let next = mem::replace(&mut self.next, pulled);
            self.previous = mem::replace(&mut self.current, next);
        }
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.current.token_type, TokenType::EOF)
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous.token_type, TokenType::SEMICOLON) {
                break;
            }

            match self.current.token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN => break,
                _ => {}
            }

            self.advance();
        }

        debug!("Recovered at line {}", self.current.line);
    }
}

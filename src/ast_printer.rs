use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};
use crate::stack::ensure_sufficient_stack;

/// Converts a parsed program to a parenthesised prefix form, one top‑level
/// statement per line.  Used by `rox parse`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print_program(statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(Self::print_stmt)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        ensure_sufficient_stack(|| Self::stmt(stmt))
    }

    fn stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.name, Self::print(init)),
                None => format!("(var {})", name.name),
            },

            Stmt::Block(statements) => Self::list("block", statements.iter().map(Self::print_stmt)),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::Function(decl) => Self::function("fun", decl),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },

            Stmt::Class(class) => {
                let mut head = format!("class {}", class.name.name);
                if let Some(superclass) = &class.superclass {
                    head.push_str(&format!(" < {}", Self::print(superclass)));
                }
                Self::list(
                    &head,
                    class.methods.iter().map(|m| Self::function("method", m)),
                )
            }
        }
    }

    pub fn print(expr: &Expr) -> String {
        ensure_sufficient_stack(|| Self::expr(expr))
    }

    fn expr(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal { value, .. } => match value {
                LiteralValue::Bool(b) => b.to_string(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping { expression, .. } => format!("(group {})", Self::print(expression)),

            Expr::Unary {
                operator, right, ..
            } => format!("({} {})", operator, Self::print(right)),

            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => format!("({} {} {})", operator, Self::print(left), Self::print(right)),

            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => format!("({} {} {})", operator, Self::print(left), Self::print(right)),

            Expr::Variable { name, .. } => name.name.clone(),

            Expr::Assign { name, value, .. } => format!("(= {} {})", name.name, Self::print(value)),

            Expr::Call {
                callee, arguments, ..
            } => Self::list(
                &format!("call {}", Self::print(callee)),
                arguments.iter().map(Self::print),
            ),

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.name),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.name,
                Self::print(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.name),

            Expr::Function(decl) => Self::function("fun", decl),
        }
    }

    fn function(keyword: &str, decl: &FunctionDecl) -> String {
        let params: Vec<&str> = decl.params.iter().map(|p| p.name.as_str()).collect();
        let head = match decl.name() {
            Some(name) => format!("{} {} ({})", keyword, name, params.join(" ")),
            None => format!("{} ({})", keyword, params.join(" ")),
        };
        Self::list(&head, decl.body.iter().map(Self::print_stmt))
    }

    fn list(head: &str, items: impl Iterator<Item = String>) -> String {
        let mut s = format!("({}", head);
        for item in items {
            s.push(' ');
            s.push_str(&item);
        }
        s.push(')');
        s
    }
}

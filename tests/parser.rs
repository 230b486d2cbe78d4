#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;

    use rox::ast::{Expr, Stmt};
    use rox::ast_printer::AstPrinter;
    use rox::error::LoxError;
    use rox::parser::Parser;
    use rox::scanner::Scanner;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
        Parser::new(Scanner::new(source)).parse()
    }

    fn printed(source: &str) -> String {
        match parse(source) {
            Ok(statements) => AstPrinter::print_program(&statements),
            Err(errors) => panic!("unexpected parse errors: {:?}", errors),
        }
    }

    fn errors(source: &str) -> Vec<String> {
        match parse(source) {
            Ok(statements) => panic!("expected errors, parsed {:?}", statements),
            Err(errors) => errors.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(printed("print 1 + 2 * 3;"), "(print (+ 1.0 (* 2.0 3.0)))");
        assert_eq!(printed("print 1 - 2 - 3;"), "(print (- (- 1.0 2.0) 3.0))");
        assert_eq!(
            printed("print !true == false;"),
            "(print (== (! true) false))"
        );
        assert_eq!(
            printed("print a or b and c;"),
            "(print (or a (and b c)))"
        );
        assert_eq!(
            printed("print (1 + 2) * -3 >= 4;"),
            "(print (>= (* (group (+ 1.0 2.0)) (- 3.0)) 4.0))"
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(printed("a = b = 1;"), "(; (= a (= b 1.0)))");
        assert_eq!(printed("o.f.g = 2;"), "(; (= (. (. o f) g) 2.0))");
    }

    #[test]
    fn test_for_desugars_to_while() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            "(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"
        );
        assert_eq!(printed("for (;;) print 1;"), "(while true (print 1.0))");
    }

    #[test]
    fn test_declarations() {
        assert_eq!(
            printed("fun add(a, b) { return a + b; }"),
            "(fun add (a b) (return (+ a b)))"
        );
        assert_eq!(
            printed("class B < A { init(x) { this.x = x; } m() { return super.m(); } }"),
            "(class B < A (method init (x) (; (= (. this x) x))) (method m () (return (call (super m)))))"
        );
        assert_eq!(
            printed("var f = fun (n) { print n; };"),
            "(var f (fun (n) (print n)))"
        );
        assert_eq!(
            printed("if (x) print 1; else { print 2; }"),
            "(if x (print 1.0) (block (print 2.0)))"
        );
    }

    #[test]
    fn test_call_arguments_and_property_chains() {
        assert_eq!(
            printed("f(1, \"two\")(3).g;"),
            "(; (. (call (call f 1.0 two) 3.0) g))"
        );
    }

    #[test]
    fn test_missing_semicolon_reports_at_end() {
        assert_eq!(
            errors("print 1"),
            vec!["[line 1] Error at end: Expected ';' after value."]
        );
    }

    #[test]
    fn test_recovery_reports_independent_errors() {
        assert_eq!(
            errors("var = 1;\nprint ;\nprint 3;\nvar ok = (;"),
            vec![
                "[line 1] Error at '=': Expected variable name.",
                "[line 2] Error at ';': Expected expression.",
                "[line 4] Error at ';': Expected expression.",
            ]
        );
    }

    #[test]
    fn test_lexical_and_syntax_errors_are_collected_together() {
        assert_eq!(
            errors("print @;\nprint 2"),
            vec![
                "[line 1] Error: Unexpected character: @",
                "[line 1] Error at ';': Expected expression.",
                "[line 2] Error at end: Expected ';' after value.",
            ]
        );
    }

    #[test]
    fn test_invalid_assignment_target_does_not_derail_parsing() {
        assert_eq!(
            errors("1 + 2 = 3;\nprint (;"),
            vec![
                "[line 1] Error at '=': Invalid assignment target.",
                "[line 2] Error at ';': Expected expression.",
            ]
        );
    }

    #[test]
    fn test_too_many_arguments() {
        let args = vec!["1"; 256].join(", ");
        let source = format!("f({});", args);

        assert_eq!(
            errors(&source),
            vec!["[line 1] Error at '1': Can't have more than 255 arguments."]
        );
    }

    #[test]
    fn test_too_many_parameters() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));

        assert_eq!(
            errors(&source),
            vec!["[line 1] Error at 'p255': Can't have more than 255 parameters."]
        );
    }

    #[test]
    fn test_expression_ids_are_unique_and_offset() {
        let mut parser = Parser::new(Scanner::new("a = b; print a;")).starting_at(100);
        let statements = parser.parse().unwrap();

        let mut ids = Vec::new();
        for stmt in &statements {
            match stmt {
                Stmt::Expression(Expr::Assign { id, value, .. }) => {
                    ids.push(id.0);
                    if let Expr::Variable { id, .. } = value.as_ref() {
                        ids.push(id.0);
                    }
                }
                Stmt::Print(Expr::Variable { id, .. }) => ids.push(id.0),
                other => panic!("unexpected statement {:?}", other),
            }
        }

        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|&id| id >= 100));
        assert_eq!(parser.next_expr_id(), 104);
    }

    #[test]
    fn test_deep_nesting_parses() {
        let depth = 10_000;

        let blocks = format!("{}print 1;{}", "{".repeat(depth), "}".repeat(depth));
        assert_eq!(parse(&blocks).map(|program| program.len()).unwrap(), 1);

        let negations = format!("print {}1;", "-".repeat(depth));
        assert_eq!(parse(&negations).map(|program| program.len()).unwrap(), 1);

        let assignments = format!("{}1;", "a = ".repeat(depth));
        assert_eq!(parse(&assignments).map(|program| program.len()).unwrap(), 1);
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(parse("// nothing here\n").unwrap(), Vec::new());
    }
}

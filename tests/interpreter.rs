#[cfg(test)]
mod interpreter_tests {
    use pretty_assertions::assert_eq;

    use rox::{Config, Diagnostic, DiagnosticKind, Lox, RunResult};

    fn run(source: &str) -> (RunResult, String) {
        let mut lox = Lox::new();
        let result = lox.interpret(source);
        (result, lox.out())
    }

    /// Output of a program that must succeed.
    fn output(source: &str) -> String {
        let (result, out) = run(source);
        assert_eq!(result, RunResult::Success, "output so far: {:?}", out);
        out
    }

    fn runtime_error(line: usize, message: &str) -> RunResult {
        RunResult::RuntimeError(Diagnostic {
            kind: DiagnosticKind::Runtime,
            line,
            column: None,
            message: message.to_string(),
        })
    }

    // ── scenarios ──────────────────────────────────────────────────────────

    #[test]
    fn test_addition_prints_three() {
        assert_eq!(run("print 1 + 2;"), (RunResult::Success, "3\n".to_string()));
    }

    #[test]
    fn test_recursive_fibonacci() {
        assert_eq!(
            output("fun f(n){ if (n<=1) return n; return f(n-1)+f(n-2); } print f(10);"),
            "55\n"
        );
    }

    #[test]
    fn test_block_shadowing_restores_outer_binding() {
        assert_eq!(
            output("var x = 1; { var x = 2; print x; } print x;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_type_mismatch_on_plus_prints_nothing() {
        assert_eq!(
            run("print 1 + \"a\";"),
            (
                runtime_error(1, "Operands must be two numbers or two strings."),
                String::new()
            )
        );
    }

    #[test]
    fn test_bare_return_yields_nil() {
        assert_eq!(output("fun f(){ return; } print f();"), "nil\n");
    }

    #[test]
    fn test_program_without_print_has_no_output() {
        assert_eq!(
            output("var a = 1; fun f(x) { return x * 2; } a = f(a); class K {} K();"),
            ""
        );
    }

    // ── closures and scope ─────────────────────────────────────────────────

    #[test]
    fn test_closures_count_independently() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; return i; }
                return count;
            }
            var a = makeCounter();
            var b = makeCounter();
            print a(); print a(); print b(); print a(); print b();
        "#;

        assert_eq!(output(source), "1\n2\n1\n3\n2\n");
    }

    #[test]
    fn test_closure_sees_later_assignment() {
        assert_eq!(
            output("var x = \"before\"; fun show() { print x; } x = \"after\"; show();"),
            "after\n"
        );
    }

    #[test]
    fn test_closure_binding_is_fixed_at_resolution() {
        let source = r#"
            var a = "global";
            {
                fun showA() { print a; }
                showA();
                var a = "block";
                showA();
            }
        "#;

        assert_eq!(output(source), "global\nglobal\n");
    }

    #[test]
    fn test_function_expressions_capture_parameters() {
        let source = r#"
            fun adder(n) { return fun (x) { return x + n; }; }
            var add2 = adder(2);
            print add2(40);
        "#;

        assert_eq!(output(source), "42\n");
    }

    #[test]
    fn test_forward_reference_to_global_function() {
        assert_eq!(
            output("fun first() { return second(); } fun second() { return \"ok\"; } print first();"),
            "ok\n"
        );
    }

    // ── classes ────────────────────────────────────────────────────────────

    #[test]
    fn test_override_and_super_keep_receiver() {
        let source = r#"
            class A { m() { return "A.m " + this.name; } }
            class B < A {
                init(name) { this.name = name; }
                m() { return "B.m / " + super.m(); }
            }
            print B("b").m();
        "#;

        assert_eq!(output(source), "B.m / A.m b\n");
    }

    #[test]
    fn test_super_is_lexical_not_dynamic() {
        let source = r#"
            class A { m() { print "A"; } }
            class B < A { m() { print "B"; super.m(); } }
            class C < B {}
            C().m();
        "#;

        assert_eq!(output(source), "B\nA\n");
    }

    #[test]
    fn test_initializer_always_yields_instance() {
        let source = r#"
            class P { init(x) { this.x = x; return; } }
            var p = P(3);
            print p.x;
            print p.init(4) == p;
            print p.x;
        "#;

        assert_eq!(output(source), "3\ntrue\n4\n");
    }

    #[test]
    fn test_inherited_initializer_sets_arity() {
        let source = r#"
            class A { init(a, b) { this.sum = a + b; } }
            class B < A {}
            print B(1, 2).sum;
        "#;

        assert_eq!(output(source), "3\n");
    }

    #[test]
    fn test_bound_method_remembers_receiver() {
        let source = r#"
            class C { init() { this.n = 1; } get() { return this.n; } }
            var m = C().get;
            print m();
        "#;

        assert_eq!(output(source), "1\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let source = r#"
            class C { m() { return "method"; } }
            var c = C();
            c.m = fun () { return "field"; };
            print c.m();
        "#;

        assert_eq!(output(source), "field\n");
    }

    // ── values ─────────────────────────────────────────────────────────────

    #[test]
    fn test_truthiness_and_equality() {
        let source = r#"
            if (0) print "zero";
            if ("") print "empty";
            if (nil) print "nil";
            if (false) print "false";
            print nil == false;
            print 1 == "1";
            print nil == nil;
            print "a" == "a";
            print 2 != 3;
        "#;

        assert_eq!(
            output(source),
            "zero\nempty\nfalse\nfalse\ntrue\ntrue\ntrue\n"
        );
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(
            output("print 1.5; print 10 / 4; print -0; print 1 / 0; print 3 * 1.0; print 0.1 + 0.2;"),
            "1.5\n2.5\n-0\ninf\n3\n0.30000000000000004\n"
        );
    }

    #[test]
    fn test_very_large_and_small_numbers_use_exponent_form() {
        let source = r#"
            var big = 1;
            for (var i = 0; i < 1000; i = i + 1) big = big * 2;
            print big;
            print -big;
            print 1 / big;
            print 0.0000025;
            print 0.000001;
            print 1000000000000000;
        "#;

        assert_eq!(
            output(source),
            "1.0715086071862673e301\n-1.0715086071862673e301\n9.332636185032189e-302\n2.5e-6\n0.000001\n1000000000000000\n"
        );
    }

    #[test]
    fn test_display_of_callables_and_instances() {
        assert_eq!(
            output("fun f() {} print f; print clock; class K {} print K; print K(); print fun () {};"),
            "<fn f>\n<native fn clock>\nK\nK instance\n<fn>\n"
        );
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(
            output("print nil or \"x\"; print 1 and 2; print false and nope; print \"a\" + \"b\";"),
            "x\n2\nfalse\nab\n"
        );
    }

    #[test]
    fn test_loops() {
        assert_eq!(
            output("for (var i = 0; i < 3; i = i + 1) print i; var j = 2; while (j > 0) { print j; j = j - 1; }"),
            "0\n1\n2\n2\n1\n"
        );
    }

    #[test]
    fn test_arguments_evaluate_left_to_right() {
        let source = r#"
            var log = "";
            fun t(s) { log = log + s; return s; }
            fun f(a, b, c) {}
            f(t("a"), t("b"), t("c"));
            print log;
        "#;

        assert_eq!(output(source), "abc\n");
    }

    // ── runtime errors ─────────────────────────────────────────────────────

    #[test]
    fn test_arity_errors_name_expected_and_actual() {
        for (args, actual) in [("", 0), ("1", 1), ("1, 2, 3", 3)] {
            let source = format!("fun f(a, b) {{}} f({});", args);
            assert_eq!(
                run(&source).0,
                runtime_error(1, &format!("Expected 2 arguments but got {}.", actual))
            );
        }

        assert_eq!(
            run("class A {} A(1);").0,
            runtime_error(1, "Expected 0 arguments but got 1.")
        );
        assert_eq!(
            run("clock(1);").0,
            runtime_error(1, "Expected 0 arguments but got 1.")
        );
    }

    #[test]
    fn test_runtime_error_messages() {
        let cases = [
            ("\"str\"();", "Can only call functions and classes."),
            ("-\"a\";", "Operand must be a number."),
            ("1 < \"a\";", "Operands must be numbers."),
            ("print nope;", "Undefined variable 'nope'."),
            ("nope = 1;", "Undefined variable 'nope'."),
            ("var x = 1; print x.y;", "Only instances have properties."),
            ("var x = 1; x.y = 2;", "Only instances have fields."),
            ("class A {} print A().z;", "Undefined property 'z'."),
            ("var N = 1; class B < N {}", "Superclass must be a class."),
            (
                "class A {} class B < A { m() { return super.nope(); } } B().m();",
                "Undefined property 'nope'.",
            ),
        ];

        for (source, message) in cases {
            assert_eq!(run(source).0, runtime_error(1, message), "source: {}", source);
        }
    }

    #[test]
    fn test_runtime_error_stops_the_run() {
        assert_eq!(
            run("print 1;\nprint nope;\nprint 2;"),
            (
                runtime_error(2, "Undefined variable 'nope'."),
                "1\n".to_string()
            )
        );
    }

    #[test]
    fn test_unbounded_recursion_is_a_runtime_error() {
        let mut lox = Lox::new().with_config(Config {
            max_call_depth: 32,
            ..Config::default()
        });

        assert_eq!(
            lox.interpret("fun f(n) { return f(n + 1); }\nf(0);"),
            runtime_error(1, "Stack overflow.")
        );

        // The session is still usable afterwards.
        assert_eq!(lox.interpret("print \"alive\";"), RunResult::Success);
        assert_eq!(lox.out(), "alive\n");
    }

    #[test]
    fn test_recursion_depth_on_default_config() {
        let count = "fun c(n) { if (n == 0) return 0; return 1 + c(n - 1); }";

        assert_eq!(output(&format!("{} print c(150);", count)), "150\n");
        assert_eq!(
            run(&format!("{} print c(1000);", count)).0,
            runtime_error(1, "Stack overflow.")
        );
    }

    #[test]
    fn test_deeply_nested_parentheses() {
        let depth = 50_000;
        let source = format!("print {}1{};", "(".repeat(depth), ")".repeat(depth));

        assert_eq!(output(&source), "1\n");
    }

    #[test]
    fn test_long_operator_chain() {
        let source = format!("print {};", vec!["1"; 200_000].join(" + "));

        assert_eq!(output(&source), "200000\n");
    }

    #[test]
    fn test_operator_chain_keeps_left_to_right_order() {
        let source = r#"
            var log = "";
            fun t(s, n) { log = log + s; return n; }
            print t("a", 10) - t("b", 4) - t("c", 3) * t("d", 2);
            print log;
        "#;

        assert_eq!(output(source), "0\nabcd\n");
    }

    #[test]
    fn test_error_inside_operator_chain() {
        assert_eq!(
            run("print 1 + 2\n+ \"x\" + 4;"),
            (
                runtime_error(2, "Operands must be two numbers or two strings."),
                String::new()
            )
        );
    }

    #[test]
    fn test_static_errors_block_evaluation() {
        let (result, out) = run("print \"before\";\nprint ;");

        assert_eq!(out, "");
        assert_eq!(
            result,
            RunResult::SyntaxErrors(vec![Diagnostic {
                kind: DiagnosticKind::Syntax,
                line: 2,
                column: Some(7),
                message: "at ';': Expected expression.".to_string(),
            }])
        );
    }
}

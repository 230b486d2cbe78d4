#[cfg(test)]
mod session_tests {
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use rox::natives::{Clock, SystemClock};
    use rox::{Config, Diagnostic, DiagnosticKind, DiagnosticsPolicy, Lox, OutputSink, RunResult};

    /// Records every chunk and flush it is handed.
    #[derive(Clone, Default)]
    struct RecordingSink {
        chunks: Rc<RefCell<Vec<String>>>,
        flushes: Rc<RefCell<usize>>,
    }

    impl OutputSink for RecordingSink {
        fn write(&mut self, chunk: &str) -> io::Result<usize> {
            self.chunks.borrow_mut().push(chunk.to_string());
            Ok(chunk.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            *self.flushes.borrow_mut() += 1;
            Ok(())
        }
    }

    /// Accepts one byte per write.
    struct TrickleSink(Rc<RefCell<String>>);

    impl OutputSink for TrickleSink {
        fn write(&mut self, chunk: &str) -> io::Result<usize> {
            let first = chunk.chars().next().map_or(0, char::len_utf8);
            self.0.borrow_mut().push_str(&chunk[..first]);
            Ok(first)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FullSink;

    impl OutputSink for FullSink {
        fn write(&mut self, _chunk: &str) -> io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FixedClock(f64);

    impl Clock for FixedClock {
        fn now(&self) -> Result<f64, String> {
            Ok(self.0)
        }
    }

    struct BrokenClock;

    impl Clock for BrokenClock {
        fn now(&self) -> Result<f64, String> {
            Err("clock unavailable".to_string())
        }
    }

    fn runtime_error(line: usize, message: &str) -> RunResult {
        RunResult::RuntimeError(Diagnostic {
            kind: DiagnosticKind::Runtime,
            line,
            column: None,
            message: message.to_string(),
        })
    }

    // ── persistence ────────────────────────────────────────────────────────

    #[test]
    fn test_globals_persist_across_runs() {
        let mut lox = Lox::new();

        assert_eq!(lox.interpret("var a = 1;"), RunResult::Success);
        assert_eq!(lox.interpret("a = a + 1; print a;"), RunResult::Success);
        assert_eq!(lox.out(), "2\n");
    }

    #[test]
    fn test_closures_from_earlier_runs_keep_working() {
        let mut lox = Lox::new();

        lox.interpret(
            "fun make() { var n = 0; fun inc() { n = n + 1; return n; } return inc; } var c = make();",
        );
        let result = lox.interpret("{ var x = 5; { print x; } } print c(); print c();");

        assert_eq!(result, RunResult::Success);
        assert_eq!(lox.out(), "5\n1\n2\n");
    }

    #[test]
    fn test_failed_run_keeps_earlier_globals() {
        let mut lox = Lox::new();

        lox.interpret("var kept = \"yes\";");
        assert!(!lox.interpret("print ;").is_success());
        assert!(!lox.interpret("print missing;").is_success());
        lox.interpret("print kept;");

        assert_eq!(lox.out(), "yes\n");
    }

    #[test]
    fn test_reset_forgets_globals_but_keeps_natives() {
        let mut lox = Lox::new();

        lox.interpret("var a = 1; class K {}");
        assert!(lox.global("a").is_some());

        lox.reset();

        assert!(lox.global("a").is_none());
        assert_eq!(
            lox.interpret("print a;"),
            runtime_error(1, "Undefined variable 'a'.")
        );
        assert_eq!(lox.interpret("print clock;"), RunResult::Success);
        assert_eq!(lox.out(), "<native fn clock>\n");
    }

    #[test]
    fn test_class_redefined_over_its_own_subclass() {
        let mut lox = Lox::new();

        assert_eq!(
            lox.interpret("class A { m() { return 1; } } class B < A {} class A < B {} print A().m();"),
            RunResult::Success
        );
        assert_eq!(lox.out(), "1\n");
    }

    #[test]
    fn test_superclass_declared_later_is_a_runtime_error() {
        let mut lox = Lox::new();

        assert_eq!(
            lox.interpret("class A < C {}\nclass B < A {}\nclass C < B {}"),
            runtime_error(1, "Undefined variable 'C'.")
        );
    }

    #[test]
    fn test_builders_start_from_fresh_globals() {
        let mut lox = Lox::new();
        lox.interpret("var a = 1;");

        let mut lox = lox.with_config(Config::default());

        assert_eq!(
            lox.interpret("print a;"),
            runtime_error(1, "Undefined variable 'a'.")
        );
    }

    // ── out / clear ────────────────────────────────────────────────────────

    #[test]
    fn test_out_accumulates_until_clear() {
        let mut lox = Lox::new();

        lox.interpret("print 1;");
        lox.interpret("print 2;");
        assert_eq!(lox.out(), "1\n2\n");

        lox.clear();
        assert_eq!(lox.out(), "");

        lox.interpret("print 3;");
        assert_eq!(lox.out(), "3\n");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut lox = Lox::new();

        lox.clear();
        assert_eq!(lox.out(), "");

        lox.interpret("print \"x\";");
        lox.clear();
        lox.clear();
        assert_eq!(lox.out(), "");
    }

    // ── sink ───────────────────────────────────────────────────────────────

    #[test]
    fn test_sink_gets_one_write_per_print_and_a_flush_per_run() {
        let sink = RecordingSink::default();
        let mut lox = Lox::new().with_sink(Box::new(sink.clone()));

        lox.interpret("print 1; print \"two\";");

        assert_eq!(*sink.chunks.borrow(), vec!["1\n", "two\n"]);
        assert_eq!(*sink.flushes.borrow(), 1);
        assert_eq!(lox.out(), "1\ntwo\n");
    }

    #[test]
    fn test_forward_only_session_keeps_nothing() {
        let sink = RecordingSink::default();
        let mut lox = Lox::new()
            .with_sink(Box::new(sink.clone()))
            .with_config(Config {
                keep_transcript: false,
                ..Config::default()
            });

        lox.interpret("for (var i = 0; i < 3; i = i + 1) print i;");
        lox.interpret("print \"done\";");

        assert_eq!(*sink.chunks.borrow(), vec!["0\n", "1\n", "2\n", "done\n"]);
        assert_eq!(lox.out(), "");
    }

    #[test]
    fn test_turning_the_transcript_off_drops_what_it_held() {
        let mut lox = Lox::new();
        lox.interpret("print 1;");

        let mut lox = lox.with_config(Config {
            keep_transcript: false,
            ..Config::default()
        });
        assert_eq!(lox.out(), "");

        lox.interpret("print 2;");
        assert_eq!(lox.out(), "");
    }

    #[test]
    fn test_partial_writes_are_retried() {
        let received = Rc::new(RefCell::new(String::new()));
        let mut lox = Lox::new().with_sink(Box::new(TrickleSink(Rc::clone(&received))));

        lox.interpret("print \"héllo\";");

        assert_eq!(*received.borrow(), "héllo\n");
    }

    #[test]
    fn test_sink_refusing_output_is_a_runtime_error() {
        let mut lox = Lox::new().with_sink(Box::new(FullSink));

        assert_eq!(
            lox.interpret("print 1;"),
            runtime_error(1, "Failed to write output: output sink accepted no bytes")
        );
    }

    // ── clock ──────────────────────────────────────────────────────────────

    #[test]
    fn test_injected_clock() {
        let mut lox = Lox::new().with_clock(Rc::new(FixedClock(12.5)));

        lox.interpret("print clock(); print clock() - clock();");

        assert_eq!(lox.out(), "12.5\n0\n");
    }

    #[test]
    fn test_native_failure_names_the_function() {
        let mut lox = Lox::new().with_clock(Rc::new(BrokenClock));

        assert_eq!(
            lox.interpret("var t = clock();"),
            runtime_error(1, "Native function 'clock' failed: clock unavailable")
        );
    }

    #[test]
    fn test_default_clock_is_monotonic() {
        let mut lox = Lox::new();

        lox.interpret("var a = clock(); var b = clock(); print b >= a; print a >= 0;");

        assert_eq!(lox.out(), "true\ntrue\n");
    }

    #[test]
    fn test_wall_clock_counts_from_unix_epoch() {
        let mut lox = Lox::new().with_clock(Rc::new(SystemClock));

        lox.interpret("print clock() > 1000000000;");

        assert_eq!(lox.out(), "true\n");
    }

    // ── diagnostics ────────────────────────────────────────────────────────

    #[test]
    fn test_static_error_kinds() {
        let mut lox = Lox::new();

        assert_eq!(
            lox.interpret("print 1 $;"),
            RunResult::SyntaxErrors(vec![Diagnostic {
                kind: DiagnosticKind::Lexical,
                line: 1,
                column: Some(9),
                message: "Unexpected character: $".to_string(),
            }])
        );
        assert_eq!(
            lox.interpret("return 1;"),
            RunResult::SyntaxErrors(vec![Diagnostic {
                kind: DiagnosticKind::Resolution,
                line: 1,
                column: Some(1),
                message: "at 'return': Can't return from top-level code.".to_string(),
            }])
        );
    }

    #[test]
    fn test_structured_policy_keeps_output_clean() {
        let mut lox = Lox::new();

        lox.interpret("print 1");
        lox.interpret("print nope;");

        assert_eq!(lox.out(), "");
    }

    #[test]
    fn test_sink_policy_echoes_diagnostics() {
        let sink = RecordingSink::default();
        let mut lox = Lox::new()
            .with_config(Config {
                diagnostics: DiagnosticsPolicy::Sink,
                ..Config::default()
            })
            .with_sink(Box::new(sink.clone()));

        lox.interpret("print 1");
        lox.interpret("print 0;\nprint nope;");

        assert_eq!(
            lox.out(),
            "[line 1] Error at end: Expected ';' after value.\n0\n[line 2] Runtime error: Undefined variable 'nope'.\n"
        );
        assert_eq!(sink.chunks.borrow().len(), 3);
    }

    #[test]
    fn test_diagnostic_display_matches_error_display() {
        let mut lox = Lox::new();
        let result = lox.interpret("var 1;");

        let rendered: Vec<String> = result.diagnostics().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["[line 1] Error at '1': Expected variable name."]);
    }

    // ── config and serialisation ───────────────────────────────────────────

    #[test]
    fn test_config_from_json() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());

        let config = Config::from_json(r#"{ "diagnostics": "sink" }"#).unwrap();
        assert_eq!(config.diagnostics, DiagnosticsPolicy::Sink);
        assert_eq!(config.max_call_depth, 200);

        let config = Config::from_json(r#"{ "max_call_depth": 10 }"#).unwrap();
        assert_eq!(config.diagnostics, DiagnosticsPolicy::Structured);
        assert_eq!(config.max_call_depth, 10);
        assert!(config.keep_transcript);

        let config = Config::from_json(r#"{ "keep_transcript": false }"#).unwrap();
        assert!(!config.keep_transcript);

        assert!(Config::from_json(r#"{ "diagnostics": "loud" }"#).is_err());
    }

    #[test]
    fn test_run_result_json_shape() {
        let mut lox = Lox::new();

        assert_eq!(
            serde_json::to_value(lox.interpret("print 1;")).unwrap(),
            json!({ "status": "success" })
        );
        assert_eq!(
            serde_json::to_value(lox.interpret("print ;")).unwrap(),
            json!({
                "status": "syntax_errors",
                "detail": [
                    { "kind": "syntax", "line": 1, "column": 7, "message": "at ';': Expected expression." }
                ]
            })
        );
        assert_eq!(
            serde_json::to_value(lox.interpret("\n-nil;")).unwrap(),
            json!({
                "status": "runtime_error",
                "detail": { "kind": "runtime", "line": 2, "message": "Operand must be a number." }
            })
        );
    }
}

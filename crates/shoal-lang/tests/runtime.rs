//! Runtime behavior tests.
//!
//! Tests the full stack: compile → Interpreter::run → take_output.
//! Printed lines are inspected to verify evaluation results; runtime
//! errors are inspected for their messages.

use shoal_lang::{CommandRunner, Interpreter, RuntimeError, compile};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn run(src: &str) -> Vec<String> {
    let prog = compile(src).unwrap_or_else(|errs| {
        panic!("compile failed: {errs:#?}");
    });
    let mut itp = Interpreter::new();
    itp.run(&prog).unwrap_or_else(|e| panic!("run failed: {e}"));
    itp.take_output()
}

fn run_err(src: &str) -> RuntimeError {
    let prog = compile(src).unwrap_or_else(|errs| {
        panic!("compile failed (expected runtime error, not compile error): {errs:#?}");
    });
    let mut itp = Interpreter::new();
    match itp.run(&prog) {
        Ok(()) => panic!("expected run to fail but it succeeded"),
        Err(e) => e,
    }
}

/// Command runner that never spawns anything; echoes back what it was asked
/// to run so tests can observe the exact command text.
struct CannedRunner;

impl CommandRunner for CannedRunner {
    fn run(&self, command: &str) -> std::io::Result<String> {
        Ok(format!("ran:{command}\n"))
    }
}

fn run_canned(src: &str) -> Vec<String> {
    let prog = compile(src).unwrap_or_else(|errs| panic!("compile failed: {errs:#?}"));
    let mut itp = Interpreter::with_runner(Box::new(CannedRunner));
    itp.run(&prog).unwrap_or_else(|e| panic!("run failed: {e}"));
    itp.take_output()
}

// ─── Arithmetic & operators ──────────────────────────────────────────────────

#[test]
fn arithmetic_precedence() {
    assert_eq!(run("print(1 + 2 * 3)"), ["7"]);
    assert_eq!(run("print((1 + 2) * 3)"), ["9"]);
    assert_eq!(run("print(10 - 2 - 3)"), ["5"]);
}

#[test]
fn string_concatenation_and_comparison() {
    assert_eq!(run("print(\"foo\" + \"bar\")"), ["foobar"]);
    assert_eq!(run("print(\"abc\" < \"abd\")"), ["true"]);
}

#[test]
fn division_by_zero_yields_infinity() {
    assert_eq!(run("print(1 / 0)"), ["inf"]);
}

#[test]
fn mixed_operand_arithmetic_is_a_type_error() {
    let e = run_err("print(1 + \"a\")");
    assert!(e.message.contains("number") && e.message.contains("string"), "{e}");
    assert!(run_err("print(\"a\" - \"b\")").message.contains("string"));
}

#[test]
fn equality_requires_same_variant() {
    assert_eq!(run("print(1 == 1)"), ["true"]);
    assert_eq!(run("print(nil == nil)"), ["true"]);
    assert_eq!(run("print(1 != 2)"), ["true"]);
    let e = run_err("print(1 == \"1\")");
    assert!(e.message.contains("compare"), "{e}");
}

#[test]
fn unary_operators() {
    assert_eq!(run("print(-(1 + 2))"), ["-3"]);
    assert_eq!(run("print(!false)"), ["true"]);
    assert!(run_err("print(-\"a\")").message.contains("negate"));
    assert!(run_err("print(!1)").message.contains("bool"));
}

#[test]
fn numeric_stringify_round_trips() {
    assert_eq!(run("print(123)"), ["123"]);
    assert_eq!(run("print(123.)"), ["123"]);
    assert_eq!(run("print(123.45)"), ["123.45"]);
    assert_eq!(run("print(0.1)"), ["0.1"]);
}

// ─── Short-circuit evaluation ────────────────────────────────────────────────

#[test]
fn and_evaluates_right_operand_when_left_is_true() {
    let out = run(r#"
        let count = 0
        fn update() { count = count + 1 return count }
        if update() > 0 && update() < 0 { print("unreachable") }
        print(count)
    "#);
    assert_eq!(out, ["2"]);
}

#[test]
fn and_skips_right_operand_when_left_is_false() {
    let out = run(r#"
        let count = 0
        fn bump() { count = count + 1 return true }
        if false && bump() { print("unreachable") }
        print(count)
    "#);
    assert_eq!(out, ["0"]);
}

#[test]
fn or_skips_right_operand_when_left_is_true() {
    let out = run(r#"
        let count = 0
        fn bump() { count = count + 1 return true }
        if true || bump() { }
        print(count)
    "#);
    assert_eq!(out, ["0"]);
}

#[test]
fn or_evaluates_right_operand_when_left_is_false() {
    let out = run(r#"
        let count = 0
        fn bump() { count = count + 1 return true }
        if false || bump() { }
        print(count)
    "#);
    assert_eq!(out, ["1"]);
}

#[test]
fn logical_operands_must_be_bool() {
    assert!(run_err("print(1 && true)").message.contains("bool"));
}

// ─── Conditions & loops ──────────────────────────────────────────────────────

#[test]
fn conditions_must_be_bool() {
    assert!(run_err("if 1 { }").message.contains("bool"));
    assert!(run_err("while \"x\" { }").message.contains("bool"));
}

#[test]
fn while_loop_with_break() {
    let out = run(r#"
        let i = 0
        while true {
            i = i + 1
            if i == 3 { break }
        }
        print(i)
    "#);
    assert_eq!(out, ["3"]);
}

#[test]
fn for_loop_runs_the_desugared_while() {
    let out = run(r#"
        let sum = 0
        for let i = 1; i <= 3; ++i { sum += i }
        print(sum)
    "#);
    assert_eq!(out, ["6"]);
}

#[test]
fn compound_assignment_and_incdec() {
    let out = run(r#"
        let x = 10
        x += 5
        x -= 1
        x *= 2
        x /= 4
        x++
        x--
        print(x)
    "#);
    assert_eq!(out, ["7"]);
}

#[test]
fn increment_is_number_only() {
    assert!(run_err("let s = \"a\" s++").message.contains("string"));
}

// ─── Scoping ─────────────────────────────────────────────────────────────────

#[test]
fn block_scope_is_torn_down() {
    assert_eq!(run("let x = 1 { let x = 2 print(x) } print(x)"), ["2", "1"]);
    assert!(run_err("{ let y = 1 } print(y)").message.contains("unbound"));
}

#[test]
fn redeclaration_in_same_scope_is_an_error() {
    let e = run_err("let x = 1 let x = 2");
    assert!(e.message.contains("already declared"), "{e}");
}

#[test]
fn assignment_to_undeclared_name_is_an_error() {
    let e = run_err("missing = 1");
    assert!(e.message.contains("undeclared"), "{e}");
}

// ─── Functions & closures ────────────────────────────────────────────────────

#[test]
fn fibonacci_recursion() {
    let out = run(r#"
        fn fib(n) {
            if n <= 1 { return n }
            return fib(n - 2) + fib(n - 1)
        }
        print(fib(3))
        print(fib(7))
    "#);
    assert_eq!(out, ["2", "13"]);
}

#[test]
fn function_without_return_yields_nil() {
    assert_eq!(run("fn f() { } print(f())"), ["nil"]);
    assert_eq!(run("fn f() { 1 + 1 } print(f())"), ["nil"]);
}

#[test]
fn return_unwinds_through_nested_blocks() {
    assert_eq!(run("fn f() { while true { { return 42 } } } print(f())"), ["42"]);
}

#[test]
fn lambdas_are_values() {
    assert_eq!(run("let double = fn (a) { return a * 2 } print(double(21))"), ["42"]);
}

#[test]
fn closures_capture_their_defining_scope() {
    let out = run(r#"
        fn make() {
            let n = 0
            return fn () { n = n + 1 return n }
        }
        let tick = make()
        print(tick())
        print(tick())
    "#);
    assert_eq!(out, ["1", "2"]);
}

#[test]
fn arity_mismatch_is_a_runtime_error() {
    let e = run_err("fn f(a, b) { return a } f(1)");
    assert!(e.message.contains("expects 2 arguments, got 1"), "{e}");
}

#[test]
fn calling_a_non_callable_is_an_error() {
    assert!(run_err("let x = 1 x()").message.contains("not callable"));
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[test]
fn record_construction_and_field_access() {
    let out = run(r#"
        data Point { x y }
        let p = Point(1, 2)
        print(p.x)
        print(p.y)
    "#);
    assert_eq!(out, ["1", "2"]);
}

#[test]
fn record_field_write() {
    assert_eq!(run("data Point { x y } let p = Point(1, 2) p.x = 3 print(p.x)"), ["3"]);
}

#[test]
fn unknown_field_access_is_an_error() {
    let e = run_err("data Point { x y } let p = Point(1, 2) print(p.z)");
    assert!(e.message.contains("unknown field `z`"), "{e}");
    let e = run_err("data Point { x y } let p = Point(1, 2) p.z = 1");
    assert!(e.message.contains("unknown field `z`"), "{e}");
}

#[test]
fn constructor_arity_matches_field_count() {
    let e = run_err("data Point { x y } Point(1)");
    assert!(e.message.contains("expects 2 arguments"), "{e}");
}

#[test]
fn objects_stringify_with_their_type_name() {
    assert_eq!(run("data Point { x y } print(Point(1, 2))"), ["<Point instance>"]);
}

// ─── Arrays & dictionaries ───────────────────────────────────────────────────

#[test]
fn array_literals_index_and_stringify() {
    assert_eq!(run("print([1, 2, 3][1])"), ["2"]);
    assert_eq!(run("print([1, 2])"), ["[1, 2]"]);
    assert_eq!(run("print([])"), ["[]"]);
}

#[test]
fn arrays_compare_structurally() {
    assert_eq!(run("print([1, 2] == [1, 2])"), ["true"]);
    assert_eq!(run("print([1, 2] == [1])"), ["false"]);
}

#[test]
fn arrays_are_reference_values() {
    let out = run(r#"
        let a = [1]
        let b = a
        append(b, 2)
        print(length(a))
    "#);
    assert_eq!(out, ["2"]);
}

#[test]
fn array_index_out_of_range() {
    let e = run_err("print([1, 2][5])");
    assert!(e.message.contains("out of range"), "{e}");
}

#[test]
fn slices_on_arrays_and_strings() {
    assert_eq!(run("print([1, 2, 3][1:])"), ["[2, 3]"]);
    assert_eq!(run("print([1, 2, 3][:2])"), ["[1, 2]"]);
    assert_eq!(run("print(\"hello\"[1:3])"), ["el"]);
    assert_eq!(run("print(\"abc\"[1])"), ["b"]);
}

#[test]
fn dict_lookup_and_insertion_order() {
    assert_eq!(run("print({a: 1, b: 2}[\"b\"])"), ["2"]);
    assert_eq!(run("print(keys({a: 1, b: 2}))"), ["[a, b]"]);
}

#[test]
fn dict_duplicate_insert_is_a_no_op() {
    assert_eq!(run("print({a: 1, a: 2}[\"a\"])"), ["1"]);
}

#[test]
fn dict_computed_keys() {
    assert_eq!(run("let k = \"x\" print({[k]: 9}[\"x\"])"), ["9"]);
}

#[test]
fn missing_dict_key_is_an_error() {
    assert!(run_err("print({a: 1}[\"z\"])").message.contains("missing"));
}

#[test]
fn dict_stringify() {
    assert_eq!(run("print({a: 1, b: 2})"), ["{a : 1,\n b : 2}"]);
    assert_eq!(run("print({})"), ["{}"]);
}

// ─── Builtins ────────────────────────────────────────────────────────────────

#[test]
fn length_covers_arrays_dicts_and_strings() {
    assert_eq!(run("print(length([1, 2, 3]))"), ["3"]);
    assert_eq!(run("print(length({a: 1}))"), ["1"]);
    assert_eq!(run("print(length(\"héllo\"))"), ["5"]);
}

#[test]
fn int_casts_and_parses() {
    assert_eq!(run("print(int(3.9))"), ["3"]);
    assert_eq!(run("print(int(\"12\"))"), ["12"]);
    assert!(run_err("print(int(\"twelve\"))").message.contains("parse"));
}

#[test]
fn str_stringifies() {
    assert_eq!(run("print(str(12) + \"!\")"), ["12!"]);
    assert_eq!(run("print(str(nil))"), ["nil"]);
}

#[test]
fn append_returns_the_array() {
    assert_eq!(run("print(append(append([], 1), 2))"), ["[1, 2]"]);
}

#[test]
fn print_yields_nil() {
    assert_eq!(run("print(print(1))"), ["1", "nil"]);
}

// ─── Export ──────────────────────────────────────────────────────────────────

#[test]
fn export_writes_a_one_time_env_snapshot() {
    let out = run(r#"
        export SHOAL_TEST_EXPORT_ASYM = 0
        SHOAL_TEST_EXPORT_ASYM = 1
        print(SHOAL_TEST_EXPORT_ASYM)
    "#);
    // the interpreter binding moved on, the process env kept the snapshot
    assert_eq!(out, ["1"]);
    assert_eq!(std::env::var("SHOAL_TEST_EXPORT_ASYM").as_deref(), Ok("0"));
}

#[test]
fn exported_value_is_stringified() {
    run("export SHOAL_TEST_EXPORT_STR = 1 + 2");
    assert_eq!(std::env::var("SHOAL_TEST_EXPORT_STR").as_deref(), Ok("3"));
}

// ─── String interpolation ────────────────────────────────────────────────────

#[test]
fn interpolation_evaluates_embedded_expressions() {
    assert_eq!(run("let name = \"world\" print(\"hi {name}\")"), ["hi world"]);
    assert_eq!(run("print(\"sum={1 + 2}\")"), ["sum=3"]);
}

#[test]
fn interpolation_sees_enclosing_locals() {
    let out = run(r#"
        fn greet(who) { return "hi {who}" }
        print(greet("there"))
    "#);
    assert_eq!(out, ["hi there"]);
}

#[test]
fn escaped_braces_are_literal() {
    assert_eq!(run(r#"print("\{not code\}")"#), ["{not code}"]);
}

#[test]
fn unmatched_braces_are_runtime_errors() {
    assert!(run_err("print(\"oops {\")").message.contains("unmatched"));
    assert!(run_err("print(\"oops }\")").message.contains("unmatched"));
}

#[test]
fn nested_braces_are_rejected() {
    assert!(run_err("print(\"{{1}}\")").message.contains("not allowed"));
}

// ─── Command substitution ────────────────────────────────────────────────────

#[test]
fn command_text_reaches_the_runner_verbatim() {
    assert_eq!(run_canned("print($(ls -la))"), ["ran:ls -la\n"]);
}

#[test]
fn command_output_is_a_string_value() {
    assert_eq!(run_canned("print(length($(ab)))"), ["7"]); // "ran:ab\n"
}

#[test]
fn system_runner_captures_stdout_unstripped() {
    // printf emits no trailing newline, so the capture is exact
    assert_eq!(run("print($(printf hi))"), ["hi"]);
}

// ─── REPL-style persistence ──────────────────────────────────────────────────

#[test]
fn bindings_persist_across_runs() {
    let mut itp = Interpreter::new();
    itp.run(&compile("let x = 40").unwrap()).unwrap();
    itp.run(&compile("print(x + 2)").unwrap()).unwrap();
    assert_eq!(itp.take_output(), ["42"]);
}

#[test]
fn closures_made_in_one_run_work_in_the_next() {
    let mut itp = Interpreter::new();
    itp.run(&compile(
        "fn make() { let n = 0 return fn () { n = n + 1 return n } } let tick = make()",
    ).unwrap()).unwrap();
    itp.run(&compile("print(tick()) print(tick())").unwrap()).unwrap();
    assert_eq!(itp.take_output(), ["1", "2"]);
}

#[test]
fn a_failed_run_keeps_earlier_bindings() {
    let mut itp = Interpreter::new();
    itp.run(&compile("let x = 1").unwrap()).unwrap();
    assert!(itp.run(&compile("boom()").unwrap()).is_err());
    itp.run(&compile("print(x)").unwrap()).unwrap();
    assert_eq!(itp.take_output(), ["1"]);
}

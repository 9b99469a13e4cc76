//! Compile-stage diagnostics through the public `compile()` API.
//!
//! Each test covers one rule: scan errors abort the whole scan, parse
//! errors are collected across statements, resolver errors abort
//! resolution. Error codes: L001–L004, P001–P003, R001–R003.

use shoal_lang::{Error, ErrorCode, compile};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn ok(src: &str) {
    compile(src).unwrap_or_else(|errs| {
        panic!("expected compile to succeed, got errors: {errs:#?}");
    });
}

fn err(src: &str) -> Vec<Error> {
    match compile(src) {
        Ok(_) => panic!("expected compile to fail but it succeeded"),
        Err(e) => e,
    }
}

fn has(errs: &[Error], code: ErrorCode) -> bool {
    errs.iter().any(|e| e.code == code)
}

fn has_msg(errs: &[Error], s: &str) -> bool {
    errs.iter().any(|e| e.message.contains(s))
}

// ─── Scan errors ─────────────────────────────────────────────────────────────

#[test]
fn scan_errors_are_fatal_and_singular() {
    let errs = err("let x = @ let y = @");
    assert_eq!(errs.len(), 1);
    assert!(has(&errs, ErrorCode::L001));
}

#[test]
fn unterminated_string_reports_its_start() {
    let errs = err("let s = \"oops");
    assert!(has(&errs, ErrorCode::L002));
    assert_eq!((errs[0].line, errs[0].column), (1, 9));
}

#[test]
fn unterminated_command_substitution() {
    assert!(has(&err("let out = $(ls"), ErrorCode::L004));
}

// ─── Parse errors ────────────────────────────────────────────────────────────

#[test]
fn parse_errors_are_collected_across_statements() {
    let errs = err("let = 1\nlet = 2\nlet = 3");
    assert_eq!(errs.len(), 3);
    assert!(errs.iter().all(|e| e.code == ErrorCode::P001));
}

#[test]
fn declaration_without_initializer() {
    let errs = err("let x");
    assert!(has(&errs, ErrorCode::P003));
    assert!(has_msg(&errs, "without an initializer"));
}

#[test]
fn missing_closing_paren() {
    assert!(has(&err("print(1"), ErrorCode::P002));
}

// ─── Resolver errors ─────────────────────────────────────────────────────────

#[test]
fn variable_read_in_its_own_initializer() {
    let errs = err("let a = a");
    assert!(has(&errs, ErrorCode::R001));
    assert!(has_msg(&errs, "own initializer"));
}

#[test]
fn break_outside_loop() {
    assert!(has(&err("break"), ErrorCode::R002));
    // a function boundary resets loop context
    assert!(has(&err("while true { fn f() { break } }"), ErrorCode::R002));
}

#[test]
fn return_outside_function() {
    assert!(has(&err("return 1"), ErrorCode::R003));
}

#[test]
fn resolver_aborts_at_the_first_error() {
    // both statements are invalid; only the first is reported
    let errs = err("break\nreturn 1");
    assert_eq!(errs.len(), 1);
    assert!(has(&errs, ErrorCode::R002));
}

// ─── Success paths ───────────────────────────────────────────────────────────

#[test]
fn valid_programs_compile() {
    ok("let x = 1");
    ok("fn f(n) { return f(n) }");
    ok("while true { break }");
    ok("let f = fn () { return 1 }");
    ok("print(undefined_until_runtime)");
}
